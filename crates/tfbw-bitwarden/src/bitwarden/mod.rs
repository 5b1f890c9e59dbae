//! Bitwarden CLI bridge: sub-modules.

pub mod types;
pub mod encode;
pub mod command;
pub mod exec;
pub mod decode;
pub mod select;
pub mod session;
pub mod client;
pub mod fake;

// Re-export top-level items for convenience.
pub use types::*;
pub use client::Client;
pub use command::FilterOption;
pub use exec::{ExecOutput, ExecRequest, Executor, ProcessExecutor};
pub use session::{SessionInfo, SessionStatus};
