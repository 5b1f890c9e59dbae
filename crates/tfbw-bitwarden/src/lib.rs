//! # tfbw – Bitwarden CLI bridge
//!
//! Manages vault objects (logins, secure notes, cards, identities,
//! folders, organization collections) by driving the `bw` executable:
//!
//! - **Object Encoder** – typed objects to the fixed-shape base64 JSON payload
//! - **Command Builder** – reproducible argument vectors for every operation
//! - **Process Executor** – subprocess execution with a controlled environment,
//!   cancellation and timeouts
//! - **Response Decoder** – JSON output to typed results with classified errors
//! - **Session Manager** – single-flight login/unlock and `BW_SESSION` injection
//! - **Selector** – client-side narrowing and the single-result rule

pub mod bitwarden;
