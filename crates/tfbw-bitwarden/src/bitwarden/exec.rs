//! Process executor for the `bw` command-line tool.
//!
//! [`Executor`] is the seam between the bridge and the outside world:
//! [`ProcessExecutor`] spawns the real binary, while
//! [`crate::bitwarden::fake::FakeExecutor`] replays canned output in
//! tests. [`Runner`] layers the shared environment and exit-status
//! classification on top of any executor.

use crate::bitwarden::command::Command;
use crate::bitwarden::types::*;
use async_trait::async_trait;
use log::{debug, warn};
use std::future::Future;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const ENV_SESSION: &str = "BW_SESSION";
pub const ENV_NO_INTERACTION: &str = "BW_NOINTERACTION";
pub const ENV_APP_DATA_DIR: &str = "BITWARDENCLI_APPDATA_DIR";
pub const ENV_EXTRA_CA_CERTS: &str = "NODE_EXTRA_CA_CERTS";

/// stderr fragments that mean the session or credentials were rejected.
const AUTH_FAILURE_PATTERNS: &[&str] = &[
    "You are not logged in",
    "Vault is locked",
    "Invalid master password",
    "Username or password is incorrect",
    "Session key is invalid",
    "invalid_client",
    "Two-step login",
];
const NOT_FOUND_PATTERN: &str = "Not found.";
const AMBIGUOUS_PATTERN: &str = "More than one result was found";

/// One invocation handed to an [`Executor`].
#[derive(Clone, PartialEq, Eq)]
pub struct ExecRequest {
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    /// Redacted rendering of the command, for logs and errors.
    pub display: String,
}

impl std::fmt::Debug for ExecRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys: Vec<&str> = self.env.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("ExecRequest")
            .field("command", &self.display)
            .field("env", &keys)
            .finish()
    }
}

/// Raw result of a finished child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Runs one `bw` invocation to completion.
///
/// Implementations return the output even for nonzero exits; only
/// failures to run at all (missing binary, timeout, cancellation) are
/// errors at this level.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(
        &self,
        cancel: &CancellationToken,
        request: &ExecRequest,
    ) -> BitwardenResult<ExecOutput>;
}

// ── Real subprocess executor ────────────────────────────────────────

/// Spawns the `bw` binary with a cleared environment.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    binary: String,
    passthrough_env: Vec<String>,
    timeout: Option<Duration>,
}

impl ProcessExecutor {
    pub fn new(binary: &str) -> Self {
        Self {
            binary: binary.to_string(),
            passthrough_env: Vec::new(),
            timeout: None,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            binary: config.cli_path.clone(),
            passthrough_env: config.passthrough_env.clone(),
            timeout: config.timeout(),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_passthrough(mut self, names: &[&str]) -> Self {
        self.passthrough_env = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    async fn bounded<F>(&self, display: &str, wait: F) -> BitwardenResult<std::process::Output>
    where
        F: Future<Output = std::io::Result<std::process::Output>>,
    {
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, wait).await.map_err(|_| {
                BitwardenError::Timeout { command: display.to_string(), timeout: limit }
            })?,
            None => wait.await,
        };
        result.map_err(|e| BitwardenError::io(display, e.to_string()))
    }
}

#[async_trait]
impl Executor for ProcessExecutor {
    async fn execute(
        &self,
        cancel: &CancellationToken,
        request: &ExecRequest,
    ) -> BitwardenResult<ExecOutput> {
        if cancel.is_cancelled() {
            return Err(BitwardenError::cancelled(&request.display));
        }

        let mut cmd = tokio::process::Command::new(&self.binary);
        cmd.args(&request.args)
            .env_clear()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for name in &self.passthrough_env {
            if let Some(value) = std::env::var_os(name) {
                cmd.env(name, value);
            }
        }
        for (k, v) in &request.env {
            cmd.env(k, v);
        }

        let child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                BitwardenError::setup(&self.binary, e.to_string())
            }
            _ => BitwardenError::io(&request.display, e.to_string()),
        })?;

        // Dropping the wait future drops the child, and kill_on_drop
        // terminates it.
        let output = tokio::select! {
            _ = cancel.cancelled() => return Err(BitwardenError::cancelled(&request.display)),
            output = self.bounded(&request.display, child.wait_with_output()) => output?,
        };

        Ok(ExecOutput {
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
    }
}

// ── Runner ──────────────────────────────────────────────────────────

/// Builds requests from commands and classifies their exit status.
#[derive(Clone)]
pub struct Runner {
    executor: Arc<dyn Executor>,
    base_env: Vec<(String, String)>,
}

impl Runner {
    pub fn new(executor: Arc<dyn Executor>, config: &ClientConfig) -> Self {
        let mut base_env = vec![(ENV_NO_INTERACTION.to_string(), "true".to_string())];
        if let Some(dir) = &config.app_data_dir {
            base_env.push((ENV_APP_DATA_DIR.to_string(), dir.clone()));
        }
        if let Some(certs) = &config.extra_ca_certs {
            base_env.push((ENV_EXTRA_CA_CERTS.to_string(), certs.clone()));
        }
        base_env.extend(config.extra_env.iter().cloned());
        Self { executor, base_env }
    }

    /// The request that [`Runner::run`] would hand to the executor.
    pub fn request(&self, command: &Command, session: Option<&str>) -> ExecRequest {
        let mut env = self.base_env.clone();
        if let Some(token) = session {
            env.push((ENV_SESSION.to_string(), token.to_string()));
        }
        env.extend(command.env_vars().iter().cloned());
        ExecRequest {
            args: command.args().to_vec(),
            env,
            display: command.redacted(),
        }
    }

    /// Run a command and return its output if it exited successfully.
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        command: &Command,
        session: Option<&str>,
    ) -> BitwardenResult<ExecOutput> {
        let request = self.request(command, session);
        debug!("Running bw command: bw {}", request.display);
        let output = self.executor.execute(cancel, &request).await?;
        check_exit(command, output)
    }
}

/// Map a nonzero exit to the matching error kind.
pub fn check_exit(command: &Command, output: ExecOutput) -> BitwardenResult<ExecOutput> {
    if output.success() {
        if !output.stderr.trim().is_empty() {
            warn!("bw {} wrote to stderr: {}", command.summary(), output.stderr.trim());
        }
        return Ok(output);
    }

    let stderr = output.stderr.trim();
    debug!("bw {} exited with {:?}: {}", command.summary(), output.exit_code, stderr);

    if let Some(pattern) = AUTH_FAILURE_PATTERNS.iter().find(|p| stderr.contains(*p)) {
        return Err(BitwardenError::auth(command.redacted(), *pattern));
    }
    if stderr.contains(NOT_FOUND_PATTERN) {
        return Err(BitwardenError::not_found());
    }
    if stderr.contains(AMBIGUOUS_PATTERN) {
        return Err(BitwardenError::Ambiguous { count: 2 });
    }

    let detail = if stderr.is_empty() { output.stdout_text() } else { stderr.to_string() };
    Err(BitwardenError::Process {
        command: command.redacted(),
        exit_code: output.exit_code,
        stderr: detail,
    })
}
