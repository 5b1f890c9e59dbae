//! Scripted in-memory executor.
//!
//! Maps whitespace-joined argument vectors to canned responses and
//! records every invocation, so the client can be driven without a real
//! `bw` binary.

use crate::bitwarden::exec::{ExecOutput, ExecRequest, Executor};
use crate::bitwarden::types::*;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Stderr printed for commands without a scripted response.
pub const UNEXPECTED_COMMAND: &str = "unexpected command";

/// One canned process result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeResponse {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl FakeResponse {
    pub fn ok(stdout: &str) -> Self {
        Self { stdout: stdout.to_string(), stderr: String::new(), exit_code: 0 }
    }

    pub fn json(value: &serde_json::Value) -> Self {
        Self::ok(&value.to_string())
    }

    pub fn fail(exit_code: i32, stderr: &str) -> Self {
        Self { stdout: String::new(), stderr: stderr.to_string(), exit_code }
    }

    fn output(&self) -> ExecOutput {
        ExecOutput {
            stdout: self.stdout.as_bytes().to_vec(),
            stderr: self.stderr.clone(),
            exit_code: Some(self.exit_code),
        }
    }
}

/// An invocation seen by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedCommand {
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl ExecutedCommand {
    pub fn line(&self) -> String {
        self.args.join(" ")
    }

    /// Last value set for `name`, as the child would see it.
    pub fn env_var(&self, name: &str) -> Option<&str> {
        self.env.iter().rev().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Default)]
pub struct FakeExecutor {
    scripts: Mutex<HashMap<String, VecDeque<FakeResponse>>>,
    executed: Mutex<Vec<ExecutedCommand>>,
    delay: Option<Duration>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `line` with `response` every time, replacing any earlier
    /// script for it.
    pub fn on(self, line: &str, response: FakeResponse) -> Self {
        self.on_sequence(line, vec![response])
    }

    /// Answer `line` with `responses` in order; the last one repeats.
    pub fn on_sequence(mut self, line: &str, responses: Vec<FakeResponse>) -> Self {
        self.scripts.get_mut().insert(line.to_string(), responses.into());
        self
    }

    /// Hold every invocation for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Script a response after construction.
    pub async fn respond(&self, line: &str, response: FakeResponse) {
        self.scripts.lock().await.insert(line.to_string(), VecDeque::from([response]));
    }

    pub async fn executed(&self) -> Vec<ExecutedCommand> {
        self.executed.lock().await.clone()
    }

    pub async fn lines(&self) -> Vec<String> {
        self.executed.lock().await.iter().map(ExecutedCommand::line).collect()
    }

    /// How many times `line` was executed.
    pub async fn count(&self, line: &str) -> usize {
        self.executed.lock().await.iter().filter(|c| c.line() == line).count()
    }

    async fn next_response(&self, line: &str) -> Option<FakeResponse> {
        let mut scripts = self.scripts.lock().await;
        let queue = scripts.get_mut(line)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Executor for FakeExecutor {
    async fn execute(
        &self,
        cancel: &CancellationToken,
        request: &ExecRequest,
    ) -> BitwardenResult<ExecOutput> {
        if cancel.is_cancelled() {
            return Err(BitwardenError::cancelled(&request.display));
        }
        let command = ExecutedCommand { args: request.args.clone(), env: request.env.clone() };
        let line = command.line();
        self.executed.lock().await.push(command);

        if let Some(delay) = self.delay {
            tokio::select! {
                _ = cancel.cancelled() => return Err(BitwardenError::cancelled(&request.display)),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        Ok(match self.next_response(&line).await {
            Some(response) => response.output(),
            None => FakeResponse::fail(1, UNEXPECTED_COMMAND).output(),
        })
    }
}
