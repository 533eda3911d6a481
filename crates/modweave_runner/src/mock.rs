//! Mock terraform executor for testing.
//!
//! Records every invocation and answers with scripted responses, so the
//! lifecycle driver can be exercised without a terraform binary.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::error::{RunnerError, RunnerResult};
use crate::executor::{CommandOutput, TerraformExecutor};

/// Predefined mock response for a terraform invocation.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub exit_code: i64,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl MockResponse {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
            duration_ms: 100,
        }
    }

    pub fn failure(exit_code: i64, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
            duration_ms: 100,
        }
    }
}

/// Captured invocation for verification.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedCall {
    pub working_dir: PathBuf,
    pub args: Vec<String>,
}

impl CapturedCall {
    /// The terraform subcommand, e.g. `plan` or `workspace`.
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

/// Mock terraform executor.
///
/// Responses are matched by subcommand prefix (`"workspace list"`,
/// `"plan"`, ...); the longest matching prefix wins. Unmatched invocations
/// succeed with empty output.
#[derive(Clone, Default)]
pub struct MockExecutor {
    available: Arc<RwLock<bool>>,
    responses: Arc<RwLock<Vec<(String, MockResponse)>>>,
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
    simulate_failure: Arc<RwLock<Option<String>>>,
}

impl MockExecutor {
    /// Create a new mock executor.
    pub fn new() -> Self {
        Self {
            available: Arc::new(RwLock::new(true)),
            ..Self::default()
        }
    }

    /// Set whether terraform is reported as available.
    pub fn set_available(self, available: bool) -> Self {
        *self.available.write() = available;
        self
    }

    /// Answer invocations whose arguments start with `prefix`.
    pub fn respond_to(self, prefix: impl Into<String>, response: MockResponse) -> Self {
        self.responses.write().push((prefix.into(), response));
        self
    }

    /// Fail every invocation before it runs.
    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.simulate_failure.write() = Some(message.into());
        self
    }

    /// Get all captured calls.
    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    /// Captured argument lists joined with spaces.
    pub fn command_lines(&self) -> Vec<String> {
        self.captured_calls
            .read()
            .iter()
            .map(|c| c.args.join(" "))
            .collect()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    /// Check if a subcommand was run.
    pub fn was_called(&self, subcommand: &str) -> bool {
        self.captured_calls
            .read()
            .iter()
            .any(|c| c.subcommand() == Some(subcommand))
    }

    fn response_for(&self, command_line: &str) -> MockResponse {
        self.responses
            .read()
            .iter()
            .filter(|(prefix, _)| command_line.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| MockResponse::success(""))
    }
}

#[async_trait]
impl TerraformExecutor for MockExecutor {
    async fn is_available(&self) -> RunnerResult<bool> {
        Ok(*self.available.read())
    }

    async fn version(&self) -> RunnerResult<String> {
        Ok("Terraform v1.6.0 (mock)".to_string())
    }

    async fn run(&self, working_dir: &Path, args: &[String]) -> RunnerResult<CommandOutput> {
        self.captured_calls.write().push(CapturedCall {
            working_dir: working_dir.to_path_buf(),
            args: args.to_vec(),
        });

        if let Some(msg) = self.simulate_failure.read().clone() {
            return Err(RunnerError::SpawnFailed(msg));
        }

        let response = self.response_for(&args.join(" "));
        let started_at = Utc::now();
        let finished_at = started_at + chrono::Duration::milliseconds(response.duration_ms as i64);

        Ok(CommandOutput {
            args: args.to_vec(),
            exit_code: response.exit_code,
            stdout: response.stdout,
            stderr: response.stderr,
            started_at,
            finished_at,
            duration_ms: response.duration_ms,
        })
    }
}
