//! Terraform executor trait and types.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RunnerError, RunnerResult};

/// Output of one terraform invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandOutput {
    /// Arguments passed to terraform
    pub args: Vec<String>,
    /// Process exit code (-1 when killed by a signal)
    pub exit_code: i64,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
    /// Execution start time
    pub started_at: DateTime<Utc>,
    /// Execution end time
    pub finished_at: DateTime<Utc>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl CommandOutput {
    /// Check if execution was successful (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// The command line as a single string, for messages.
    pub fn command_line(&self) -> String {
        format!("terraform {}", self.args.join(" "))
    }

    /// Turn a non-zero exit into [`RunnerError::CommandFailed`].
    pub fn into_result(self) -> RunnerResult<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(RunnerError::CommandFailed {
                command: self.command_line(),
                exit_code: self.exit_code,
                stderr: self
                    .stderr
                    .lines()
                    .last()
                    .unwrap_or("Unknown error")
                    .to_string(),
            })
        }
    }
}

/// Runs terraform commands.
#[async_trait]
pub trait TerraformExecutor: Send + Sync {
    /// Check if the terraform binary can be executed.
    async fn is_available(&self) -> RunnerResult<bool>;

    /// Get terraform version information.
    async fn version(&self) -> RunnerResult<String>;

    /// Run terraform with `args` in `working_dir`.
    ///
    /// A non-zero exit is reported through [`CommandOutput::exit_code`], not
    /// as an error.
    async fn run(&self, working_dir: &Path, args: &[String]) -> RunnerResult<CommandOutput>;
}
