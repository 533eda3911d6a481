//! Error types for the runner module.

use thiserror::Error;

/// Result type alias for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Errors that can occur while driving Terraform.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Terraform not available: {0}")]
    TerraformNotAvailable(String),

    #[error("Failed to spawn terraform: {0}")]
    SpawnFailed(String),

    #[error("Command `{command}` failed with exit code {exit_code}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i64,
        stderr: String,
    },

    #[error("Terraform command timed out after {0} seconds")]
    Timeout(u64),

    #[error("Terraform not initialized in {0}. Run init first.")]
    NotInitialized(String),

    #[error("Workspace '{0}' does not exist")]
    WorkspaceNotFound(String),

    #[error("Aborted: {0}")]
    Aborted(String),

    #[error(transparent)]
    Core(#[from] modweave_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
