//! # modweave_runner
//!
//! Terraform lifecycle driver for stacks generated by `modweave_core`.
//!
//! Terraform is reached through the [`TerraformExecutor`] trait.
//! [`CliExecutor`] spawns the real binary and [`MockExecutor`] records calls
//! for tests. [`LifecycleDriver`] sequences init, plan, apply and the guarded
//! workspace destroy on top of an executor.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use modweave_runner::{AssumeYes, CliExecutor, CliExecutorOptions, LifecycleDriver};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let executor = Arc::new(CliExecutor::new(CliExecutorOptions::default()));
//! let driver = LifecycleDriver::new(executor, "infrastructure");
//! driver.deploy(false, &AssumeYes).await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod confirm;
pub mod error;
pub mod executor;
pub mod lifecycle;
pub mod mock;

pub use cli::{CliExecutor, CliExecutorOptions, LogStream};
pub use confirm::{is_affirmative, AssumeYes, Confirmer, ScriptedConfirmer, StdinConfirmer};
pub use error::{RunnerError, RunnerResult};
pub use executor::{CommandOutput, TerraformExecutor};
pub use lifecycle::{
    count_resources, is_production_workspace, parse_workspace_list, DeployOutcome,
    DestroyOutcome, LifecycleDriver, PRODUCTION_PHRASE,
};
pub use mock::{CapturedCall, MockExecutor, MockResponse};
