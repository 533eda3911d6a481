//! modweave CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Dependency or validation failure
//! - 5: Terraform failure

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use modweave_core::CoreError;
use modweave_runner::RunnerError;

mod commands;

use commands::{Cli, CliError, Commands, GlobalArgs};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
    pub const TERRAFORM_ERROR: u8 = 5;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logging may already be initialized; keep going either way.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(log_filter(&cli.global))
        .try_init();

    let global = cli.global;
    let result = match cli.command {
        Commands::Generate(args) => commands::generate::execute(args, &global).await,
        Commands::Validate(args) => commands::validate::execute(args, &global).await,
        Commands::Deploy(args) => commands::deploy::execute(args, &global).await,
        Commands::Destroy(args) => commands::destroy::execute(args, &global).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// `RUST_LOG` wins; otherwise the level follows `--verbose` / `--quiet`.
fn log_filter(global: &GlobalArgs) -> EnvFilter {
    let default = if global.verbose {
        "modweave=debug,info"
    } else if global.quiet {
        "warn"
    } else {
        "modweave=info,warn"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    if e.downcast_ref::<CliError>().is_some() {
        return ExitCodes::INVALID_ARGS;
    }

    if let Some(core) = e.downcast_ref::<CoreError>() {
        return core_exit_code(core);
    }

    match e.downcast_ref::<RunnerError>() {
        Some(RunnerError::Core(core)) => core_exit_code(core),
        Some(RunnerError::Aborted(_)) | Some(RunnerError::Io(_)) => ExitCodes::GENERAL_ERROR,
        Some(_) => ExitCodes::TERRAFORM_ERROR,
        None => ExitCodes::GENERAL_ERROR,
    }
}

fn core_exit_code(e: &CoreError) -> u8 {
    match e {
        CoreError::Io(_) | CoreError::Internal(_) => ExitCodes::GENERAL_ERROR,
        _ => ExitCodes::VALIDATION_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_errors_exit_with_validation_code() {
        let err = anyhow::Error::new(CoreError::CircularDependency {
            module: "network".to_string(),
        });
        assert_eq!(categorize_error(&err), ExitCodes::VALIDATION_FAILURE);
    }

    #[test]
    fn test_context_does_not_hide_category() {
        let err = anyhow::Error::new(CoreError::Configuration("empty".to_string()))
            .context("Failed to load stack file stack.yaml");
        assert_eq!(categorize_error(&err), ExitCodes::VALIDATION_FAILURE);
    }

    #[test]
    fn test_terraform_failures() {
        let err = anyhow::Error::new(RunnerError::CommandFailed {
            command: "terraform plan".to_string(),
            exit_code: 1,
            stderr: "Error: boom".to_string(),
        });
        assert_eq!(categorize_error(&err), ExitCodes::TERRAFORM_ERROR);

        let err = anyhow::Error::new(RunnerError::WorkspaceNotFound("qa".to_string()));
        assert_eq!(categorize_error(&err), ExitCodes::TERRAFORM_ERROR);
    }

    #[test]
    fn test_other_errors() {
        let err = anyhow::Error::new(CliError::ConfigNotFound("x.yaml".into()));
        assert_eq!(categorize_error(&err), ExitCodes::INVALID_ARGS);

        let err = anyhow::Error::new(RunnerError::Aborted("declined".to_string()));
        assert_eq!(categorize_error(&err), ExitCodes::GENERAL_ERROR);

        assert_eq!(categorize_error(&anyhow::anyhow!("oops")), ExitCodes::GENERAL_ERROR);
    }
}
