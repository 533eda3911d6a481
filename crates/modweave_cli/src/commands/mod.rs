//! CLI command definitions.
//!
//! Every subcommand takes the stack file as its positional argument and
//! shares the global options below.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use thiserror::Error;
use tracing::info;

use modweave_core::{generate_stack, ArtifactWriter, GeneratedStack, StackConfig};
use modweave_runner::{
    AssumeYes, CliExecutor, CliExecutorOptions, Confirmer, LifecycleDriver, RunnerError,
    StdinConfirmer, TerraformExecutor,
};

pub mod deploy;
pub mod destroy;
pub mod generate;
pub mod validate;

/// modweave - YAML stacks to Terraform modules
#[derive(Parser)]
#[command(name = "modweave")]
#[command(version, about = "modweave - generate and deploy Terraform module stacks from YAML")]
#[command(long_about = r#"
modweave reads a YAML stack file, orders its modules by dependency and
generates the Terraform root module under <terraform-dir>/generated,
together with <terraform-dir>/terraform.tfvars.

WORKFLOWS:
  generate  → Generate Terraform files only
  validate  → Check the stack file and print the module order
  deploy    → Generate, init, plan and apply
  destroy   → Generate, then destroy (guarded per workspace)

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Dependency or validation failure
  5 - Terraform failure
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Directory holding terraform.tfvars and the generated/ folder
    #[arg(short = 'd', long, global = true, default_value = ".")]
    pub terraform_dir: PathBuf,

    /// Don't preserve an existing terraform.tfvars file
    #[arg(long, global = true)]
    pub no_preserve_tfvars: bool,

    /// Log terraform commands instead of running them
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Terraform binary to run
    #[arg(
        long,
        global = true,
        env = "MODWEAVE_TERRAFORM_BIN",
        default_value = "terraform"
    )]
    pub terraform_bin: PathBuf,

    /// Kill a terraform command after this many seconds (0 waits forever)
    #[arg(long, global = true, default_value_t = 0)]
    pub timeout: u64,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate Terraform files from a stack file
    Generate(generate::GenerateArgs),

    /// Validate a stack file and print the module order
    Validate(validate::ValidateArgs),

    /// Generate files and deploy them with terraform
    Deploy(deploy::DeployArgs),

    /// Generate files and destroy the deployed infrastructure
    Destroy(destroy::DestroyArgs),
}

/// Errors raised by the CLI itself.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),
}

/// Load the stack file at `path`.
pub fn load_config(path: &Path) -> Result<StackConfig> {
    if !path.exists() {
        return Err(CliError::ConfigNotFound(path.to_path_buf()).into());
    }
    let config = StackConfig::from_file(path)
        .with_context(|| format!("Failed to load stack file {}", path.display()))?;
    Ok(config)
}

/// Generate the stack and write it under the terraform directory.
pub fn generate_and_write(config: &StackConfig, global: &GlobalArgs) -> Result<GeneratedStack> {
    let stack = generate_stack(config)?;

    let writer = ArtifactWriter::new(&global.terraform_dir)
        .preserve_tfvars(!global.no_preserve_tfvars);
    let written = writer.write(&stack.artifacts)?;
    let tfvars = writer.write_tfvars(config)?;

    info!(
        "Generated {} files for {} modules",
        written.len() + usize::from(tfvars.is_some()),
        stack.order.len()
    );
    Ok(stack)
}

/// Build a lifecycle driver for the terraform directory.
pub async fn lifecycle_driver(global: &GlobalArgs) -> Result<LifecycleDriver> {
    let mut options = CliExecutorOptions::new()
        .terraform_bin(&global.terraform_bin)
        .timeout(global.timeout);
    if global.dry_run {
        options = options.dry_run();
    }
    if global.quiet {
        options = options.quiet();
    }
    let executor = CliExecutor::new(options);

    if !global.dry_run {
        if !executor.is_available().await? {
            return Err(RunnerError::TerraformNotAvailable(format!(
                "could not run '{}'",
                global.terraform_bin.display()
            ))
            .into());
        }
        info!("Using {}", executor.version().await?);
    }

    Ok(LifecycleDriver::new(Arc::new(executor), &global.terraform_dir))
}

/// Confirmation source for apply and destroy.
///
/// Dry runs never prompt since nothing is executed.
pub fn confirmer(auto_approve: bool, global: &GlobalArgs) -> Box<dyn Confirmer> {
    if auto_approve || global.dry_run {
        Box::new(AssumeYes)
    } else {
        Box::new(StdinConfirmer)
    }
}
