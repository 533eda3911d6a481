//! Deploy command - Generate a stack and apply it.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use modweave_runner::DeployOutcome;

use super::{confirmer, generate_and_write, lifecycle_driver, load_config, GlobalArgs};

#[derive(Args)]
pub struct DeployArgs {
    /// Path to the YAML stack file
    config: PathBuf,

    /// Only run plan, don't apply
    #[arg(short, long)]
    pub plan_only: bool,

    /// Apply without asking for confirmation
    #[arg(short, long)]
    pub auto_approve: bool,
}

pub async fn execute(args: DeployArgs, global: &GlobalArgs) -> Result<()> {
    info!("Deploying stack from {}", args.config.display());

    let config = load_config(&args.config)?;
    generate_and_write(&config, global)?;

    let driver = lifecycle_driver(global).await?;
    let confirmer = confirmer(args.auto_approve, global);
    let outcome = driver.deploy(args.plan_only, confirmer.as_ref()).await?;

    if !global.quiet {
        match outcome {
            DeployOutcome::Planned => println!("📋 Plan complete. Nothing was applied."),
            DeployOutcome::Applied => println!("✅ Deployment complete!"),
        }
    }
    Ok(())
}
