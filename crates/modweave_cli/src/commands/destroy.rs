//! Destroy command - Tear down a deployed stack.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::{info, warn};

use modweave_runner::DestroyOutcome;

use super::{confirmer, generate_and_write, lifecycle_driver, load_config, GlobalArgs};

#[derive(Args)]
pub struct DestroyArgs {
    /// Path to the YAML stack file
    config: PathBuf,

    /// Workspace to destroy, with safety checks
    #[arg(short, long)]
    pub workspace: Option<String>,

    /// Destroy without asking for confirmation
    #[arg(short, long)]
    pub auto_approve: bool,
}

pub async fn execute(args: DestroyArgs, global: &GlobalArgs) -> Result<()> {
    info!("Destroying stack from {}", args.config.display());

    let config = load_config(&args.config)?;
    generate_and_write(&config, global)?;

    let driver = lifecycle_driver(global).await?;
    let confirmer = confirmer(args.auto_approve, global);

    let Some(workspace) = args.workspace else {
        driver.confirmed_destroy(confirmer.as_ref()).await?;
        if !global.quiet {
            println!("✅ Infrastructure destroyed successfully!");
        }
        return Ok(());
    };

    if global.dry_run {
        warn!("Dry run: skipping workspace checks for '{}'", workspace);
        driver.destroy().await?;
        return Ok(());
    }

    let outcome = driver
        .destroy_workspace(&workspace, confirmer.as_ref())
        .await?;

    if !global.quiet {
        match outcome {
            DestroyOutcome::NothingToDestroy => {
                println!("ℹ️  No resources found in '{}'. Nothing to destroy.", workspace)
            }
            DestroyOutcome::Destroyed { resources } => println!(
                "✅ Destroyed {} resources in '{}' workspace",
                resources, workspace
            ),
        }
    }
    Ok(())
}
