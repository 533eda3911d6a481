//! Generate command - Write Terraform files for a stack.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use modweave_core::GENERATED_DIR;

use super::{generate_and_write, load_config, GlobalArgs};

#[derive(Args)]
pub struct GenerateArgs {
    /// Path to the YAML stack file
    config: PathBuf,
}

pub async fn execute(args: GenerateArgs, global: &GlobalArgs) -> Result<()> {
    info!("Generating Terraform files from {}", args.config.display());

    let config = load_config(&args.config)?;
    let stack = generate_and_write(&config, global)?;

    if !global.quiet {
        println!(
            "✅ Generated Terraform files in {}",
            global.terraform_dir.join(GENERATED_DIR).display()
        );
        println!("   Module order: {}", stack.order.join(" → "));
    }
    Ok(())
}
