//! Validate command - Check a stack file without writing anything.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use modweave_core::generate_stack;

use super::{load_config, GlobalArgs};

#[derive(Args)]
pub struct ValidateArgs {
    /// Path to the YAML stack file
    config: PathBuf,

    /// Print the module order as a JSON array
    #[arg(long)]
    json: bool,
}

pub async fn execute(args: ValidateArgs, global: &GlobalArgs) -> Result<()> {
    info!("Validating stack file: {}", args.config.display());

    let config = load_config(&args.config)?;
    // Full generation in memory catches everything a real run would hit.
    let stack = generate_stack(&config)?;

    if args.json {
        println!("{}", serde_json::to_string(&stack.order)?);
        return Ok(());
    }

    if !global.quiet {
        println!("📋 {} enabled modules", stack.order.len());
        for (position, name) in stack.order.iter().enumerate() {
            println!("   {}. {}", position + 1, name);
        }
        println!();
        println!("✅ Stack is valid");
    }
    Ok(())
}
