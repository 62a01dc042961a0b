//! Recovery, migration and device id commands.

use anyhow::{Context, Result};
use cyface_core::{DeviceIdProvider, recover_dead_measurements};

use super::CommandContext;

/// Finish measurements left open by a crashed capture.
pub async fn cmd_recover(ctx: &CommandContext) -> Result<()> {
    let persistence = ctx.open().await?;
    let recovered = recover_dead_measurements(&persistence)
        .await
        .context("Failed to recover measurements")?;

    if recovered.is_empty() {
        println!("No dead measurements");
    } else {
        for id in &recovered {
            println!("Finished measurement {}", id);
        }
    }
    Ok(())
}

/// Open the database so pending migrations run, then print the version.
pub async fn cmd_migrate(ctx: &CommandContext) -> Result<()> {
    let persistence = ctx.open().await?;
    let version = persistence.schema_version().await?;
    println!("Schema version {}", version);
    Ok(())
}

/// Print the device identifier.
pub async fn cmd_device_id(ctx: &CommandContext) -> Result<()> {
    let persistence = ctx.open().await?;
    let provider: &dyn DeviceIdProvider = &persistence;
    println!("{}", provider.device_id().await?);
    Ok(())
}
