//! Measurements and delete commands.

use anyhow::{Context, Result};
use cyface_store::MeasurementQuery;

use super::CommandContext;
use crate::format::format_measurement_line;

/// List all measurements, newest first.
pub async fn cmd_measurements(ctx: &CommandContext, json: bool) -> Result<()> {
    let persistence = ctx.open().await?;
    let measurements = persistence
        .query_measurements(MeasurementQuery::new())
        .await
        .context("Failed to load measurements")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&measurements)?);
        return Ok(());
    }

    if measurements.is_empty() {
        println!("No measurements in {}", ctx.data_dir.display());
        return Ok(());
    }

    println!(
        "{:>6}  {:<10} {:<10} {:<20}  {:>10}",
        "ID", "STATUS", "MODALITY", "CREATED", "DISTANCE"
    );
    for measurement in &measurements {
        println!("{}", format_measurement_line(measurement));
    }
    Ok(())
}

/// Delete a measurement with its rows and sensor files.
pub async fn cmd_delete(ctx: &CommandContext, id: i64) -> Result<()> {
    let persistence = ctx.open().await?;
    persistence
        .delete_measurement(id)
        .await
        .with_context(|| format!("Failed to delete measurement {}", id))?;
    println!("Deleted measurement {}", id);
    Ok(())
}
