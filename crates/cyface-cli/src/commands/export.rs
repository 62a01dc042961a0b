//! Export command.

use std::path::Path;

use anyhow::{Context, Result};
use cyface_core::TransferFileAssembler;

use super::CommandContext;
use crate::format::format_bytes;

/// Write the transfer file of one measurement.
pub async fn cmd_export(
    ctx: &CommandContext,
    id: i64,
    output: &Path,
    no_compress: bool,
) -> Result<()> {
    let persistence = ctx.open().await?;
    let compress = ctx.config.export.compress && !no_compress;

    let written = TransferFileAssembler::new(persistence)
        .with_page_size(ctx.config.export.page_size)
        .write_transfer_file(id, output, compress)
        .await
        .with_context(|| format!("Failed to export measurement {}", id))?;

    println!(
        "Exported measurement {} to {} ({}{})",
        id,
        output.display(),
        format_bytes(written as u64),
        if compress { ", deflated" } else { "" }
    );
    Ok(())
}
