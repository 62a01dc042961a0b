use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod format;

use cli::{Cli, Commands};
use commands::CommandContext;
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Quiet mode suppresses info-level logging
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // Logs go to stderr so JSON output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load_validated(cli.config.as_deref()).context("Failed to load configuration")?;
    let ctx = CommandContext::new(config, cli.data_dir);
    tracing::debug!("Using data directory {}", ctx.data_dir.display());

    match cli.command {
        Commands::Measurements { json } => commands::cmd_measurements(&ctx, json).await,
        Commands::Show { id, json } => commands::cmd_show(&ctx, id, json).await,
        Commands::Export {
            id,
            output,
            no_compress,
        } => commands::cmd_export(&ctx, id, &output, no_compress).await,
        Commands::Recover => commands::cmd_recover(&ctx).await,
        Commands::Migrate => commands::cmd_migrate(&ctx).await,
        Commands::DeviceId => commands::cmd_device_id(&ctx).await,
        Commands::Delete { id } => commands::cmd_delete(&ctx, id).await,
    }
}
