//! Command implementations for the CLI.

mod export;
mod maintenance;
mod measurements;
mod show;

use std::path::PathBuf;

use anyhow::{Context, Result};
use cyface_core::Persistence;

use crate::config::Config;

pub use export::cmd_export;
pub use maintenance::{cmd_device_id, cmd_migrate, cmd_recover};
pub use measurements::{cmd_delete, cmd_measurements};
pub use show::cmd_show;

/// Settings every command runs with.
pub struct CommandContext {
    pub config: Config,
    /// Resolved data directory, `--data-dir` taking precedence over config.
    pub data_dir: PathBuf,
}

impl CommandContext {
    pub fn new(config: Config, data_dir: Option<PathBuf>) -> Self {
        let data_dir = data_dir.unwrap_or_else(|| config.storage.data_dir.clone());
        Self { config, data_dir }
    }

    /// Open the data directory, running pending migrations.
    pub async fn open(&self) -> Result<Persistence> {
        Persistence::open(&self.data_dir, self.config.migration.context())
            .await
            .with_context(|| format!("Failed to open data directory {}", self.data_dir.display()))
    }
}
