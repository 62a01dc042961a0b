//! CLI configuration.
//!
//! Read from `config.toml` in the platform config directory, or from the
//! path given with `--config`. Every section and key is optional.
//!
//! ```toml
//! [storage]
//! data_dir = "/var/lib/cyface"
//!
//! [migration]
//! legacy_database = "/var/lib/cyface/legacy.db"
//! device_id = "4f3c2a4e-8f0a-4a43-9d39-2b1f6a9c7e11"
//!
//! [export]
//! compress = true
//! page_size = 10000
//!
//! [tracks]
//! clean_locations = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use cyface_core::transfer::DEFAULT_PAGE_SIZE;
use cyface_store::MigrationContext;

/// Largest accepted location page size.
pub const MAX_PAGE_SIZE: u32 = 1_000_000;

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub migration: MigrationConfig,
    pub export: ExportConfig,
    pub tracks: TracksConfig,
}

impl Config {
    /// Load from the default path, or defaults if there is no file.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.storage.validate());
        errors.extend(self.migration.validate());
        errors.extend(self.export.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate, from `path` if given.
    pub fn load_validated(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::load(path)?,
            None => Self::load_default()?,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the database and sensor files.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: cyface_store::default_data_dir(),
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.data_dir.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.data_dir".to_string(),
                message: "data directory cannot be empty".to_string(),
            });
        }
        errors
    }
}

/// Inputs for upgrading databases written by old releases.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Legacy secondary database, imported once and then deleted.
    pub legacy_database: Option<PathBuf>,
    /// Device id kept outside the database by old releases.
    pub device_id: Option<String>,
}

impl MigrationConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if let Some(path) = &self.legacy_database
            && path.as_os_str().is_empty()
        {
            errors.push(ValidationError {
                field: "migration.legacy_database".to_string(),
                message: "path cannot be empty, omit the key instead".to_string(),
            });
        }

        if let Some(device_id) = &self.device_id
            && device_id.trim().is_empty()
        {
            errors.push(ValidationError {
                field: "migration.device_id".to_string(),
                message: "device id cannot be blank".to_string(),
            });
        }

        errors
    }

    /// The context handed to schema migrations.
    pub fn context(&self) -> MigrationContext {
        MigrationContext {
            legacy_database: self.legacy_database.clone(),
            preferences_device_id: self.device_id.clone(),
        }
    }
}

/// Transfer-file export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Deflate transfer files by default.
    pub compress: bool,
    /// Locations read per database round trip.
    pub page_size: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            compress: true,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ExportConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            errors.push(ValidationError {
                field: "export.page_size".to_string(),
                message: format!(
                    "page size {} is out of range (1-{})",
                    self.page_size, MAX_PAGE_SIZE
                ),
            });
        }
        errors
    }
}

/// Track metric settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TracksConfig {
    /// Drop implausible locations before computing distance.
    pub clean_locations: bool,
}

impl Default for TracksConfig {
    fn default() -> Self {
        Self {
            clean_locations: true,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path, e.g. `export.page_size`.
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cyface")
        .join("config.toml")
}
