//! Local persistence for captured measurements.
//!
//! This crate provides SQLite-based storage for measurements and their
//! locations, pressures, events and attachments, plus the flat files that
//! hold high-frequency sensor samples.
//!
//! # Features
//!
//! - Measurement lifecycle with a single active measurement at a time
//! - Paged location queries in capture order
//! - Forward-only schema migrations, one transaction per version step
//! - One-shot import of the legacy secondary database
//! - Lazily created device identifier
//!
//! # Example
//!
//! ```no_run
//! use cyface_store::{MeasurementQuery, Store};
//! use cyface_types::MeasurementStatus;
//!
//! let store = Store::open_default()?;
//!
//! // Measurements waiting for upload
//! let query = MeasurementQuery::new()
//!     .status(MeasurementStatus::Finished)
//!     .limit(10);
//! let measurements = store.query_measurements(&query)?;
//! # Ok::<(), cyface_store::Error>(())
//! ```

mod error;
pub mod files;
mod legacy;
mod migrations;
mod models;
mod queries;
mod schema;
mod store;

use std::path::{Path, PathBuf};

pub use error::{Error, Result};
pub use files::SensorFiles;
pub use migrations::MigrationContext;
pub use models::{Attachment, Measurement, NewAttachment};
pub use queries::{LocationQuery, MeasurementQuery};
pub use schema::SCHEMA_VERSION;
pub use store::Store;

/// Default data directory following platform conventions.
///
/// - Linux: `~/.local/share/cyface`
/// - macOS: `~/Library/Application Support/cyface`
/// - Windows: `C:\Users\<user>\AppData\Local\cyface`
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cyface")
}

/// Database file inside a data directory.
pub fn db_path(data_dir: &Path) -> PathBuf {
    data_dir.join("measures.db")
}

/// Sensor file root inside a data directory.
pub fn sensor_files_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("files")
}

/// Default database path.
pub fn default_db_path() -> PathBuf {
    db_path(&default_data_dir())
}
