//! Error types for cyface-store.

use std::path::PathBuf;

use cyface_types::MeasurementStatus;

/// Result type for cyface-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in cyface-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Measurement not found in database.
    #[error("No such measurement: {0}")]
    NoSuchMeasurement(i64),

    /// No device identifier has been created yet.
    #[error("No device identifier stored")]
    NoDeviceId,

    /// Another measurement is still open or paused.
    #[error("Measurement {0} is still open or paused")]
    MeasurementAlreadyActive(i64),

    /// The requested status change is not part of the lifecycle.
    #[error("Measurement {measurement_id} cannot change from {from} to {to}")]
    InvalidStatusTransition {
        measurement_id: i64,
        from: MeasurementStatus,
        to: MeasurementStatus,
    },

    /// A schema migration step failed.
    #[error("Migration {from} -> {to} failed: {message}")]
    Migration { from: i32, to: i32, message: String },

    /// A stored tag could not be parsed.
    #[error("Corrupted row: {0}")]
    Parse(#[from] cyface_types::ParseError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
