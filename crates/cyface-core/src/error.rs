//! Error types for cyface-core.
//!
//! Storage failures are wrapped unchanged so callers can still match on
//! [`cyface_store::Error::NoSuchMeasurement`] or
//! [`cyface_store::Error::NoDeviceId`]. Programming errors such as a value
//! that does not fit the wire format are not represented here; they panic.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while capturing or serializing measurements.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Persistence layer error.
    #[error("Storage error: {0}")]
    Store(#[from] cyface_store::Error),

    /// The measurement was captured in a format this version cannot serialize.
    #[error(
        "Measurement {measurement_id} uses file format {found}, only {expected} is supported"
    )]
    UnsupportedFormat {
        /// The measurement that was about to be serialized.
        measurement_id: i64,
        /// Its stored format version.
        found: u16,
        /// The supported format version.
        expected: u16,
    },

    /// Writing a transfer file failed; the partial file has been removed.
    #[error("Failed to write transfer file {path}: {source}")]
    TransferFile {
        /// Destination of the transfer file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A capture session is already running in this process.
    #[error("A capture session is already running")]
    CaptureAlreadyRunning,

    /// The operation needs a running, unpaused capture.
    #[error("No active capture")]
    NoActiveCapture,

    /// A state that recovery should have made impossible.
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A blocking task panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result type alias using cyface-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
