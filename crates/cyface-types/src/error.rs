//! Error types for parsing stored tags in cyface-types.

use thiserror::Error;

/// Errors that can occur when converting persisted tags back into typed values.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The measurement status tag is not known.
    #[error("Unknown measurement status: {0}")]
    UnknownStatus(String),

    /// The modality tag is not known.
    #[error("Unknown modality: {0}")]
    UnknownModality(String),

    /// The event type tag is not known.
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    /// The attachment status tag is not known.
    #[error("Unknown attachment status: {0}")]
    UnknownAttachmentStatus(String),

    /// The attachment type tag is not known.
    #[error("Unknown attachment type: {0}")]
    UnknownAttachmentType(String),
}

/// Result type alias using cyface-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
