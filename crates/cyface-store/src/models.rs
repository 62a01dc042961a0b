//! Data models for stored data.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use cyface_types::{AttachmentStatus, AttachmentType, MeasurementStatus, Modality};

/// A measurement stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Database row ID.
    pub id: i64,
    /// Lifecycle status.
    pub status: MeasurementStatus,
    /// Mode of transport at capture start.
    pub modality: Modality,
    /// Format version of the persisted rows and sensor files.
    pub file_format_version: u16,
    /// Cumulative travelled distance in metres.
    pub distance: f64,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Cumulative size of all attachments in bytes.
    pub files_size: u64,
}

impl Measurement {
    /// Creation time as a date.
    pub fn created_at(&self) -> Option<OffsetDateTime> {
        cyface_types::datetime_from_millis(self.timestamp)
    }
}

/// An auxiliary file captured alongside a measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// Database row ID.
    pub id: i64,
    /// Owning measurement.
    pub measurement_id: i64,
    /// Capture time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub status: AttachmentStatus,
    pub file_type: AttachmentType,
    pub file_format_version: u16,
    /// File size in bytes.
    pub size: u64,
    /// Storage path of the file.
    pub path: String,
    /// Position at capture time, if known.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location_timestamp: Option<i64>,
}

/// Values for a new attachment row.
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub timestamp: i64,
    pub file_type: AttachmentType,
    pub file_format_version: u16,
    pub size: u64,
    pub path: String,
    /// Position at capture time as `(timestamp, latitude, longitude)`.
    pub location: Option<(i64, f64, f64)>,
}
