//! Core types for captured measurements.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::ParseError;

/// Format version of data persisted by this release (rows and sensor files).
///
/// Measurements carrying another version cannot be serialized for upload.
pub const PERSISTENCE_FILE_FORMAT_VERSION: u16 = 3;

/// Format version written into the header of every transfer file.
pub const TRANSFER_FILE_FORMAT_VERSION: u16 = 3;

/// Convert a millisecond Unix timestamp into an [`OffsetDateTime`].
///
/// Returns `None` when the value is outside the representable range.
pub fn datetime_from_millis(millis: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()
}

/// Lifecycle status of a measurement.
///
/// ```text
/// OPEN ──► PAUSED ──► OPEN (resumed)
///  │         │
///  └────► FINISHED ◄──┘
///            │
///            ├──► SYNCED
///            ├──► SKIPPED
///            └──► DEPRECATED
/// ```
///
/// At most one measurement may be [`Open`](MeasurementStatus::Open) or
/// [`Paused`](MeasurementStatus::Paused) at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum MeasurementStatus {
    /// Capturing is in progress.
    Open,
    /// Capturing is paused and may be resumed.
    Paused,
    /// Capturing has ended; the data waits for upload.
    Finished,
    /// The data has been uploaded.
    Synced,
    /// The user decided not to upload this measurement.
    Skipped,
    /// The data was persisted in a format that can no longer be uploaded.
    Deprecated,
}

impl MeasurementStatus {
    /// The tag stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementStatus::Open => "OPEN",
            MeasurementStatus::Paused => "PAUSED",
            MeasurementStatus::Finished => "FINISHED",
            MeasurementStatus::Synced => "SYNCED",
            MeasurementStatus::Skipped => "SKIPPED",
            MeasurementStatus::Deprecated => "DEPRECATED",
        }
    }

    /// Whether a capture session currently owns this measurement.
    pub fn is_active(&self) -> bool {
        matches!(self, MeasurementStatus::Open | MeasurementStatus::Paused)
    }

    /// Whether no further transition is allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MeasurementStatus::Synced | MeasurementStatus::Skipped | MeasurementStatus::Deprecated
        )
    }

    /// Whether `self → next` is a valid lifecycle transition.
    ///
    /// ```
    /// use cyface_types::MeasurementStatus::*;
    ///
    /// assert!(Open.can_transition_to(Paused));
    /// assert!(Paused.can_transition_to(Open));
    /// assert!(Finished.can_transition_to(Synced));
    /// assert!(!Synced.can_transition_to(Open));
    /// assert!(!Open.can_transition_to(Synced));
    /// ```
    pub fn can_transition_to(&self, next: MeasurementStatus) -> bool {
        use MeasurementStatus::*;
        matches!(
            (self, next),
            (Open, Paused)
                | (Open, Finished)
                | (Paused, Open)
                | (Paused, Finished)
                | (Finished, Synced)
                | (Finished, Skipped)
                | (Finished, Deprecated)
        )
    }
}

impl FromStr for MeasurementStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(MeasurementStatus::Open),
            "PAUSED" => Ok(MeasurementStatus::Paused),
            "FINISHED" => Ok(MeasurementStatus::Finished),
            "SYNCED" => Ok(MeasurementStatus::Synced),
            "SKIPPED" => Ok(MeasurementStatus::Skipped),
            "DEPRECATED" => Ok(MeasurementStatus::Deprecated),
            other => Err(ParseError::UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for MeasurementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mode of transport used while capturing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum Modality {
    #[default]
    Unknown,
    Car,
    Bicycle,
    Walking,
    Bus,
    Train,
    Motorbike,
}

impl Modality {
    /// The tag stored in the database and in modality-change events.
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Unknown => "UNKNOWN",
            Modality::Car => "CAR",
            Modality::Bicycle => "BICYCLE",
            Modality::Walking => "WALKING",
            Modality::Bus => "BUS",
            Modality::Train => "TRAIN",
            Modality::Motorbike => "MOTORBIKE",
        }
    }
}

impl FromStr for Modality {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNKNOWN" => Ok(Modality::Unknown),
            "CAR" => Ok(Modality::Car),
            "BICYCLE" => Ok(Modality::Bicycle),
            "WALKING" => Ok(Modality::Walking),
            "BUS" => Ok(Modality::Bus),
            "TRAIN" => Ok(Modality::Train),
            "MOTORBIKE" => Ok(Modality::Motorbike),
            other => Err(ParseError::UnknownModality(other.to_string())),
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum EventType {
    LifecycleStart,
    LifecyclePause,
    LifecycleResume,
    LifecycleStop,
    ModalityTypeChange,
}

impl EventType {
    /// The tag stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::LifecycleStart => "LIFECYCLE_START",
            EventType::LifecyclePause => "LIFECYCLE_PAUSE",
            EventType::LifecycleResume => "LIFECYCLE_RESUME",
            EventType::LifecycleStop => "LIFECYCLE_STOP",
            EventType::ModalityTypeChange => "MODALITY_TYPE_CHANGE",
        }
    }

    /// Events which close the current sub-track.
    pub fn ends_track(&self) -> bool {
        matches!(self, EventType::LifecyclePause | EventType::LifecycleStop)
    }

    /// Events which open a new sub-track.
    pub fn starts_track(&self) -> bool {
        matches!(self, EventType::LifecycleStart | EventType::LifecycleResume)
    }
}

impl FromStr for EventType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LIFECYCLE_START" => Ok(EventType::LifecycleStart),
            "LIFECYCLE_PAUSE" => Ok(EventType::LifecyclePause),
            "LIFECYCLE_RESUME" => Ok(EventType::LifecycleResume),
            "LIFECYCLE_STOP" => Ok(EventType::LifecycleStop),
            "MODALITY_TYPE_CHANGE" => Ok(EventType::ModalityTypeChange),
            other => Err(ParseError::UnknownEventType(other.to_string())),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upload status of an attachment file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum AttachmentStatus {
    Saved,
    Synced,
    Skipped,
    Deprecated,
}

impl AttachmentStatus {
    /// The tag stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentStatus::Saved => "SAVED",
            AttachmentStatus::Synced => "SYNCED",
            AttachmentStatus::Skipped => "SKIPPED",
            AttachmentStatus::Deprecated => "DEPRECATED",
        }
    }
}

impl FromStr for AttachmentStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SAVED" => Ok(AttachmentStatus::Saved),
            "SYNCED" => Ok(AttachmentStatus::Synced),
            "SKIPPED" => Ok(AttachmentStatus::Skipped),
            "DEPRECATED" => Ok(AttachmentStatus::Deprecated),
            other => Err(ParseError::UnknownAttachmentStatus(other.to_string())),
        }
    }
}

/// Content type of an attachment file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum AttachmentType {
    Csv,
    Json,
    Jpg,
}

impl AttachmentType {
    /// The tag stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentType::Csv => "CSV",
            AttachmentType::Json => "JSON",
            AttachmentType::Jpg => "JPG",
        }
    }
}

impl FromStr for AttachmentType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CSV" => Ok(AttachmentType::Csv),
            "JSON" => Ok(AttachmentType::Json),
            "JPG" => Ok(AttachmentType::Jpg),
            other => Err(ParseError::UnknownAttachmentType(other.to_string())),
        }
    }
}

/// Sensor producing [`Point3D`] samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum Point3DType {
    /// Accelerometer, m/s².
    Acceleration,
    /// Gyroscope, rad/s.
    Rotation,
    /// Magnetometer, µT.
    Direction,
}

impl Point3DType {
    /// All sensor types in transfer-file field order.
    pub const ALL: [Point3DType; 3] = [
        Point3DType::Acceleration,
        Point3DType::Rotation,
        Point3DType::Direction,
    ];

    /// Directory holding the binary files of this sensor type.
    pub fn folder_name(&self) -> &'static str {
        match self {
            Point3DType::Acceleration => "accelerations",
            Point3DType::Rotation => "rotations",
            Point3DType::Direction => "directions",
        }
    }

    /// File extension of the binary files of this sensor type.
    pub fn file_extension(&self) -> &'static str {
        match self {
            Point3DType::Acceleration => "cyfa",
            Point3DType::Rotation => "cyfr",
            Point3DType::Direction => "cyfd",
        }
    }
}

impl fmt::Display for Point3DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.folder_name())
    }
}

/// A GNSS fix.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeoLocation {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Degrees.
    pub latitude: f64,
    /// Degrees.
    pub longitude: f64,
    /// Metres above the WGS84 ellipsoid, if reported.
    pub altitude: Option<f64>,
    /// Metres per second.
    pub speed: f64,
    /// Horizontal accuracy in metres, if reported.
    pub accuracy: Option<f64>,
    /// Vertical accuracy in metres, if reported.
    pub vertical_accuracy: Option<f64>,
}

impl GeoLocation {
    /// A location with only the mandatory fields set.
    pub fn new(timestamp: i64, latitude: f64, longitude: f64, speed: f64) -> Self {
        Self {
            timestamp,
            latitude,
            longitude,
            altitude: None,
            speed,
            accuracy: None,
            vertical_accuracy: None,
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    pub fn with_vertical_accuracy(mut self, vertical_accuracy: f64) -> Self {
        self.vertical_accuracy = Some(vertical_accuracy);
        self
    }

    /// Great-circle distance to `other` in metres.
    pub fn distance_to(&self, other: &GeoLocation) -> f64 {
        haversine_distance(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

/// Mean Earth radius used for distance calculations, in metres.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Haversine great-circle distance between two coordinates, in metres.
///
/// ```
/// use cyface_types::haversine_distance;
///
/// // 0.001° of longitude on the equator
/// let d = haversine_distance(0.0, 0.0, 0.0, 0.001);
/// assert!((d - 111.195).abs() < 0.001);
/// ```
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_METERS * c
}

/// An atmospheric pressure reading in hPa.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pressure {
    pub timestamp: i64,
    pub pressure: f64,
}

impl Pressure {
    pub fn new(timestamp: i64, pressure: f64) -> Self {
        Self {
            timestamp,
            pressure,
        }
    }
}

/// A lifecycle or modality event of a measurement.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Event {
    pub timestamp: i64,
    pub event_type: EventType,
    /// Event payload, e.g. the new modality for [`EventType::ModalityTypeChange`].
    pub value: Option<String>,
}

impl Event {
    pub fn new(timestamp: i64, event_type: EventType) -> Self {
        Self {
            timestamp,
            event_type,
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// A three-axis sensor sample in the sensor's native unit.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point3D {
    pub timestamp: i64,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3D {
    pub fn new(timestamp: i64, x: f32, y: f32, z: f32) -> Self {
        Self { timestamp, x, y, z }
    }
}
