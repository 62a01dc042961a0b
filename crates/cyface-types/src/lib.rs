//! Plain data types for captured measurements.
//!
//! This crate provides the records shared by the persistence layer
//! (cyface-store) and the serialization and track engine (cyface-core).
//!
//! # Features
//!
//! - Measurement lifecycle status with its transition rules
//! - GNSS locations, pressure readings, lifecycle events
//! - Three-axis sensor samples and their sensor types
//! - Format-version constants for persisted and transferred data
//!
//! # Example
//!
//! ```
//! use cyface_types::{EventType, MeasurementStatus};
//!
//! let status: MeasurementStatus = "PAUSED".parse()?;
//! assert!(status.is_active());
//! assert!(EventType::LifecyclePause.ends_track());
//! # Ok::<(), cyface_types::ParseError>(())
//! ```

pub mod error;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use types::{
    AttachmentStatus, AttachmentType, EARTH_RADIUS_METERS, Event, EventType, GeoLocation,
    MeasurementStatus, Modality, PERSISTENCE_FILE_FORMAT_VERSION, Point3D, Point3DType, Pressure,
    TRANSFER_FILE_FORMAT_VERSION, datetime_from_millis, haversine_distance,
};
