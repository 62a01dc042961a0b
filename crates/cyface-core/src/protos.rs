//! Protocol buffer messages of the transfer format.
//!
//! The layout is fixed by the receiving backend, so field numbers and types
//! must not change:
//!
//! ```text
//! message MeasurementBytes {
//!   uint32 format_version = 1;
//!   LocationRecords location_records = 2;
//!   AccelerationsBinary accelerations_binary = 3;
//!   RotationsBinary rotations_binary = 4;
//!   DirectionsBinary directions_binary = 5;
//!   repeated Event events = 6;
//! }
//! ```
//!
//! The three sensor fields are length-delimited messages on the wire. They
//! are declared as `bytes` here so the pre-serialized sensor files can be
//! embedded without decoding them.

/// One complete measurement.
#[derive(Clone, PartialEq, prost::Message)]
pub struct MeasurementBytes {
    #[prost(uint32, tag = "1")]
    pub format_version: u32,
    #[prost(message, optional, tag = "2")]
    pub location_records: Option<LocationRecords>,
    #[prost(bytes = "vec", tag = "3")]
    pub accelerations_binary: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub rotations_binary: Vec<u8>,
    #[prost(bytes = "vec", tag = "5")]
    pub directions_binary: Vec<u8>,
    #[prost(message, repeated, tag = "6")]
    pub events: Vec<Event>,
}

/// Delta-encoded locations as parallel arrays.
///
/// Entry `i` of every array describes the same location.
#[derive(Clone, PartialEq, prost::Message)]
pub struct LocationRecords {
    /// Milliseconds since the Unix epoch.
    #[prost(uint64, repeated, tag = "1")]
    pub timestamp: Vec<u64>,
    /// Micro-degrees.
    #[prost(int32, repeated, tag = "2")]
    pub latitude: Vec<i32>,
    /// Micro-degrees.
    #[prost(int32, repeated, tag = "3")]
    pub longitude: Vec<i32>,
    /// Centimetres.
    #[prost(int32, repeated, tag = "5")]
    pub accuracy: Vec<i32>,
    /// Centimetres per second.
    #[prost(int32, repeated, tag = "6")]
    pub speed: Vec<i32>,
}

/// A lifecycle or modality event.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Event {
    /// Milliseconds since the Unix epoch, not delta-encoded.
    #[prost(uint64, tag = "1")]
    pub timestamp: u64,
    #[prost(enumeration = "EventType", tag = "2")]
    pub r#type: i32,
    #[prost(string, tag = "3")]
    pub value: String,
}

/// Event types as numbered on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum EventType {
    Unspecified = 0,
    LifecycleStart = 1,
    LifecycleStop = 2,
    LifecycleResume = 3,
    LifecyclePause = 4,
    ModalityTypeChange = 5,
}

impl From<cyface_types::EventType> for EventType {
    fn from(event_type: cyface_types::EventType) -> Self {
        use cyface_types::EventType as Stored;
        match event_type {
            Stored::LifecycleStart => EventType::LifecycleStart,
            Stored::LifecycleStop => EventType::LifecycleStop,
            Stored::LifecycleResume => EventType::LifecycleResume,
            Stored::LifecyclePause => EventType::LifecyclePause,
            Stored::ModalityTypeChange => EventType::ModalityTypeChange,
        }
    }
}

/// One batch of delta-encoded three-axis samples.
///
/// Used for accelerations (mm/s²), rotations (mrad/s) and directions (10 nT).
#[derive(Clone, PartialEq, prost::Message)]
pub struct Point3DBatch {
    #[prost(uint64, repeated, tag = "1")]
    pub timestamp: Vec<u64>,
    #[prost(int32, repeated, tag = "2")]
    pub x: Vec<i32>,
    #[prost(int32, repeated, tag = "3")]
    pub y: Vec<i32>,
    #[prost(int32, repeated, tag = "4")]
    pub z: Vec<i32>,
}

/// Content of a sensor file and of the matching transfer-file field.
///
/// Encoded wrappers with one batch each can be concatenated; the result
/// decodes as one wrapper holding all batches.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Point3DBinary {
    #[prost(message, repeated, tag = "1")]
    pub batches: Vec<Point3DBatch>,
}
