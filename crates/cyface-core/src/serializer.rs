//! Serialization of captured rows into transfer-format messages.
//!
//! Each serializer owns a fresh [`Offsetter`] per channel. Build one per
//! measurement (or per sensor batch) and never reuse it for another.

use prost::Message;

use cyface_types::{Event, GeoLocation, Point3D, Point3DType};

use crate::formatter;
use crate::offsetter::Offsetter;
use crate::protos;

/// Accumulates locations into [`protos::LocationRecords`].
///
/// Locations must be appended in ascending timestamp order.
///
/// # Example
///
/// ```
/// use cyface_core::serializer::LocationSerializer;
/// use cyface_types::GeoLocation;
///
/// let mut serializer = LocationSerializer::new();
/// serializer.append(&GeoLocation::new(1_000, 51.0, 13.0, 5.0));
/// serializer.append(&GeoLocation::new(2_000, 51.000001, 13.0, 5.5));
///
/// let records = serializer.finish();
/// assert_eq!(records.timestamp, vec![1_000, 1_000]);
/// assert_eq!(records.latitude, vec![51_000_000, 1]);
/// assert_eq!(records.speed, vec![500, 50]);
/// ```
#[derive(Debug, Default)]
pub struct LocationSerializer {
    timestamp: Offsetter,
    latitude: Offsetter,
    longitude: Offsetter,
    accuracy: Offsetter,
    speed: Offsetter,
    records: protos::LocationRecords,
}

impl LocationSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Format, delta-encode and append one location.
    pub fn append(&mut self, location: &GeoLocation) {
        // Accuracy is persisted in metres, unknown accuracy is sent as zero
        let accuracy_cm = location.accuracy.unwrap_or(0.0) * 100.0;

        self.records
            .timestamp
            .push(timestamp_delta(&mut self.timestamp, location.timestamp));
        self.records
            .latitude
            .push(delta(&mut self.latitude, formatter::coordinate(location.latitude)));
        self.records
            .longitude
            .push(delta(&mut self.longitude, formatter::coordinate(location.longitude)));
        self.records
            .accuracy
            .push(delta(&mut self.accuracy, formatter::accuracy(accuracy_cm)));
        self.records
            .speed
            .push(delta(&mut self.speed, formatter::speed(location.speed)));
    }

    /// Number of appended locations.
    pub fn len(&self) -> usize {
        self.records.timestamp.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The finished message.
    ///
    /// # Panics
    ///
    /// If the parallel arrays are not of equal length.
    pub fn finish(self) -> protos::LocationRecords {
        let records = self.records;
        let n = records.timestamp.len();
        assert!(
            records.latitude.len() == n
                && records.longitude.len() == n
                && records.accuracy.len() == n
                && records.speed.len() == n,
            "location arrays are not aligned"
        );
        records
    }
}

/// Serialize one batch of sensor samples into sensor-file bytes.
///
/// The result is an encoded [`protos::Point3DBinary`] holding a single
/// batch, so successive batches can simply be appended to the same file.
/// An empty slice yields no bytes.
pub fn serialize_points(points: &[Point3D], sensor: Point3DType) -> Vec<u8> {
    if points.is_empty() {
        return Vec::new();
    }

    let format: fn(f64) -> i32 = match sensor {
        Point3DType::Acceleration => formatter::acceleration,
        Point3DType::Rotation => formatter::rotation,
        Point3DType::Direction => formatter::direction,
    };

    let mut timestamp = Offsetter::new();
    let mut x = Offsetter::new();
    let mut y = Offsetter::new();
    let mut z = Offsetter::new();

    let mut batch = protos::Point3DBatch {
        timestamp: Vec::with_capacity(points.len()),
        x: Vec::with_capacity(points.len()),
        y: Vec::with_capacity(points.len()),
        z: Vec::with_capacity(points.len()),
    };
    for point in points {
        batch
            .timestamp
            .push(timestamp_delta(&mut timestamp, point.timestamp));
        batch.x.push(delta(&mut x, format(f64::from(point.x))));
        batch.y.push(delta(&mut y, format(f64::from(point.y))));
        batch.z.push(delta(&mut z, format(f64::from(point.z))));
    }

    protos::Point3DBinary {
        batches: vec![batch],
    }
    .encode_to_vec()
}

/// Convert events in chronological order into their wire form.
pub fn serialize_events(events: &[Event]) -> Vec<protos::Event> {
    events
        .iter()
        .map(|event| protos::Event {
            timestamp: absolute_timestamp(event.timestamp),
            r#type: protos::EventType::from(event.event_type) as i32,
            value: event.value.clone().unwrap_or_default(),
        })
        .collect()
}

fn delta(offsetter: &mut Offsetter, value: i32) -> i32 {
    // The offsetter checks that the delta fits
    offsetter.offset(i64::from(value)) as i32
}

fn timestamp_delta(offsetter: &mut Offsetter, timestamp: i64) -> u64 {
    let delta = offsetter.offset(timestamp);
    u64::try_from(delta)
        .unwrap_or_else(|_| panic!("timestamps must be ascending, got delta {}", delta))
}

fn absolute_timestamp(timestamp: i64) -> u64 {
    u64::try_from(timestamp)
        .unwrap_or_else(|_| panic!("timestamp {} before the Unix epoch", timestamp))
}
