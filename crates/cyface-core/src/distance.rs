//! Travelled distance over reconstructed tracks.

use cyface_types::GeoLocation;

use crate::track::{LocationCleaning, Track};

/// Haversine distance in metres between consecutive locations of a track.
pub fn track_distance(track: &Track) -> f64 {
    track
        .locations
        .windows(2)
        .map(|pair| pair[0].distance_to(&pair[1]))
        .sum()
}

/// Distance summed over all tracks.
///
/// Gaps between tracks are not counted. With a cleaning strategy, implausible
/// locations are dropped from every track first.
pub fn total_distance(tracks: &[Track], cleaning: Option<&dyn LocationCleaning>) -> f64 {
    tracks
        .iter()
        .map(|track| match cleaning {
            Some(cleaning) => track_distance(&cleaning.clean(track)),
            None => track_distance(track),
        })
        .sum()
}

/// Running distance of a capture in progress.
///
/// Holds the last location explicitly so the caller controls where a track
/// ends, e.g. by calling [`DistanceAccumulator::reset`] on pause.
#[derive(Debug, Clone, Default)]
pub struct DistanceAccumulator {
    last: Option<GeoLocation>,
}

impl DistanceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Distance from the previous location, zero for the first one.
    pub fn push(&mut self, location: &GeoLocation) -> f64 {
        let delta = self
            .last
            .as_ref()
            .map_or(0.0, |last| last.distance_to(location));
        self.last = Some(location.clone());
        delta
    }

    /// Forget the previous location.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
