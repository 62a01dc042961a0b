//! Reconstruction of the continuous capture intervals of a measurement.
//!
//! A measurement is split into tracks at every pause and stop event. Data
//! captured between a pause and the following resume does not belong to any
//! track. Slicing works on immutable, timestamp-sorted slices with an
//! explicit [`TrackCursor`], so the caller's data is never modified.

use cyface_types::{Event, GeoLocation, Pressure};

/// Locations and pressures of one continuous capture interval.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    pub locations: Vec<GeoLocation>,
    pub pressures: Vec<Pressure>,
}

impl Track {
    /// A track without any data.
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty() && self.pressures.is_empty()
    }
}

/// Position of the next unconsumed entry in each sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackCursor {
    pub location: usize,
    pub pressure: usize,
}

/// Collect everything from `cursor` up to, but excluding, `boundary`.
///
/// Both slices must be sorted by ascending timestamp. Returns the collected
/// track and the cursor for the next call.
pub fn collect_next_sub_track(
    locations: &[GeoLocation],
    pressures: &[Pressure],
    cursor: TrackCursor,
    boundary: i64,
) -> (Track, TrackCursor) {
    let start = clamp(locations, pressures, cursor);
    let next = advance(locations, pressures, start, boundary);
    let track = Track {
        locations: locations[start.location..next.location].to_vec(),
        pressures: pressures[start.pressure..next.pressure].to_vec(),
    };
    (track, next)
}

/// Move the cursor past every entry before `boundary` without collecting.
fn advance(
    locations: &[GeoLocation],
    pressures: &[Pressure],
    cursor: TrackCursor,
    boundary: i64,
) -> TrackCursor {
    let TrackCursor { location, pressure } = clamp(locations, pressures, cursor);
    TrackCursor {
        location: location + locations[location..].partition_point(|l| l.timestamp < boundary),
        pressure: pressure + pressures[pressure..].partition_point(|p| p.timestamp < boundary),
    }
}

fn clamp(locations: &[GeoLocation], pressures: &[Pressure], cursor: TrackCursor) -> TrackCursor {
    TrackCursor {
        location: cursor.location.min(locations.len()),
        pressure: cursor.pressure.min(pressures.len()),
    }
}

/// Split a measurement into its tracks.
///
/// All three slices must be sorted by ascending timestamp. Pause and stop
/// events close the current track; data up to the next start or resume
/// event is skipped. Data after the last event belongs to a final track
/// unless the capture was paused or stopped. Empty tracks are dropped.
pub fn build_tracks(
    locations: &[GeoLocation],
    pressures: &[Pressure],
    events: &[Event],
) -> Vec<Track> {
    let mut tracks = Vec::new();
    let mut cursor = TrackCursor::default();
    let mut capturing = true;

    for event in events {
        if event.event_type.ends_track() {
            if capturing {
                let (track, next) =
                    collect_next_sub_track(locations, pressures, cursor, event.timestamp);
                cursor = next;
                if !track.is_empty() {
                    tracks.push(track);
                }
            }
            capturing = false;
        } else if event.event_type.starts_track() {
            if !capturing {
                cursor = advance(locations, pressures, cursor, event.timestamp);
            }
            capturing = true;
        }
    }

    if capturing {
        let (track, _) = collect_next_sub_track(locations, pressures, cursor, i64::MAX);
        if !track.is_empty() {
            tracks.push(track);
        }
    }

    tracks
}

/// Strategy deciding which locations are plausible enough to keep.
pub trait LocationCleaning {
    /// Whether the location should be kept.
    fn is_clean(&self, location: &GeoLocation) -> bool;

    /// A copy of the track holding only clean locations.
    fn clean(&self, track: &Track) -> Track {
        Track {
            locations: track
                .locations
                .iter()
                .filter(|l| self.is_clean(l))
                .cloned()
                .collect(),
            pressures: track.pressures.clone(),
        }
    }
}

/// Keeps locations moving between 1 km/h and 100 km/h with an accuracy
/// better than 20 m.
///
/// Locations without a reported accuracy are dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefaultLocationCleaning {
    /// Exclusive lower speed bound in m/s.
    pub min_speed: f64,
    /// Exclusive upper speed bound in m/s.
    pub max_speed: f64,
    /// Exclusive upper accuracy bound in metres.
    pub max_accuracy: f64,
}

impl Default for DefaultLocationCleaning {
    fn default() -> Self {
        Self {
            min_speed: 1.0 / 3.6,
            max_speed: 100.0 / 3.6,
            max_accuracy: 20.0,
        }
    }
}

impl LocationCleaning for DefaultLocationCleaning {
    fn is_clean(&self, location: &GeoLocation) -> bool {
        location.speed > self.min_speed
            && location.speed < self.max_speed
            && location
                .accuracy
                .is_some_and(|accuracy| accuracy < self.max_accuracy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyface_types::EventType;

    fn locations(timestamps: &[i64]) -> Vec<GeoLocation> {
        timestamps
            .iter()
            .map(|t| GeoLocation::new(*t, 51.0, 13.0, 5.0).with_accuracy(5.0))
            .collect()
    }

    fn pressures(timestamps: &[i64]) -> Vec<Pressure> {
        timestamps
            .iter()
            .map(|t| Pressure::new(*t, 1013.0))
            .collect()
    }

    fn timestamps(track: &Track) -> Vec<i64> {
        track.locations.iter().map(|l| l.timestamp).collect()
    }

    #[test]
    fn test_collect_next_sub_track() {
        let locations = locations(&[1, 2, 10, 11]);
        let pressures = pressures(&[1, 2, 10, 11]);

        let (track, cursor) =
            collect_next_sub_track(&locations, &pressures, TrackCursor::default(), 3);

        assert_eq!(timestamps(&track), vec![1, 2]);
        assert_eq!(track.pressures.len(), 2);
        assert_eq!(
            cursor,
            TrackCursor {
                location: 2,
                pressure: 2
            }
        );
        // The remaining two entries are what the next call sees
        assert_eq!(locations.len() - cursor.location, 2);
        assert_eq!(pressures[cursor.pressure..].len(), 2);

        let (rest, cursor) = collect_next_sub_track(&locations, &pressures, cursor, i64::MAX);
        assert_eq!(timestamps(&rest), vec![10, 11]);
        assert_eq!(cursor.location, 4);
    }

    #[test]
    fn test_collect_past_end_is_empty() {
        let locations = locations(&[1]);
        let cursor = TrackCursor {
            location: 1,
            pressure: 0,
        };
        let (track, next) = collect_next_sub_track(&locations, &[], cursor, 100);
        assert!(track.is_empty());
        assert_eq!(next, cursor);
    }

    #[test]
    fn test_tracks_split_at_pause_and_skip_paused_data() {
        let locations = locations(&[1, 2, 3, 5, 7, 8, 9]);
        let events = [
            Event::new(0, EventType::LifecycleStart),
            Event::new(4, EventType::LifecyclePause),
            // 5 was captured while paused
            Event::new(6, EventType::LifecycleResume),
            Event::new(10, EventType::LifecycleStop),
        ];

        let tracks = build_tracks(&locations, &[], &events);
        assert_eq!(tracks.len(), 2);
        assert_eq!(timestamps(&tracks[0]), vec![1, 2, 3]);
        assert_eq!(timestamps(&tracks[1]), vec![7, 8, 9]);
    }

    #[test]
    fn test_open_measurement_keeps_trailing_track() {
        let locations = locations(&[1, 2, 3]);
        let events = [Event::new(0, EventType::LifecycleStart)];

        let tracks = build_tracks(&locations, &[], &events);
        assert_eq!(tracks.len(), 1);
        assert_eq!(timestamps(&tracks[0]), vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_tracks_dropped() {
        let locations = locations(&[7, 8]);
        let events = [
            Event::new(0, EventType::LifecycleStart),
            Event::new(1, EventType::LifecyclePause),
            Event::new(5, EventType::LifecycleResume),
            Event::new(10, EventType::LifecycleStop),
        ];

        let tracks = build_tracks(&locations, &[], &events);
        assert_eq!(tracks.len(), 1);
        assert_eq!(timestamps(&tracks[0]), vec![7, 8]);
    }

    #[test]
    fn test_pressure_only_track() {
        let pressures = pressures(&[1, 2]);
        let events = [
            Event::new(0, EventType::LifecycleStart),
            Event::new(3, EventType::LifecycleStop),
        ];
        let tracks = build_tracks(&[], &pressures, &events);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].pressures.len(), 2);
    }

    #[test]
    fn test_modality_change_does_not_split() {
        let locations = locations(&[1, 2, 3]);
        let events = [
            Event::new(0, EventType::LifecycleStart),
            Event::new(2, EventType::ModalityTypeChange).with_value("BUS"),
            Event::new(4, EventType::LifecycleStop),
        ];
        assert_eq!(build_tracks(&locations, &[], &events).len(), 1);
    }

    #[test]
    fn test_default_cleaning() {
        let cleaning = DefaultLocationCleaning::default();

        assert!(cleaning.is_clean(&GeoLocation::new(1, 0.0, 0.0, 5.0).with_accuracy(10.0)));
        // Standing still
        assert!(!cleaning.is_clean(&GeoLocation::new(1, 0.0, 0.0, 0.2).with_accuracy(10.0)));
        // Faster than 100 km/h
        assert!(!cleaning.is_clean(&GeoLocation::new(1, 0.0, 0.0, 30.0).with_accuracy(10.0)));
        // Inaccurate or unknown accuracy
        assert!(!cleaning.is_clean(&GeoLocation::new(1, 0.0, 0.0, 5.0).with_accuracy(20.0)));
        assert!(!cleaning.is_clean(&GeoLocation::new(1, 0.0, 0.0, 5.0)));

        let track = Track {
            locations: vec![
                GeoLocation::new(1, 0.0, 0.0, 5.0).with_accuracy(3.0),
                GeoLocation::new(2, 0.0, 0.0, 0.0).with_accuracy(3.0),
            ],
            pressures: pressures(&[1]),
        };
        let cleaned = cleaning.clean(&track);
        assert_eq!(timestamps(&cleaned), vec![1]);
        assert_eq!(cleaned.pressures.len(), 1);
    }
}
