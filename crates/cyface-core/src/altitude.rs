//! Altitude and ascent derived from barometric pressure or GNSS altitude.
//!
//! # Noise rejection
//!
//! Both sources use the same policy. Altitudes are first rounded to
//! [`ALTITUDE_RESOLUTION`] (10 cm), well below what either sensor resolves.
//! Walking the rounded sequence, a step only counts once it differs from the
//! last counted altitude by at least the threshold (2 m for both sources).
//! Counted upward steps add to the ascent; downward steps only move the
//! reference. Jitter below the threshold therefore never accumulates, and
//! centimetre residue of noisy readings does not leak into the sum.
//!
//! Pressure altitudes are computed against the standard atmosphere unless
//! [`AltitudeReference::FirstReading`] is chosen. Smoothing with a moving
//! average is available but off by default, since the threshold already
//! rejects sensor noise.

use cyface_types::{GeoLocation, Pressure};

use crate::track::Track;

/// Sea-level pressure of the standard atmosphere in hPa.
pub const STANDARD_PRESSURE_HPA: f64 = 1013.25;

/// Minimum altitude change in metres counted for pressure altitudes.
pub const PRESSURE_ASCENT_THRESHOLD: f64 = 2.0;

/// Minimum altitude change in metres counted for GNSS altitudes.
pub const GNSS_ASCENT_THRESHOLD: f64 = 2.0;

/// Altitudes are compared in steps of this many metres.
pub const ALTITUDE_RESOLUTION: f64 = 0.1;

/// Baseline pressure for the barometric formula.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum AltitudeReference {
    /// Absolute altitude against 1013.25 hPa.
    #[default]
    StandardAtmosphere,
    /// Altitude relative to the first reading of the track.
    FirstReading,
}

/// Options for ascent from pressure readings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureAscentOptions {
    pub reference: AltitudeReference,
    /// Moving-average window applied to the altitudes, if any.
    pub smoothing_window: Option<usize>,
    pub threshold: f64,
}

impl Default for PressureAscentOptions {
    fn default() -> Self {
        Self {
            reference: AltitudeReference::default(),
            smoothing_window: None,
            threshold: PRESSURE_ASCENT_THRESHOLD,
        }
    }
}

/// Altitude in metres for a pressure reading, relative to `reference_hpa`.
pub fn altitude_from_pressure(pressure_hpa: f64, reference_hpa: f64) -> f64 {
    44_330.0 * (1.0 - (pressure_hpa / reference_hpa).powf(1.0 / 5.255))
}

/// Pressure in hPa at `altitude` metres above the reference.
///
/// Inverse of [`altitude_from_pressure`].
pub fn pressure_at_altitude(altitude: f64, reference_hpa: f64) -> f64 {
    reference_hpa * (1.0 - altitude / 44_330.0).powf(5.255)
}

/// Arithmetic means of every full window.
///
/// Returns `values.len() - window + 1` averages, or none if there are
/// fewer values than the window.
///
/// # Example
///
/// ```
/// use cyface_core::altitude::moving_average;
///
/// let averages = moving_average(&[0.0, 1.0, 0.0, 0.0, 0.0, 4.0, 1.0], 5);
/// assert_eq!(averages, vec![0.2, 1.0, 1.0]);
/// ```
///
/// # Panics
///
/// If `window` is zero.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    assert!(window > 0, "moving average window must not be empty");
    values
        .windows(window)
        .map(|w| w.iter().sum::<f64>() / window as f64)
        .collect()
}

/// Accumulated ascent of an altitude sequence.
///
/// `None` for fewer than two altitudes, otherwise the sum of counted upward
/// steps, which is `Some(0.0)` if the sequence never climbs. The result is a
/// multiple of [`ALTITUDE_RESOLUTION`].
///
/// # Example
///
/// ```
/// use cyface_core::altitude::ascent_from_altitudes;
///
/// let ascent = ascent_from_altitudes(&[0.0, 1.0, -1.0, 0.0, 1.0, 3.01, 1.0, 3.01], 2.0);
/// assert_eq!(ascent, Some(5.0));
/// ```
pub fn ascent_from_altitudes(altitudes: &[f64], threshold: f64) -> Option<f64> {
    let (first, rest) = altitudes.split_first()?;
    if rest.is_empty() {
        return None;
    }

    let threshold = to_steps(threshold);
    let mut reference = to_steps(*first);
    let mut ascent: i64 = 0;
    for &altitude in rest {
        let altitude = to_steps(altitude);
        let delta = altitude - reference;
        if delta.abs() >= threshold {
            if delta > 0 {
                ascent += delta;
            }
            reference = altitude;
        }
    }
    Some(ascent as f64 * ALTITUDE_RESOLUTION)
}

fn to_steps(meters: f64) -> i64 {
    (meters / ALTITUDE_RESOLUTION).round() as i64
}

/// Ascent of a pressure sequence.
pub fn ascent_from_pressures(
    pressures: &[Pressure],
    options: &PressureAscentOptions,
) -> Option<f64> {
    let reference = match options.reference {
        AltitudeReference::StandardAtmosphere => STANDARD_PRESSURE_HPA,
        AltitudeReference::FirstReading => pressures.first()?.pressure,
    };

    let altitudes: Vec<f64> = pressures
        .iter()
        .map(|p| altitude_from_pressure(p.pressure, reference))
        .collect();

    match options.smoothing_window {
        Some(window) => {
            ascent_from_altitudes(&moving_average(&altitudes, window), options.threshold)
        }
        None => ascent_from_altitudes(&altitudes, options.threshold),
    }
}

/// Ascent of the GNSS altitudes of a location sequence.
///
/// Locations without altitude are skipped.
pub fn ascent_from_gnss(locations: &[GeoLocation]) -> Option<f64> {
    let altitudes: Vec<f64> = locations.iter().filter_map(|l| l.altitude).collect();
    ascent_from_altitudes(&altitudes, GNSS_ASCENT_THRESHOLD)
}

/// Ascent of one track, preferring pressure over GNSS altitude.
pub fn track_ascent(track: &Track, options: &PressureAscentOptions) -> Option<f64> {
    ascent_from_pressures(&track.pressures, options).or_else(|| ascent_from_gnss(&track.locations))
}

/// Ascent summed over all tracks, `None` if no track has usable altitudes.
pub fn total_ascent(tracks: &[Track], options: &PressureAscentOptions) -> Option<f64> {
    tracks
        .iter()
        .filter_map(|track| track_ascent(track, options))
        .reduce(|a, b| a + b)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOISY_CLIMB: [f64; 8] = [0.0, 1.0, -1.0, 0.0, 1.0, 3.01, 1.0, 3.01];

    fn pressures_for(altitudes: &[f64]) -> Vec<Pressure> {
        altitudes
            .iter()
            .enumerate()
            .map(|(i, a)| Pressure::new(i as i64, pressure_at_altitude(*a, STANDARD_PRESSURE_HPA)))
            .collect()
    }

    #[test]
    fn test_moving_average() {
        let averages = moving_average(&[0.0, 1.0, 0.0, 0.0, 0.0, 4.0, 1.0], 5);
        assert_eq!(averages.len(), 3);
        assert!((averages[0] - 0.2).abs() < 1e-12);
        assert!((averages[1] - 1.0).abs() < 1e-12);
        assert!((averages[2] - 1.0).abs() < 1e-12);

        assert!(moving_average(&[1.0, 2.0], 5).is_empty());
    }

    #[test]
    fn test_barometric_formula() {
        assert_eq!(altitude_from_pressure(STANDARD_PRESSURE_HPA, STANDARD_PRESSURE_HPA), 0.0);
        // Roughly 8 m per hPa near sea level
        let altitude = altitude_from_pressure(1012.25, STANDARD_PRESSURE_HPA);
        assert!(altitude > 8.0 && altitude < 8.6);

        let pressure = pressure_at_altitude(123.4, STANDARD_PRESSURE_HPA);
        assert!((altitude_from_pressure(pressure, STANDARD_PRESSURE_HPA) - 123.4).abs() < 1e-6);
    }

    #[test]
    fn test_ascent_from_pressures() {
        // Noise of one metre, then +3.01, -2.01, +2.01
        let ascent =
            ascent_from_pressures(&pressures_for(&NOISY_CLIMB), &PressureAscentOptions::default())
                .unwrap();
        assert!((ascent - 5.0).abs() <= 0.02, "ascent {}", ascent);
    }

    #[test]
    fn test_pressure_noise_only_is_zero() {
        let ascent = ascent_from_pressures(
            &pressures_for(&[0.0, 1.0, -1.0]),
            &PressureAscentOptions::default(),
        );
        assert_eq!(ascent, Some(0.0));
    }

    #[test]
    fn test_pressure_relative_to_first_reading() {
        let options = PressureAscentOptions {
            reference: AltitudeReference::FirstReading,
            ..Default::default()
        };

        let noisy: Vec<f64> = NOISY_CLIMB.iter().map(|a| a + 500.0).collect();
        let pressures = pressures_for(&noisy);
        let absolute =
            ascent_from_pressures(&pressures, &PressureAscentOptions::default()).unwrap();
        assert!((absolute - 5.0).abs() <= 0.02, "ascent {}", absolute);
        let relative = ascent_from_pressures(&pressures, &options).unwrap();
        assert!((relative - 5.0).abs() <= 0.02, "ascent {}", relative);

        // Ten metres against a lower baseline read as 10.11 m
        let pressures = pressures_for(&[500.0, 510.0]);
        let absolute =
            ascent_from_pressures(&pressures, &PressureAscentOptions::default()).unwrap();
        assert!((absolute - 10.0).abs() < 1e-9, "ascent {}", absolute);
        let relative = ascent_from_pressures(&pressures, &options).unwrap();
        assert!((relative - 10.1).abs() < 1e-9, "ascent {}", relative);
    }

    #[test]
    fn test_smoothed_pressure_ascent() {
        let altitudes: Vec<f64> = (0..20).map(|i| f64::from(i) * 1.5).collect();
        let options = PressureAscentOptions {
            smoothing_window: Some(5),
            ..Default::default()
        };
        let ascent = ascent_from_pressures(&pressures_for(&altitudes), &options).unwrap();
        // Averages climb from 3 to 25.5, counted every 3 m up to 24
        assert!((ascent - 21.0).abs() < 0.02, "ascent {}", ascent);
    }

    #[test]
    fn test_ascent_from_gnss() {
        let locations: Vec<GeoLocation> = NOISY_CLIMB
            .iter()
            .enumerate()
            .map(|(i, a)| GeoLocation::new(i as i64, 0.0, 0.0, 1.0).with_altitude(*a))
            .collect();

        let ascent = ascent_from_gnss(&locations).unwrap();
        assert!((ascent - 5.0).abs() <= 0.01, "ascent {}", ascent);
    }

    #[test]
    fn test_gnss_noise_only_is_zero() {
        let locations: Vec<GeoLocation> = [0.0, 1.0, -1.0]
            .iter()
            .enumerate()
            .map(|(i, a)| GeoLocation::new(i as i64, 0.0, 0.0, 1.0).with_altitude(*a))
            .collect();
        assert_eq!(ascent_from_gnss(&locations), Some(0.0));
    }

    #[test]
    fn test_ascent_is_multiple_of_resolution() {
        let ascent = ascent_from_altitudes(&[100.0, 102.04, 104.16, 101.93, 104.0], 2.0).unwrap();
        // In decimetres: +20 and +22 count, -23 moves the reference, +21 counts
        assert!((ascent - 6.3).abs() < 1e-9, "ascent {}", ascent);

        // 1.96 m rounds up to the 2 m threshold
        assert_eq!(ascent_from_altitudes(&[0.0, 1.96], 2.0), Some(2.0));
        assert_eq!(ascent_from_altitudes(&[0.0, 1.94], 2.0), Some(0.0));
    }

    #[test]
    fn test_no_usable_data() {
        assert_eq!(ascent_from_altitudes(&[], 2.0), None);
        assert_eq!(ascent_from_altitudes(&[5.0], 2.0), None);
        assert_eq!(ascent_from_gnss(&[GeoLocation::new(1, 0.0, 0.0, 1.0)]), None);
        assert_eq!(
            total_ascent(&[Track::default()], &PressureAscentOptions::default()),
            None
        );
    }

    #[test]
    fn test_track_ascent_prefers_pressure() {
        let track = Track {
            locations: vec![
                GeoLocation::new(0, 0.0, 0.0, 1.0).with_altitude(0.0),
                GeoLocation::new(1, 0.0, 0.0, 1.0).with_altitude(50.0),
            ],
            pressures: pressures_for(&[0.0, 10.0]),
        };
        let ascent = track_ascent(&track, &PressureAscentOptions::default()).unwrap();
        assert!((ascent - 10.0).abs() < 0.01);

        let gnss_only = Track {
            locations: track.locations.clone(),
            pressures: Vec::new(),
        };
        let total = total_ascent(&[track, gnss_only], &PressureAscentOptions::default()).unwrap();
        assert!((total - 60.0).abs() < 0.01);
    }
}
