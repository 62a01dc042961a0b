//! Text formatting helpers for command output.

use time::format_description::well_known::Rfc3339;

use cyface_store::Measurement;

/// Creation time of a measurement as RFC 3339, or the raw milliseconds.
pub fn format_created(measurement: &Measurement) -> String {
    measurement
        .created_at()
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_else(|| format!("{} ms", measurement.timestamp))
}

/// Distance in kilometres with two decimals.
pub fn format_distance(meters: f64) -> String {
    format!("{:.2} km", meters / 1_000.0)
}

/// Optional ascent in metres.
pub fn format_ascent(ascent: Option<f64>) -> String {
    match ascent {
        Some(meters) => format!("{:.1} m", meters),
        None => "n/a".to_string(),
    }
}

/// Byte counts with binary units.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// One line per measurement for the list command.
pub fn format_measurement_line(measurement: &Measurement) -> String {
    format!(
        "{:>6}  {:<10} {:<10} {}  {:>10}",
        measurement.id,
        measurement.status.as_str(),
        measurement.modality.as_str(),
        format_created(measurement),
        format_distance(measurement.distance)
    )
}
