//! Show command: one measurement with its derived metrics.

use anyhow::{Context, Result};
use serde::Serialize;

use cyface_core::altitude::{self, PressureAscentOptions};
use cyface_core::distance::track_distance;
use cyface_core::{DefaultLocationCleaning, LocationCleaning, Persistence, Track};
use cyface_store::Measurement;
use cyface_types::Point3DType;

use super::CommandContext;
use crate::format::{format_ascent, format_bytes, format_created, format_distance};

/// Everything the show command prints.
#[derive(Debug, Serialize)]
pub struct MeasurementSummary {
    #[serde(flatten)]
    pub measurement: Measurement,
    pub locations: u64,
    pub pressures: usize,
    pub events: usize,
    pub attachments: usize,
    /// Distance over the rebuilt tracks, in metres.
    pub track_distance: f64,
    /// Total ascent in metres, if any track has altitude data.
    pub ascent: Option<f64>,
    pub tracks: Vec<TrackSummary>,
    pub sensor_files: Vec<SensorFileSummary>,
}

#[derive(Debug, Serialize)]
pub struct TrackSummary {
    pub locations: usize,
    pub pressures: usize,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub distance: f64,
    pub ascent: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SensorFileSummary {
    pub sensor: Point3DType,
    pub bytes: u64,
}

impl TrackSummary {
    fn new(track: &Track, cleaning: Option<&dyn LocationCleaning>) -> Self {
        let distance = match cleaning {
            Some(cleaning) => track_distance(&cleaning.clean(track)),
            None => track_distance(track),
        };
        let first = [
            track.locations.first().map(|l| l.timestamp),
            track.pressures.first().map(|p| p.timestamp),
        ];
        let last = [
            track.locations.last().map(|l| l.timestamp),
            track.pressures.last().map(|p| p.timestamp),
        ];

        Self {
            locations: track.locations.len(),
            pressures: track.pressures.len(),
            start: first.into_iter().flatten().min(),
            end: last.into_iter().flatten().max(),
            distance,
            ascent: altitude::track_ascent(track, &PressureAscentOptions::default()),
        }
    }
}

/// Collect the summary of one measurement.
pub async fn summarize(
    persistence: &Persistence,
    id: i64,
    clean_locations: bool,
) -> Result<MeasurementSummary> {
    let measurement = persistence
        .load_measurement(id)
        .await
        .with_context(|| format!("Failed to load measurement {}", id))?;

    let cleaning = DefaultLocationCleaning::default();
    let cleaning: Option<&dyn LocationCleaning> = clean_locations.then_some(&cleaning);

    let tracks = persistence.load_tracks(id).await?;
    let ascent = altitude::total_ascent(&tracks, &PressureAscentOptions::default());
    let tracks: Vec<TrackSummary> = tracks
        .iter()
        .map(|track| TrackSummary::new(track, cleaning))
        .collect();

    let mut sensor_files = Vec::new();
    for sensor in Point3DType::ALL {
        let path = persistence.sensor_files().path(id, sensor);
        if let Ok(metadata) = tokio::fs::metadata(&path).await {
            sensor_files.push(SensorFileSummary {
                sensor,
                bytes: metadata.len(),
            });
        }
    }

    Ok(MeasurementSummary {
        locations: persistence.count_locations(id).await?,
        pressures: persistence.load_pressures(id).await?.len(),
        events: persistence.load_events(id).await?.len(),
        attachments: persistence.load_attachments(id).await?.len(),
        track_distance: tracks.iter().map(|t| t.distance).sum(),
        ascent,
        tracks,
        sensor_files,
        measurement,
    })
}

/// Show one measurement.
pub async fn cmd_show(ctx: &CommandContext, id: i64, json: bool) -> Result<()> {
    let persistence = ctx.open().await?;
    let summary = summarize(&persistence, id, ctx.config.tracks.clean_locations).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let m = &summary.measurement;
    println!("Measurement {}", m.id);
    println!("  Status:          {}", m.status);
    println!("  Modality:        {}", m.modality);
    println!("  Created:         {}", format_created(m));
    println!("  Format version:  {}", m.file_format_version);
    println!("  Distance:        {}", format_distance(m.distance));
    println!("  Track distance:  {}", format_distance(summary.track_distance));
    println!("  Ascent:          {}", format_ascent(summary.ascent));
    println!("  Locations:       {}", summary.locations);
    println!("  Pressures:       {}", summary.pressures);
    println!("  Events:          {}", summary.events);
    println!(
        "  Attachments:     {} ({})",
        summary.attachments,
        format_bytes(m.files_size)
    );
    for file in &summary.sensor_files {
        println!("  {:<16} {}", format!("{}:", file.sensor), format_bytes(file.bytes));
    }

    if !summary.tracks.is_empty() {
        println!();
        println!("Tracks:");
        for (i, track) in summary.tracks.iter().enumerate() {
            println!(
                "  {:>3}. {} locations, {} pressures, {}, ascent {}",
                i + 1,
                track.locations,
                track.pressures,
                format_distance(track.distance),
                format_ascent(track.ascent)
            );
        }
    }
    Ok(())
}
