//! Capture lifecycle, track reconstruction and transfer-file serialization
//! for GNSS and sensor measurements.
//!
//! This crate sits on top of [`cyface_store`] and turns persisted
//! measurements into something useful: tracks with distance and ascent, and
//! compact transfer files ready for upload.
//!
//! # Features
//!
//! - **Capture sessions**: start, pause, resume and stop a measurement with
//!   matching lifecycle events, and recover measurements left open by a
//!   crashed run
//! - **Tracks**: split a measurement at pauses and stops
//! - **Derived metrics**: haversine distance, barometric and GNSS ascent
//! - **Transfer files**: delta-encoded protobuf with a version header,
//!   optionally raw-deflate compressed
//!
//! # Wire units
//!
//! | Quantity | Unit |
//! |----------|------|
//! | Coordinates | micro-degrees |
//! | Speed | cm/s |
//! | Accuracy | cm |
//! | Acceleration | mm/s² |
//! | Rotation | mrad/s |
//! | Direction | 10 nT |
//!
//! # Quick Start
//!
//! ```no_run
//! use cyface_core::{CaptureSession, Persistence, TransferFileAssembler};
//! use cyface_store::MigrationContext;
//! use cyface_types::{GeoLocation, Modality};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let data_dir = cyface_store::default_data_dir();
//!     let persistence = Persistence::open(&data_dir, MigrationContext::default()).await?;
//!
//!     let mut session = CaptureSession::start(&persistence, Modality::Bicycle).await?;
//!     session
//!         .record_location(GeoLocation::new(1_700_000_000_000, 51.05, 13.74, 4.2))
//!         .await?;
//!     let measurement = session.stop().await?;
//!
//!     let mut blob = Vec::new();
//!     TransferFileAssembler::new(persistence)
//!         .assemble_compressed(measurement.id, &mut blob)
//!         .await?;
//!     println!("{} bytes ready for upload", blob.len());
//!
//!     Ok(())
//! }
//! ```

pub mod altitude;
pub mod capture;
pub mod distance;
pub mod error;
pub mod formatter;
pub mod offsetter;
pub mod persistence;
pub mod protos;
pub mod serializer;
pub mod track;
pub mod transfer;

pub use capture::{CaptureSession, recover_dead_measurements};
pub use distance::{DistanceAccumulator, total_distance};
pub use error::{Error, Result};
pub use offsetter::Offsetter;
pub use persistence::{DeviceIdProvider, Persistence};
pub use track::{DefaultLocationCleaning, LocationCleaning, Track, build_tracks};
pub use transfer::TransferFileAssembler;
