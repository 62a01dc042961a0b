//! Transfer files: one measurement as a versioned binary blob for upload.
//!
//! Layout:
//!
//! ```text
//! +----------------+------------------------------------+
//! | version (u16)  | MeasurementBytes (protobuf)        |
//! | big-endian     |                                    |
//! +----------------+------------------------------------+
//! ```
//!
//! Locations are delta-encoded while paging through the store. Sensor files
//! were serialized at capture time and are embedded verbatim. The compressed
//! variant applies raw deflate (no zlib or gzip wrapper) to the whole blob.

use std::io::Write;
use std::path::Path;

use flate2::Compression;
use flate2::write::DeflateEncoder;
use prost::Message;
use tracing::{debug, info, warn};

use cyface_types::{PERSISTENCE_FILE_FORMAT_VERSION, Point3DType, TRANSFER_FILE_FORMAT_VERSION};

use crate::error::{Error, Result};
use crate::persistence::Persistence;
use crate::protos::MeasurementBytes;
use crate::serializer::{self, LocationSerializer};

/// Length of the version header in bytes.
pub const HEADER_LEN: usize = 2;

/// Locations fetched per store round trip.
pub const DEFAULT_PAGE_SIZE: u32 = 10_000;

/// The version header preceding every transfer file.
pub fn header() -> [u8; HEADER_LEN] {
    TRANSFER_FILE_FORMAT_VERSION.to_be_bytes()
}

/// Header followed by the encoded message.
pub fn transfer_bytes(message: &MeasurementBytes) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_LEN + message.encoded_len());
    bytes.extend_from_slice(&header());
    bytes.extend(message.encode_to_vec());
    bytes
}

/// Raw deflate of `bytes`.
pub fn compress(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()
}

/// Builds transfer files from persisted measurements.
#[derive(Clone)]
pub struct TransferFileAssembler {
    persistence: Persistence,
    page_size: u32,
}

impl TransferFileAssembler {
    pub fn new(persistence: Persistence) -> Self {
        Self {
            persistence,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Fetch locations in pages of this many rows. Zero is treated as one.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Collect and serialize everything captured for a measurement.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedFormat`] if the measurement was persisted in an
    /// older format. Nothing else is read in that case.
    pub async fn load(&self, measurement_id: i64) -> Result<MeasurementBytes> {
        let measurement = self.persistence.load_measurement(measurement_id).await?;
        if measurement.file_format_version != PERSISTENCE_FILE_FORMAT_VERSION {
            return Err(Error::UnsupportedFormat {
                measurement_id,
                found: measurement.file_format_version,
                expected: PERSISTENCE_FILE_FORMAT_VERSION,
            });
        }

        let events = self.persistence.load_events(measurement_id).await?;
        let events = serializer::serialize_events(&events);

        let mut locations = LocationSerializer::new();
        let mut offset = 0;
        loop {
            let page = self
                .persistence
                .location_page(measurement_id, offset, self.page_size)
                .await?;
            for location in &page {
                locations.append(location);
            }
            if page.len() < self.page_size as usize {
                break;
            }
            offset += self.page_size;
        }
        debug!(
            "Serialized {} locations of measurement {}",
            locations.len(),
            measurement_id
        );

        let accelerations_binary = self
            .sensor_bytes(measurement_id, Point3DType::Acceleration)
            .await?;
        let rotations_binary = self.sensor_bytes(measurement_id, Point3DType::Rotation).await?;
        let directions_binary = self.sensor_bytes(measurement_id, Point3DType::Direction).await?;

        Ok(MeasurementBytes {
            format_version: u32::from(TRANSFER_FILE_FORMAT_VERSION),
            location_records: Some(locations.finish()),
            accelerations_binary,
            rotations_binary,
            directions_binary,
            events,
        })
    }

    async fn sensor_bytes(&self, measurement_id: i64, sensor: Point3DType) -> Result<Vec<u8>> {
        Ok(self
            .persistence
            .read_sensor_file(measurement_id, sensor)
            .await?
            .unwrap_or_default())
    }

    /// Write the uncompressed transfer file to `sink`.
    ///
    /// The sink is flushed but not closed. Returns the number of bytes written.
    pub async fn assemble<W: Write>(&self, measurement_id: i64, sink: &mut W) -> Result<usize> {
        let bytes = transfer_bytes(&self.load(measurement_id).await?);
        sink.write_all(&bytes)?;
        sink.flush()?;
        Ok(bytes.len())
    }

    /// Write the deflate-compressed transfer file to `sink`.
    ///
    /// Returns the number of compressed bytes written.
    pub async fn assemble_compressed<W: Write>(
        &self,
        measurement_id: i64,
        sink: &mut W,
    ) -> Result<usize> {
        let bytes = transfer_bytes(&self.load(measurement_id).await?);
        let compressed = compress(&bytes)?;
        debug!(
            "Compressed measurement {} from {} to {} bytes",
            measurement_id,
            bytes.len(),
            compressed.len()
        );
        sink.write_all(&compressed)?;
        sink.flush()?;
        Ok(compressed.len())
    }

    /// Write the transfer file to `path`.
    ///
    /// A partially written file is removed before the error is returned.
    pub async fn write_transfer_file(
        &self,
        measurement_id: i64,
        path: &Path,
        compress_output: bool,
    ) -> Result<usize> {
        let bytes = transfer_bytes(&self.load(measurement_id).await?);
        let path = path.to_path_buf();

        let written =
            tokio::task::spawn_blocking(move || write_file(&path, &bytes, compress_output))
                .await??;
        info!(
            "Wrote transfer file for measurement {} ({} bytes)",
            measurement_id, written
        );
        Ok(written)
    }
}

fn write_file(path: &Path, bytes: &[u8], compress_output: bool) -> Result<usize> {
    let result = (|| -> std::io::Result<usize> {
        let content = if compress_output {
            compress(bytes)?
        } else {
            bytes.to_vec()
        };
        let mut file = std::fs::File::create(path)?;
        file.write_all(&content)?;
        file.sync_all()?;
        Ok(content.len())
    })();

    result.map_err(|source| {
        if let Err(e) = std::fs::remove_file(path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!("Failed to remove partial transfer file {}: {}", path.display(), e);
        }
        Error::TransferFile {
            path: path.to_path_buf(),
            source,
        }
    })
}
