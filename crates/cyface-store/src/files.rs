//! Flat files holding serialized Point3D sensor batches.
//!
//! High-frequency sensor samples are never stored as rows. Each measurement
//! gets one append-only file per sensor type, laid out as
//! `<root>/<type folder>/<measurement id>.<extension>`. The bytes are written
//! by the capture pipeline and copied verbatim into transfer files.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use cyface_types::Point3DType;

use crate::error::{Error, Result};

/// Directory of per-measurement sensor files.
#[derive(Debug, Clone)]
pub struct SensorFiles {
    root: PathBuf,
}

impl SensorFiles {
    /// Sensor files below the given root directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file for one measurement and sensor type.
    pub fn path(&self, measurement_id: i64, sensor: Point3DType) -> PathBuf {
        self.root
            .join(sensor.folder_name())
            .join(format!("{}.{}", measurement_id, sensor.file_extension()))
    }

    /// Append serialized bytes, creating the file and its folder if needed.
    pub fn append(&self, measurement_id: i64, sensor: Point3DType, bytes: &[u8]) -> Result<()> {
        let path = self.path(measurement_id, sensor);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(bytes)?;
        file.flush()?;
        debug!("Appended {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    /// Whether a file exists for this measurement and sensor type.
    pub fn exists(&self, measurement_id: i64, sensor: Point3DType) -> bool {
        self.path(measurement_id, sensor).is_file()
    }

    /// Read the whole file, `None` when nothing was captured.
    pub fn read(&self, measurement_id: i64, sensor: Point3DType) -> Result<Option<Vec<u8>>> {
        let path = self.path(measurement_id, sensor);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete all sensor files of a measurement.
    pub fn delete(&self, measurement_id: i64) -> Result<()> {
        for sensor in Point3DType::ALL {
            let path = self.path(measurement_id, sensor);
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
