//! One-shot reader for the legacy secondary database.
//!
//! Older releases captured altitude and vertical accuracy into a separate
//! database file. Its rows are imported once while upgrading to schema
//! version 12 and the file is removed afterwards. Nothing outside the
//! migration step holds on to this adapter.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info, warn};

use cyface_types::{GeoLocation, Pressure};

use crate::error::Result;

/// Read-only handle on a legacy database file.
pub(crate) struct LegacyDatabase {
    conn: Connection,
    path: PathBuf,
}

impl LegacyDatabase {
    /// Open the legacy file if it exists.
    pub(crate) fn open(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            debug!("No legacy database at {}", path.display());
            return Ok(None);
        }

        info!("Opening legacy database at {}", path.display());
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Some(Self {
            conn,
            path: path.to_path_buf(),
        }))
    }

    /// Measurements that have at least one legacy location.
    pub(crate) fn measurement_ids(&self) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT measurementId FROM Location ORDER BY measurementId")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    /// All legacy locations of a measurement in capture order.
    pub(crate) fn locations(&self, measurement_id: i64) -> Result<Vec<GeoLocation>> {
        let mut stmt = self.conn.prepare(
            "SELECT timestamp, lat, lon, altitude, speed, accuracy, verticalAccuracy
             FROM Location WHERE measurementId = ? ORDER BY timestamp, uid",
        )?;
        let locations = stmt
            .query_map([measurement_id], |row| {
                Ok(GeoLocation {
                    timestamp: row.get(0)?,
                    latitude: row.get(1)?,
                    longitude: row.get(2)?,
                    altitude: row.get(3)?,
                    speed: row.get(4)?,
                    accuracy: row.get(5)?,
                    vertical_accuracy: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(locations)
    }

    /// All legacy pressures of a measurement in capture order.
    ///
    /// Files written before pressure capture existed lack the table.
    pub(crate) fn pressures(&self, measurement_id: i64) -> Result<Vec<Pressure>> {
        if !self.has_table("Pressure")? {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(
            "SELECT timestamp, pressure FROM Pressure
             WHERE measurementId = ? ORDER BY timestamp, uid",
        )?;
        let pressures = stmt
            .query_map([measurement_id], |row| {
                Ok(Pressure::new(row.get(0)?, row.get(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(pressures)
    }

    fn has_table(&self, name: &str) -> Result<bool> {
        let exists = self.conn.query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name=?",
            [name],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Close the connection, keeping the file.
    pub(crate) fn close(self) -> Result<()> {
        let path = self.path;
        self.conn.close().map_err(|(_, e)| e)?;
        debug!("Closed legacy database at {}", path.display());
        Ok(())
    }
}

/// Remove the legacy file and any journal files next to it.
pub(crate) fn remove_file(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)?;
        info!("Removed legacy database {}", path.display());
    }

    for suffix in ["-journal", "-wal", "-shm"] {
        let mut sibling = path.as_os_str().to_owned();
        sibling.push(suffix);
        let sibling = PathBuf::from(sibling);
        if sibling.exists()
            && let Err(e) = std::fs::remove_file(&sibling)
        {
            warn!("Could not remove {}: {}", sibling.display(), e);
        }
    }

    Ok(())
}
