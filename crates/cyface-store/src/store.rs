//! Main store implementation.

use std::path::Path;
use std::str::FromStr;

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, TransactionBehavior, params};
use tracing::{debug, info, warn};

use cyface_types::{
    AttachmentStatus, Event, GeoLocation, MeasurementStatus, Modality,
    PERSISTENCE_FILE_FORMAT_VERSION, ParseError, Pressure,
};

use crate::error::{Error, Result};
use crate::migrations::MigrationContext;
use crate::models::{Attachment, Measurement, NewAttachment};
use crate::queries::{LocationQuery, MeasurementQuery};
use crate::schema;

const MEASUREMENT_COLUMNS: &str =
    "_id, status, modality, file_format_version, distance, timestamp, files_size";

const ATTACHMENT_COLUMNS: &str = "_id, measurement_fk, timestamp, status, type, \
     file_format_version, size, path, latitude, longitude, location_timestamp";

/// SQLite-based store for captured measurements.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, &MigrationContext::default())
    }

    /// Open or create a database, passing external data to migrations.
    pub fn open_with<P: AsRef<Path>>(path: P, ctx: &MigrationContext) -> Result<Self> {
        let path = path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        info!("Opening database at {}", path.display());
        let mut conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        // Migrations need foreign keys disabled, so enable them afterwards
        schema::initialize(&mut conn, ctx)?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;

        Ok(Self { conn })
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        schema::initialize(&mut conn, &MigrationContext::default())?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        Ok(Self { conn })
    }

    /// Schema version of the open database.
    pub fn schema_version(&self) -> Result<i32> {
        schema::get_schema_version(&self.conn)
    }
}

// Measurement operations
impl Store {
    /// Create a new OPEN measurement.
    ///
    /// Fails with [`Error::MeasurementAlreadyActive`] while another
    /// measurement is OPEN or PAUSED. The check and the insert share one
    /// immediate transaction, so two writers cannot both pass the check.
    pub fn create_measurement(&self, modality: Modality, timestamp: i64) -> Result<Measurement> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;

        let active: Option<i64> = tx
            .query_row(
                "SELECT _id FROM measurements WHERE status IN ('OPEN', 'PAUSED') LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = active {
            return Err(Error::MeasurementAlreadyActive(id));
        }

        tx.execute(
            "INSERT INTO measurements (status, modality, file_format_version, timestamp,
             distance, files_size) VALUES (?1, ?2, ?3, ?4, 0, 0)",
            params![
                MeasurementStatus::Open.as_str(),
                modality.as_str(),
                PERSISTENCE_FILE_FORMAT_VERSION,
                timestamp
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        info!("Created measurement {} ({})", id, modality);
        Ok(Measurement {
            id,
            status: MeasurementStatus::Open,
            modality,
            file_format_version: PERSISTENCE_FILE_FORMAT_VERSION,
            distance: 0.0,
            timestamp,
            files_size: 0,
        })
    }

    /// Get a measurement by ID.
    pub fn get_measurement(&self, measurement_id: i64) -> Result<Option<Measurement>> {
        let measurement = self
            .conn
            .query_row(
                &format!("SELECT {} FROM measurements WHERE _id = ?", MEASUREMENT_COLUMNS),
                [measurement_id],
                measurement_from_row,
            )
            .optional()?;
        Ok(measurement)
    }

    /// Load a measurement that is expected to exist.
    pub fn load_measurement(&self, measurement_id: i64) -> Result<Measurement> {
        self.get_measurement(measurement_id)?
            .ok_or(Error::NoSuchMeasurement(measurement_id))
    }

    /// Query measurements with filters.
    pub fn query_measurements(&self, query: &MeasurementQuery) -> Result<Vec<Measurement>> {
        let sql = query.build_sql();
        let (_, params) = query.build_where();

        debug!("Executing query: {}", sql);

        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let measurements = stmt
            .query_map(params_ref.as_slice(), measurement_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(measurements)
    }

    /// List all measurements, newest first.
    pub fn list_measurements(&self) -> Result<Vec<Measurement>> {
        self.query_measurements(&MeasurementQuery::new())
    }

    /// Measurements currently OPEN or PAUSED.
    pub fn active_measurements(&self) -> Result<Vec<Measurement>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM measurements WHERE status IN ('OPEN', 'PAUSED') ORDER BY _id",
            MEASUREMENT_COLUMNS
        ))?;
        let measurements = stmt
            .query_map([], measurement_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(measurements)
    }

    /// Move a measurement along its lifecycle.
    pub fn update_status(&self, measurement_id: i64, status: MeasurementStatus) -> Result<()> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;

        let current: MeasurementStatus = tx
            .query_row(
                "SELECT status FROM measurements WHERE _id = ?",
                [measurement_id],
                |row| parse_column(row, 0),
            )
            .optional()?
            .ok_or(Error::NoSuchMeasurement(measurement_id))?;

        if !current.can_transition_to(status) {
            return Err(Error::InvalidStatusTransition {
                measurement_id,
                from: current,
                to: status,
            });
        }

        tx.execute(
            "UPDATE measurements SET status = ? WHERE _id = ?",
            params![status.as_str(), measurement_id],
        )?;
        tx.commit()?;

        info!(
            "Measurement {} changed from {} to {}",
            measurement_id, current, status
        );
        Ok(())
    }

    /// Set the status without checking the lifecycle.
    ///
    /// Only meant for recovering measurements left behind by a crashed
    /// capture, whose data is known to be incomplete.
    pub fn force_status(&self, measurement_id: i64, status: MeasurementStatus) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE measurements SET status = ? WHERE _id = ?",
            params![status.as_str(), measurement_id],
        )?;
        if changed == 0 {
            return Err(Error::NoSuchMeasurement(measurement_id));
        }

        warn!("Forced measurement {} to {}", measurement_id, status);
        Ok(())
    }

    /// Replace the stored distance in metres.
    pub fn update_distance(&self, measurement_id: i64, distance: f64) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE measurements SET distance = ? WHERE _id = ?",
            params![distance, measurement_id],
        )?;
        if changed == 0 {
            return Err(Error::NoSuchMeasurement(measurement_id));
        }
        Ok(())
    }

    /// Add to the stored distance in metres.
    pub fn increment_distance(&self, measurement_id: i64, delta: f64) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE measurements SET distance = distance + ? WHERE _id = ?",
            params![delta, measurement_id],
        )?;
        if changed == 0 {
            return Err(Error::NoSuchMeasurement(measurement_id));
        }
        Ok(())
    }

    /// Add to the stored size of attached files.
    pub fn increment_files_size(&self, measurement_id: i64, bytes: u64) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE measurements SET files_size = files_size + ? WHERE _id = ?",
            params![bytes as i64, measurement_id],
        )?;
        if changed == 0 {
            return Err(Error::NoSuchMeasurement(measurement_id));
        }
        Ok(())
    }

    /// Delete a measurement and all of its rows.
    pub fn delete_measurement(&self, measurement_id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM measurements WHERE _id = ?", [measurement_id])?;
        if changed == 0 {
            return Err(Error::NoSuchMeasurement(measurement_id));
        }

        info!("Deleted measurement {}", measurement_id);
        Ok(())
    }
}

// Location operations
impl Store {
    /// Insert one location.
    pub fn insert_location(&self, measurement_id: i64, location: &GeoLocation) -> Result<i64> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO locations (timestamp, latitude, longitude, altitude, speed, accuracy,
             vertical_accuracy, measurement_fk) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        stmt.execute(params![
            location.timestamp,
            location.latitude,
            location.longitude,
            location.altitude,
            location.speed,
            location.accuracy,
            location.vertical_accuracy,
            measurement_id
        ])?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Insert many locations in one transaction.
    pub fn insert_locations(&self, measurement_id: i64, locations: &[GeoLocation]) -> Result<usize> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Deferred)?;
        for location in locations {
            self.insert_location(measurement_id, location)?;
        }
        tx.commit()?;

        debug!(
            "Inserted {} locations for measurement {}",
            locations.len(),
            measurement_id
        );
        Ok(locations.len())
    }

    /// Count the locations of a measurement.
    pub fn count_locations(&self, measurement_id: i64) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM locations WHERE measurement_fk = ?",
            [measurement_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Query locations with filters.
    pub fn query_locations(&self, query: &LocationQuery) -> Result<Vec<GeoLocation>> {
        let sql = query.build_sql();
        let (_, params) = query.build_where();

        debug!("Executing query: {}", sql);

        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let locations = stmt
            .query_map(params_ref.as_slice(), |row| {
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

    /// All locations of a measurement in capture order.
    pub fn load_locations(&self, measurement_id: i64) -> Result<Vec<GeoLocation>> {
        self.query_locations(&LocationQuery::new().measurement(measurement_id))
    }
}

// Pressure and event operations
impl Store {
    /// Insert one pressure reading.
    pub fn insert_pressure(&self, measurement_id: i64, pressure: &Pressure) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO pressures (timestamp, pressure, measurement_fk) VALUES (?1, ?2, ?3)",
            params![pressure.timestamp, pressure.pressure, measurement_id],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// All pressures of a measurement in capture order.
    pub fn load_pressures(&self, measurement_id: i64) -> Result<Vec<Pressure>> {
        let mut stmt = self.conn.prepare(
            "SELECT timestamp, pressure FROM pressures
             WHERE measurement_fk = ? ORDER BY timestamp, _id",
        )?;
        let pressures = stmt
            .query_map([measurement_id], |row| {
                Ok(Pressure::new(row.get(0)?, row.get(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(pressures)
    }

    /// Insert one event.
    pub fn insert_event(&self, measurement_id: i64, event: &Event) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO events (timestamp, type, value, measurement_fk) VALUES (?1, ?2, ?3, ?4)",
            params![
                event.timestamp,
                event.event_type.as_str(),
                event.value,
                measurement_id
            ],
        )?;
        debug!(
            "Recorded {} for measurement {}",
            event.event_type, measurement_id
        );
        Ok(self.conn.last_insert_rowid())
    }

    /// All events of a measurement in chronological order.
    pub fn load_events(&self, measurement_id: i64) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT timestamp, type, value FROM events
             WHERE measurement_fk = ? ORDER BY timestamp, _id",
        )?;
        let events = stmt
            .query_map([measurement_id], |row| {
                Ok(Event {
                    timestamp: row.get(0)?,
                    event_type: parse_column(row, 1)?,
                    value: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(events)
    }
}

// Attachment operations
impl Store {
    /// Insert an attachment and add its size to the measurement.
    pub fn insert_attachment(
        &self,
        measurement_id: i64,
        attachment: &NewAttachment,
    ) -> Result<Attachment> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;

        let (location_timestamp, latitude, longitude) = match attachment.location {
            Some((timestamp, latitude, longitude)) => {
                (Some(timestamp), Some(latitude), Some(longitude))
            }
            None => (None, None, None),
        };

        tx.execute(
            "INSERT INTO attachments (timestamp, status, type, file_format_version, size, path,
             latitude, longitude, location_timestamp, measurement_fk)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                attachment.timestamp,
                AttachmentStatus::Saved.as_str(),
                attachment.file_type.as_str(),
                attachment.file_format_version,
                attachment.size as i64,
                attachment.path,
                latitude,
                longitude,
                location_timestamp,
                measurement_id
            ],
        )?;
        let id = tx.last_insert_rowid();
        self.increment_files_size(measurement_id, attachment.size)?;
        tx.commit()?;

        Ok(Attachment {
            id,
            measurement_id,
            timestamp: attachment.timestamp,
            status: AttachmentStatus::Saved,
            file_type: attachment.file_type,
            file_format_version: attachment.file_format_version,
            size: attachment.size,
            path: attachment.path.clone(),
            latitude,
            longitude,
            location_timestamp,
        })
    }

    /// All attachments of a measurement in capture order.
    pub fn load_attachments(&self, measurement_id: i64) -> Result<Vec<Attachment>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM attachments WHERE measurement_fk = ? ORDER BY timestamp, _id",
            ATTACHMENT_COLUMNS
        ))?;
        let attachments = stmt
            .query_map([measurement_id], |row| {
                Ok(Attachment {
                    id: row.get(0)?,
                    measurement_id: row.get(1)?,
                    timestamp: row.get(2)?,
                    status: parse_column(row, 3)?,
                    file_type: parse_column(row, 4)?,
                    file_format_version: row.get(5)?,
                    size: row.get::<_, i64>(6)? as u64,
                    path: row.get(7)?,
                    latitude: row.get(8)?,
                    longitude: row.get(9)?,
                    location_timestamp: row.get(10)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(attachments)
    }

    /// Change the sync status of an attachment.
    pub fn update_attachment_status(
        &self,
        attachment_id: i64,
        status: AttachmentStatus,
    ) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE attachments SET status = ? WHERE _id = ?",
            params![status.as_str(), attachment_id],
        )?;
        Ok(changed > 0)
    }

    /// Delete one attachment row.
    pub fn delete_attachment(&self, attachment_id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM attachments WHERE _id = ?", [attachment_id])?;
        Ok(changed > 0)
    }
}

// Device identifier
impl Store {
    /// The installation's device identifier, created on first use.
    pub fn device_id_or_create(&self) -> Result<String> {
        let created = self.conn.execute(
            "INSERT OR IGNORE INTO identifiers (_id, device_id) VALUES (1, ?)",
            [uuid::Uuid::new_v4().to_string()],
        )?;
        let device_id = self.load_device_id()?;
        if created > 0 {
            info!("Created device identifier {}", device_id);
        }
        Ok(device_id)
    }

    /// The stored device identifier.
    pub fn load_device_id(&self) -> Result<String> {
        self.conn
            .query_row("SELECT device_id FROM identifiers WHERE _id = 1", [], |row| {
                row.get(0)
            })
            .optional()?
            .ok_or(Error::NoDeviceId)
    }
}

fn measurement_from_row(row: &Row<'_>) -> rusqlite::Result<Measurement> {
    Ok(Measurement {
        id: row.get(0)?,
        status: parse_column(row, 1)?,
        modality: parse_column(row, 2)?,
        file_format_version: row.get(3)?,
        distance: row.get(4)?,
        timestamp: row.get(5)?,
        files_size: row.get::<_, i64>(6)? as u64,
    })
}

/// Read a text tag column into one of the tag enums.
fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = ParseError>,
{
    let tag: String = row.get(idx)?;
    tag.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyface_types::{AttachmentType, EventType};

    fn location(timestamp: i64, longitude: f64) -> GeoLocation {
        GeoLocation::new(timestamp, 0.0, longitude, 5.0).with_accuracy(4.0)
    }

    #[test]
    fn test_open_in_memory() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.list_measurements().unwrap().is_empty());
        assert_eq!(store.schema_version().unwrap(), schema::SCHEMA_VERSION);
    }

    #[test]
    fn test_open_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("measures.db");

        let store = Store::open(&path).unwrap();
        store.create_measurement(Modality::Car, 1_000).unwrap();
        drop(store);

        let store = Store::open(&path).unwrap();
        assert_eq!(store.list_measurements().unwrap().len(), 1);
    }

    #[test]
    fn test_open_upgrades_first_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("measures.db");
        {
            let conn = Connection::open(&path).unwrap();
            crate::migrations::create_schema_v1(&conn).unwrap();
            conn.execute_batch(
                "INSERT INTO measurements (_id, finished, vehicle) VALUES (1, 1, 'CAR');
                 INSERT INTO gps_points (gps_time, lat, lon, speed, accuracy, measurement_fk)
                    VALUES (1000, 0.0, 0.0, 1.0, 200, 1), (1001, 0.0, 0.001, 1.0, 200, 1);",
            )
            .unwrap();
        }

        let ctx = MigrationContext {
            legacy_database: None,
            preferences_device_id: Some("device-from-preferences".to_string()),
        };
        let store = Store::open_with(&path, &ctx).unwrap();
        assert_eq!(store.schema_version().unwrap(), schema::SCHEMA_VERSION);

        // Unsynced data in the first file format cannot be uploaded anymore
        let m = store.load_measurement(1).unwrap();
        assert_eq!(m.status, MeasurementStatus::Deprecated);
        assert_eq!(m.modality, Modality::Car);
        assert_eq!(m.timestamp, 1000);
        assert!((m.distance - 111.19).abs() < 0.01);

        let locations = store.load_locations(1).unwrap();
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].accuracy, Some(2.0));
        assert_eq!(store.load_device_id().unwrap(), "device-from-preferences");

        // Foreign keys are enforced after the upgrade
        assert!(store.insert_location(42, &location(1, 0.0)).is_err());
    }

    #[test]
    fn test_create_and_load_measurement() {
        let store = Store::open_in_memory().unwrap();

        let created = store.create_measurement(Modality::Bicycle, 1_000).unwrap();
        assert_eq!(created.status, MeasurementStatus::Open);
        assert_eq!(created.file_format_version, PERSISTENCE_FILE_FORMAT_VERSION);

        let loaded = store.load_measurement(created.id).unwrap();
        assert_eq!(loaded, created);
    }

    #[test]
    fn test_load_missing_measurement() {
        let store = Store::open_in_memory().unwrap();
        assert!(matches!(
            store.load_measurement(42),
            Err(Error::NoSuchMeasurement(42))
        ));
    }

    #[test]
    fn test_single_active_measurement() {
        let store = Store::open_in_memory().unwrap();
        let first = store.create_measurement(Modality::Car, 1_000).unwrap();

        let err = store.create_measurement(Modality::Car, 2_000).unwrap_err();
        assert!(matches!(err, Error::MeasurementAlreadyActive(id) if id == first.id));

        // Still rejected while paused
        store
            .update_status(first.id, MeasurementStatus::Paused)
            .unwrap();
        assert!(store.create_measurement(Modality::Car, 3_000).is_err());
        assert_eq!(store.list_measurements().unwrap().len(), 1);

        store
            .update_status(first.id, MeasurementStatus::Finished)
            .unwrap();
        let second = store.create_measurement(Modality::Walking, 4_000).unwrap();
        assert_ne!(second.id, first.id);
    }

    #[test]
    fn test_status_transitions_validated() {
        let store = Store::open_in_memory().unwrap();
        let m = store.create_measurement(Modality::Car, 1_000).unwrap();

        let err = store
            .update_status(m.id, MeasurementStatus::Synced)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidStatusTransition {
                from: MeasurementStatus::Open,
                to: MeasurementStatus::Synced,
                ..
            }
        ));

        store.update_status(m.id, MeasurementStatus::Paused).unwrap();
        store.update_status(m.id, MeasurementStatus::Open).unwrap();
        store
            .update_status(m.id, MeasurementStatus::Finished)
            .unwrap();
        store.update_status(m.id, MeasurementStatus::Synced).unwrap();
        assert!(store.update_status(m.id, MeasurementStatus::Open).is_err());
        assert!(matches!(
            store.update_status(99, MeasurementStatus::Finished),
            Err(Error::NoSuchMeasurement(99))
        ));
    }

    #[test]
    fn test_force_status_bypasses_validation() {
        let store = Store::open_in_memory().unwrap();
        let m = store.create_measurement(Modality::Car, 1_000).unwrap();

        store
            .force_status(m.id, MeasurementStatus::Finished)
            .unwrap();
        assert!(store.active_measurements().unwrap().is_empty());
        assert!(store.force_status(99, MeasurementStatus::Finished).is_err());
    }

    #[test]
    fn test_query_measurements_by_status() {
        let store = Store::open_in_memory().unwrap();
        let a = store.create_measurement(Modality::Car, 1_000).unwrap();
        store.update_status(a.id, MeasurementStatus::Finished).unwrap();
        let b = store.create_measurement(Modality::Car, 2_000).unwrap();

        let finished = store
            .query_measurements(&MeasurementQuery::new().status(MeasurementStatus::Finished))
            .unwrap();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].id, a.id);

        let all = store.list_measurements().unwrap();
        assert_eq!(all[0].id, b.id);

        let active = store.active_measurements().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, b.id);
    }

    #[test]
    fn test_distance_and_files_size() {
        let store = Store::open_in_memory().unwrap();
        let m = store.create_measurement(Modality::Car, 1_000).unwrap();

        store.increment_distance(m.id, 10.5).unwrap();
        store.increment_distance(m.id, 4.5).unwrap();
        assert_eq!(store.load_measurement(m.id).unwrap().distance, 15.0);

        store.update_distance(m.id, 3.0).unwrap();
        assert_eq!(store.load_measurement(m.id).unwrap().distance, 3.0);

        store.increment_files_size(m.id, 100).unwrap();
        assert_eq!(store.load_measurement(m.id).unwrap().files_size, 100);
        assert!(store.increment_distance(99, 1.0).is_err());
    }

    #[test]
    fn test_locations_ordered_and_paged() {
        let store = Store::open_in_memory().unwrap();
        let m = store.create_measurement(Modality::Car, 1_000).unwrap();

        // Inserted out of order
        store
            .insert_locations(m.id, &[location(3, 0.003), location(1, 0.001), location(2, 0.002)])
            .unwrap();
        assert_eq!(store.count_locations(m.id).unwrap(), 3);

        let all = store.load_locations(m.id).unwrap();
        let timestamps: Vec<i64> = all.iter().map(|l| l.timestamp).collect();
        assert_eq!(timestamps, vec![1, 2, 3]);
        assert_eq!(all[0].accuracy, Some(4.0));

        let page = store
            .query_locations(&LocationQuery::new().measurement(m.id).limit(2).offset(2))
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].timestamp, 3);

        let newest = store
            .query_locations(&LocationQuery::new().measurement(m.id).newest_first().limit(1))
            .unwrap();
        assert_eq!(newest.len(), 1);
        assert_eq!(newest[0].timestamp, 3);
    }

    #[test]
    fn test_pressures_and_events() {
        let store = Store::open_in_memory().unwrap();
        let m = store.create_measurement(Modality::Car, 1_000).unwrap();

        store.insert_pressure(m.id, &Pressure::new(2, 1012.0)).unwrap();
        store.insert_pressure(m.id, &Pressure::new(1, 1013.0)).unwrap();
        let pressures = store.load_pressures(m.id).unwrap();
        assert_eq!(pressures[0], Pressure::new(1, 1013.0));

        store
            .insert_event(m.id, &Event::new(1, EventType::LifecycleStart))
            .unwrap();
        store
            .insert_event(
                m.id,
                &Event::new(5, EventType::ModalityTypeChange).with_value("BUS"),
            )
            .unwrap();
        let events = store.load_events(m.id).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].event_type, EventType::ModalityTypeChange);
        assert_eq!(events[1].value.as_deref(), Some("BUS"));
    }

    #[test]
    fn test_delete_cascades() {
        let store = Store::open_in_memory().unwrap();
        let m = store.create_measurement(Modality::Car, 1_000).unwrap();
        store.insert_location(m.id, &location(1, 0.0)).unwrap();
        store.insert_pressure(m.id, &Pressure::new(1, 1013.0)).unwrap();
        store
            .insert_event(m.id, &Event::new(1, EventType::LifecycleStart))
            .unwrap();

        store.delete_measurement(m.id).unwrap();

        assert_eq!(store.count_locations(m.id).unwrap(), 0);
        assert!(store.load_pressures(m.id).unwrap().is_empty());
        assert!(store.load_events(m.id).unwrap().is_empty());
        assert!(matches!(
            store.delete_measurement(m.id),
            Err(Error::NoSuchMeasurement(_))
        ));
    }

    #[test]
    fn test_child_rows_require_measurement() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.insert_location(42, &location(1, 0.0)).is_err());
    }

    #[test]
    fn test_attachments() {
        let store = Store::open_in_memory().unwrap();
        let m = store.create_measurement(Modality::Car, 1_000).unwrap();

        let attachment = store
            .insert_attachment(
                m.id,
                &NewAttachment {
                    timestamp: 1_500,
                    file_type: AttachmentType::Jpg,
                    file_format_version: 1,
                    size: 2_048,
                    path: "/pictures/1.jpg".to_string(),
                    location: Some((1_400, 51.05, 13.73)),
                },
            )
            .unwrap();
        assert_eq!(attachment.status, AttachmentStatus::Saved);
        assert_eq!(store.load_measurement(m.id).unwrap().files_size, 2_048);

        assert!(
            store
                .update_attachment_status(attachment.id, AttachmentStatus::Synced)
                .unwrap()
        );
        let loaded = store.load_attachments(m.id).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].status, AttachmentStatus::Synced);
        assert_eq!(loaded[0].location_timestamp, Some(1_400));

        assert!(store.delete_attachment(attachment.id).unwrap());
        assert!(!store.delete_attachment(attachment.id).unwrap());
    }

    #[test]
    fn test_device_id() {
        let store = Store::open_in_memory().unwrap();
        assert!(matches!(store.load_device_id(), Err(Error::NoDeviceId)));

        let first = store.device_id_or_create().unwrap();
        assert_eq!(first.len(), 36);
        assert_eq!(store.device_id_or_create().unwrap(), first);
        assert_eq!(store.load_device_id().unwrap(), first);
    }

    #[test]
    fn test_corrupted_tag_is_reported() {
        let store = Store::open_in_memory().unwrap();
        store
            .conn
            .execute(
                "INSERT INTO measurements (status, modality, file_format_version, timestamp)
                 VALUES ('BROKEN', 'CAR', 3, 1)",
                [],
            )
            .unwrap();
        assert!(store.list_measurements().is_err());
    }
}
