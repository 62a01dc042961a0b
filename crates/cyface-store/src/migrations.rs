//! Forward-only schema migrations.
//!
//! Every adjacent version pair from 1 up to [`SCHEMA_VERSION`] has exactly one
//! registered [`Migration`]. The registry is checked for gaps the first time
//! it is used, so a missing step panics instead of leaving a database behind
//! at an unknown version.
//!
//! Each step runs in its own transaction together with the version bump. A
//! failing step rolls back completely and the database stays at the last
//! version that committed.
//!
//! [`SCHEMA_VERSION`]: crate::schema::SCHEMA_VERSION

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::LazyLock;

use rusqlite::{Connection, params};
use tracing::{debug, info, warn};

use cyface_types::haversine_distance;

use crate::error::{Error, Result};
use crate::legacy::{self, LegacyDatabase};
use crate::schema::{self, SCHEMA_VERSION};

/// Data from outside the database that some migration steps consume.
#[derive(Debug, Clone, Default)]
pub struct MigrationContext {
    /// Location of the legacy secondary database, imported while upgrading
    /// to version 12 and deleted afterwards.
    pub legacy_database: Option<PathBuf>,
    /// Device identifier kept in application preferences by old releases,
    /// promoted into the `identifiers` table while upgrading to version 4.
    pub preferences_device_id: Option<String>,
}

type ApplyFn = fn(&Connection, &MigrationContext) -> Result<()>;
type AfterCommitFn = fn(&MigrationContext) -> Result<()>;

/// A single schema upgrade step.
pub struct Migration {
    pub from: i32,
    pub to: i32,
    pub description: &'static str,
    apply: ApplyFn,
    /// Runs once the step has committed, for side effects outside the
    /// database that must not happen if the step rolls back.
    after_commit: Option<AfterCommitFn>,
}

impl Migration {
    fn new(from: i32, to: i32, description: &'static str, apply: ApplyFn) -> Self {
        Self {
            from,
            to,
            description,
            apply,
            after_commit: None,
        }
    }

    fn then(mut self, after_commit: AfterCommitFn) -> Self {
        self.after_commit = Some(after_commit);
        self
    }
}

static REGISTRY: LazyLock<BTreeMap<(i32, i32), Migration>> = LazyLock::new(|| {
    let registry = build_registry();
    assert_complete(&registry, 1, SCHEMA_VERSION);
    registry
});

fn build_registry() -> BTreeMap<(i32, i32), Migration> {
    [
        Migration::new(1, 2, "measurement sync flag", add_synced_flag),
        Migration::new(2, 3, "events table", create_events),
        Migration::new(3, 4, "identifiers table", create_identifiers),
        Migration::new(4, 5, "measurement file format version", add_file_format_version),
        Migration::new(5, 6, "pressures table", create_pressures),
        Migration::new(6, 7, "event values", add_event_value),
        Migration::new(7, 8, "measurement timestamp", add_measurement_timestamp),
        Migration::new(8, 9, "measurement status and modality", rebuild_measurements),
        Migration::new(9, 10, "measurement distance", add_distance),
        Migration::new(10, 11, "gps points to locations", rebuild_locations),
        Migration::new(11, 12, "location altitude and legacy import", import_legacy_database)
            .then(remove_legacy_database),
        Migration::new(12, 13, "attachments table", create_attachments),
        Migration::new(13, 14, "measurement files size", add_files_size),
        Migration::new(14, 15, "attachment locations", add_attachment_location),
        Migration::new(15, 16, "cascading foreign keys", add_foreign_keys),
        Migration::new(16, 17, "single identifier row", rebuild_identifiers),
        Migration::new(17, 18, "deprecate old formats", deprecate_old_formats),
        Migration::new(18, 19, "modality change events", rename_vehicle_events),
    ]
    .into_iter()
    .map(|m| ((m.from, m.to), m))
    .collect()
}

/// Panic unless every step `first -> first + 1` up to `last` is registered.
fn assert_complete(registry: &BTreeMap<(i32, i32), Migration>, first: i32, last: i32) {
    for version in first..last {
        assert!(
            registry.contains_key(&(version, version + 1)),
            "no migration registered for schema version {} -> {}",
            version,
            version + 1
        );
    }
}

/// Upgrade the database from `from` to `to`, one committed step at a time.
pub(crate) fn migrate(
    conn: &mut Connection,
    from: i32,
    to: i32,
    ctx: &MigrationContext,
) -> Result<()> {
    info!("Migrating database schema from {} to {}", from, to);

    // The pragma is a no-op inside a transaction
    let enforced: bool = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
    conn.execute_batch("PRAGMA foreign_keys = OFF")?;

    let result = run_steps(conn, from, to, ctx);

    if enforced {
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
    }
    result
}

fn run_steps(conn: &mut Connection, from: i32, to: i32, ctx: &MigrationContext) -> Result<()> {
    for version in from..to {
        let migration = REGISTRY
            .get(&(version, version + 1))
            .ok_or_else(|| Error::Migration {
                from: version,
                to: version + 1,
                message: "no migration registered".to_string(),
            })?;

        info!(
            "Applying migration {} -> {}: {}",
            migration.from, migration.to, migration.description
        );

        let step_error = |e: Error| Error::Migration {
            from: migration.from,
            to: migration.to,
            message: e.to_string(),
        };

        let tx = conn.transaction()?;
        (migration.apply)(&tx, ctx).map_err(step_error)?;
        check_foreign_keys(&tx, migration)?;
        schema::set_schema_version(&tx, migration.to)?;
        tx.commit()?;

        if let Some(after_commit) = migration.after_commit {
            after_commit(ctx).map_err(step_error)?;
        }
    }

    Ok(())
}

fn check_foreign_keys(conn: &Connection, migration: &Migration) -> Result<()> {
    let mut stmt = conn.prepare("PRAGMA foreign_key_check")?;
    let violations = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if let Some(table) = violations.first() {
        return Err(Error::Migration {
            from: migration.from,
            to: migration.to,
            message: format!(
                "{} foreign key violations, first in table {}",
                violations.len(),
                table
            ),
        });
    }
    Ok(())
}

// === Steps ===

fn add_synced_flag(conn: &Connection, _: &MigrationContext) -> Result<()> {
    conn.execute_batch("ALTER TABLE measurements ADD COLUMN synced INTEGER NOT NULL DEFAULT 0")?;
    Ok(())
}

fn create_events(conn: &Connection, _: &MigrationContext) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE events (
            _id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp INTEGER NOT NULL,
            type TEXT NOT NULL,
            measurement_fk INTEGER NOT NULL
        )",
    )?;
    Ok(())
}

fn create_identifiers(conn: &Connection, ctx: &MigrationContext) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE identifiers (
            _id INTEGER PRIMARY KEY AUTOINCREMENT,
            device_id TEXT NOT NULL
        )",
    )?;

    match ctx.preferences_device_id.as_deref() {
        Some(device_id) if !device_id.is_empty() => {
            conn.execute("INSERT INTO identifiers (device_id) VALUES (?)", [device_id])?;
            info!("Promoted device identifier from preferences");
        }
        _ => debug!("No device identifier in preferences"),
    }
    Ok(())
}

fn add_file_format_version(conn: &Connection, _: &MigrationContext) -> Result<()> {
    conn.execute_batch(
        "ALTER TABLE measurements ADD COLUMN file_format_version INTEGER NOT NULL DEFAULT 1",
    )?;
    Ok(())
}

fn create_pressures(conn: &Connection, _: &MigrationContext) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE pressures (
            _id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp INTEGER NOT NULL,
            pressure REAL NOT NULL,
            measurement_fk INTEGER NOT NULL
        )",
    )?;
    Ok(())
}

fn add_event_value(conn: &Connection, _: &MigrationContext) -> Result<()> {
    conn.execute_batch("ALTER TABLE events ADD COLUMN value TEXT")?;
    Ok(())
}

fn add_measurement_timestamp(conn: &Connection, _: &MigrationContext) -> Result<()> {
    conn.execute_batch(
        "ALTER TABLE measurements ADD COLUMN timestamp INTEGER NOT NULL DEFAULT 0;
         UPDATE measurements SET timestamp = COALESCE(
            (SELECT MIN(gps_time) FROM gps_points WHERE measurement_fk = measurements._id),
            0
         );",
    )?;
    Ok(())
}

fn rebuild_measurements(conn: &Connection, _: &MigrationContext) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE measurements_new (
            _id INTEGER PRIMARY KEY AUTOINCREMENT,
            status TEXT NOT NULL,
            modality TEXT NOT NULL,
            file_format_version INTEGER NOT NULL,
            timestamp INTEGER NOT NULL
         );
         INSERT INTO measurements_new (_id, status, modality, file_format_version, timestamp)
            SELECT _id,
                   CASE WHEN synced = 1 THEN 'SYNCED'
                        WHEN finished = 1 THEN 'FINISHED'
                        ELSE 'OPEN' END,
                   CASE WHEN vehicle IN ('CAR', 'BICYCLE', 'WALKING', 'BUS', 'TRAIN', 'MOTORBIKE')
                        THEN vehicle ELSE 'UNKNOWN' END,
                   file_format_version,
                   timestamp
            FROM measurements;
         DROP TABLE measurements;
         ALTER TABLE measurements_new RENAME TO measurements;",
    )?;
    Ok(())
}

fn add_distance(conn: &Connection, _: &MigrationContext) -> Result<()> {
    conn.execute_batch("ALTER TABLE measurements ADD COLUMN distance REAL NOT NULL DEFAULT 0")?;

    let ids = conn
        .prepare("SELECT _id FROM measurements")?
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<i64>, _>>()?;

    let mut points = conn.prepare(
        "SELECT lat, lon FROM gps_points WHERE measurement_fk = ? ORDER BY gps_time, _id",
    )?;
    let mut update = conn.prepare("UPDATE measurements SET distance = ? WHERE _id = ?")?;

    for id in ids {
        let coordinates = points
            .query_map([id], |row| Ok((row.get::<_, f64>(0)?, row.get::<_, f64>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let distance: f64 = coordinates
            .windows(2)
            .map(|pair| haversine_distance(pair[0].0, pair[0].1, pair[1].0, pair[1].1))
            .sum();

        update.execute(params![distance, id])?;
        debug!("Backfilled distance {:.2} m for measurement {}", distance, id);
    }
    Ok(())
}

fn rebuild_locations(conn: &Connection, _: &MigrationContext) -> Result<()> {
    // Accuracy was stored in centimetres as an integer
    conn.execute_batch(
        "CREATE TABLE locations (
            _id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp INTEGER NOT NULL,
            latitude REAL NOT NULL,
            longitude REAL NOT NULL,
            speed REAL NOT NULL,
            accuracy REAL,
            measurement_fk INTEGER NOT NULL
         );
         INSERT INTO locations (_id, timestamp, latitude, longitude, speed, accuracy, measurement_fk)
            SELECT _id, gps_time, lat, lon, speed, accuracy / 100.0, measurement_fk
            FROM gps_points;
         DROP TABLE gps_points;",
    )?;
    Ok(())
}

fn import_legacy_database(conn: &Connection, ctx: &MigrationContext) -> Result<()> {
    conn.execute_batch(
        "ALTER TABLE locations ADD COLUMN altitude REAL;
         ALTER TABLE locations ADD COLUMN vertical_accuracy REAL;",
    )?;

    let Some(path) = ctx.legacy_database.as_deref() else {
        return Ok(());
    };
    let Some(legacy) = LegacyDatabase::open(path)? else {
        return Ok(());
    };

    let mut imported_locations = 0usize;
    let mut imported_pressures = 0usize;
    for measurement_id in legacy.measurement_ids()? {
        let known: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM measurements WHERE _id = ?",
            [measurement_id],
            |row| row.get(0),
        )?;
        if !known {
            warn!(
                "Skipping legacy data of unknown measurement {}",
                measurement_id
            );
            continue;
        }

        // Legacy rows carry altitude and replace what the primary database has
        conn.execute(
            "DELETE FROM locations WHERE measurement_fk = ?",
            [measurement_id],
        )?;
        let mut insert = conn.prepare_cached(
            "INSERT INTO locations (timestamp, latitude, longitude, altitude, speed, accuracy,
             vertical_accuracy, measurement_fk) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for l in legacy.locations(measurement_id)? {
            insert.execute(params![
                l.timestamp,
                l.latitude,
                l.longitude,
                l.altitude,
                l.speed,
                l.accuracy,
                l.vertical_accuracy,
                measurement_id
            ])?;
            imported_locations += 1;
        }

        let pressures = legacy.pressures(measurement_id)?;
        if !pressures.is_empty() {
            conn.execute(
                "DELETE FROM pressures WHERE measurement_fk = ?",
                [measurement_id],
            )?;
            let mut insert = conn.prepare_cached(
                "INSERT INTO pressures (timestamp, pressure, measurement_fk) VALUES (?1, ?2, ?3)",
            )?;
            for p in pressures {
                insert.execute(params![p.timestamp, p.pressure, measurement_id])?;
                imported_pressures += 1;
            }
        }
    }

    legacy.close()?;
    info!(
        "Imported {} locations and {} pressures from legacy database",
        imported_locations, imported_pressures
    );
    Ok(())
}

fn remove_legacy_database(ctx: &MigrationContext) -> Result<()> {
    match ctx.legacy_database.as_deref() {
        Some(path) => legacy::remove_file(path),
        None => Ok(()),
    }
}

fn create_attachments(conn: &Connection, _: &MigrationContext) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE attachments (
            _id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp INTEGER NOT NULL,
            status TEXT NOT NULL,
            type TEXT NOT NULL,
            file_format_version INTEGER NOT NULL,
            size INTEGER NOT NULL,
            path TEXT NOT NULL,
            measurement_fk INTEGER NOT NULL
        )",
    )?;
    Ok(())
}

fn add_files_size(conn: &Connection, _: &MigrationContext) -> Result<()> {
    conn.execute_batch(
        "ALTER TABLE measurements ADD COLUMN files_size INTEGER NOT NULL DEFAULT 0;
         UPDATE measurements SET files_size = COALESCE(
            (SELECT SUM(size) FROM attachments WHERE measurement_fk = measurements._id),
            0
         );",
    )?;
    Ok(())
}

fn add_attachment_location(conn: &Connection, _: &MigrationContext) -> Result<()> {
    conn.execute_batch(
        "ALTER TABLE attachments ADD COLUMN latitude REAL;
         ALTER TABLE attachments ADD COLUMN longitude REAL;
         ALTER TABLE attachments ADD COLUMN location_timestamp INTEGER;",
    )?;
    Ok(())
}

/// Column definitions and names of the child tables once they reference
/// `measurements` with cascading deletes.
const CHILD_TABLES: [(&str, &str, &str); 4] = [
    (
        "locations",
        "timestamp INTEGER NOT NULL,
         latitude REAL NOT NULL,
         longitude REAL NOT NULL,
         altitude REAL,
         speed REAL NOT NULL,
         accuracy REAL,
         vertical_accuracy REAL,",
        "timestamp, latitude, longitude, altitude, speed, accuracy, vertical_accuracy",
    ),
    (
        "pressures",
        "timestamp INTEGER NOT NULL,
         pressure REAL NOT NULL,",
        "timestamp, pressure",
    ),
    (
        "events",
        "timestamp INTEGER NOT NULL,
         type TEXT NOT NULL,
         value TEXT,",
        "timestamp, type, value",
    ),
    (
        "attachments",
        "timestamp INTEGER NOT NULL,
         status TEXT NOT NULL,
         type TEXT NOT NULL,
         file_format_version INTEGER NOT NULL,
         size INTEGER NOT NULL,
         path TEXT NOT NULL,
         latitude REAL,
         longitude REAL,
         location_timestamp INTEGER,",
        "timestamp, status, type, file_format_version, size, path, latitude, longitude, \
         location_timestamp",
    ),
];

fn add_foreign_keys(conn: &Connection, _: &MigrationContext) -> Result<()> {
    for (table, definitions, columns) in CHILD_TABLES {
        // Rows of deleted measurements were never cleaned up before
        let orphans = conn.execute(
            &format!(
                "DELETE FROM {table} WHERE measurement_fk NOT IN (SELECT _id FROM measurements)"
            ),
            [],
        )?;
        if orphans > 0 {
            warn!("Dropped {} orphaned rows from {}", orphans, table);
        }

        conn.execute_batch(&format!(
            "CREATE TABLE {table}_new (
                _id INTEGER PRIMARY KEY AUTOINCREMENT,
                {definitions}
                measurement_fk INTEGER NOT NULL
                    REFERENCES measurements(_id) ON DELETE CASCADE
             );
             INSERT INTO {table}_new (_id, {columns}, measurement_fk)
                SELECT _id, {columns}, measurement_fk FROM {table};
             DROP TABLE {table};
             ALTER TABLE {table}_new RENAME TO {table};
             CREATE INDEX index_{table}_measurement_fk ON {table}(measurement_fk);"
        ))?;
    }
    Ok(())
}

fn rebuild_identifiers(conn: &Connection, _: &MigrationContext) -> Result<()> {
    let rows: i64 = conn.query_row("SELECT COUNT(*) FROM identifiers", [], |row| row.get(0))?;
    if rows > 1 {
        warn!("Keeping the first of {} device identifiers", rows);
    }

    conn.execute_batch(
        "CREATE TABLE identifiers_new (
            _id INTEGER PRIMARY KEY CHECK (_id = 1),
            device_id TEXT NOT NULL
         );
         INSERT INTO identifiers_new (_id, device_id)
            SELECT 1, device_id FROM identifiers ORDER BY _id LIMIT 1;
         DROP TABLE identifiers;
         ALTER TABLE identifiers_new RENAME TO identifiers;",
    )?;
    Ok(())
}

fn deprecate_old_formats(conn: &Connection, _: &MigrationContext) -> Result<()> {
    let deprecated = conn.execute(
        "UPDATE measurements SET status = 'DEPRECATED'
         WHERE file_format_version < 3 AND status NOT IN ('SYNCED', 'SKIPPED')",
        [],
    )?;
    if deprecated > 0 {
        info!("Deprecated {} measurements in old file formats", deprecated);
    }
    Ok(())
}

fn rename_vehicle_events(conn: &Connection, _: &MigrationContext) -> Result<()> {
    conn.execute(
        "UPDATE events SET type = 'MODALITY_TYPE_CHANGE' WHERE type = 'VEHICLE_TYPE_CHANGE'",
        [],
    )?;
    Ok(())
}

/// Create the very first schema release, used to test upgrade paths.
#[cfg(test)]
pub(crate) fn create_schema_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL
         );
         CREATE TABLE measurements (
            _id INTEGER PRIMARY KEY AUTOINCREMENT,
            finished INTEGER NOT NULL DEFAULT 0,
            vehicle TEXT
         );
         CREATE TABLE gps_points (
            _id INTEGER PRIMARY KEY AUTOINCREMENT,
            gps_time INTEGER NOT NULL,
            lat REAL NOT NULL,
            lon REAL NOT NULL,
            speed REAL NOT NULL,
            accuracy INTEGER NOT NULL,
            is_synced INTEGER NOT NULL DEFAULT 0,
            measurement_fk INTEGER NOT NULL
         );",
    )?;
    schema::set_schema_version(conn, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legacy::tests::create_legacy_file;
    use cyface_types::GeoLocation;

    /// Two legs of 0.001 degrees of longitude on the equator.
    const TWO_LEGS_METERS: f64 = 222.389_853_289_117_5;

    fn database_at(version: i32, ctx: &MigrationContext) -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        create_schema_v1(&conn).unwrap();
        migrate(&mut conn, 1, version, ctx).unwrap();
        conn
    }

    fn columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut names = conn
            .prepare(&format!("PRAGMA table_info({})", table))
            .unwrap()
            .query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        names.sort();
        names
    }

    fn schema_objects(conn: &Connection) -> Vec<String> {
        conn.prepare(
            "SELECT type || ':' || name FROM sqlite_master
             WHERE name NOT LIKE 'sqlite_%' ORDER BY type, name",
        )
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<std::result::Result<Vec<_>, _>>()
        .unwrap()
    }

    fn count(conn: &Connection, sql: &str) -> i64 {
        conn.query_row(sql, [], |row| row.get(0)).unwrap()
    }

    fn seed_v8(conn: &Connection) {
        conn.execute_batch(
            "INSERT INTO measurements (_id, finished, vehicle, synced, file_format_version, timestamp)
                VALUES (1, 1, 'BICYCLE', 1, 1, 1000),
                       (2, 1, 'CAR', 0, 1, 2000),
                       (3, 0, NULL, 0, 1, 3000);
             INSERT INTO gps_points (gps_time, lat, lon, speed, accuracy, measurement_fk)
                VALUES (1000, 0.0, 0.000, 1.0, 500, 1),
                       (1001, 0.0, 0.001, 1.0, 500, 1),
                       (1002, 0.0, 0.002, 1.0, 500, 1),
                       (2000, 51.0, 13.0, 2.0, 1250, 2),
                       (3000, 51.0, 13.0, 2.0, 300, 3);
             INSERT INTO events (timestamp, type, value, measurement_fk)
                VALUES (1000, 'LIFECYCLE_START', NULL, 1),
                       (1002, 'LIFECYCLE_STOP', NULL, 1);",
        )
        .unwrap();
    }

    #[test]
    fn test_registry_is_complete() {
        assert_complete(&REGISTRY, 1, SCHEMA_VERSION);
        assert_eq!(REGISTRY.len(), (SCHEMA_VERSION - 1) as usize);
        for ((from, to), migration) in REGISTRY.iter() {
            assert_eq!((migration.from, migration.to), (*from, *to));
            assert_eq!(*to, *from + 1);
        }
    }

    #[test]
    #[should_panic(expected = "no migration registered for schema version 9 -> 10")]
    fn test_registry_gap_panics() {
        let mut registry = build_registry();
        registry.remove(&(9, 10));
        assert_complete(&registry, 1, SCHEMA_VERSION);
    }

    #[test]
    fn test_migrated_schema_matches_fresh_schema() {
        let ctx = MigrationContext::default();
        let migrated = database_at(SCHEMA_VERSION, &ctx);

        let mut fresh = Connection::open_in_memory().unwrap();
        schema::initialize(&mut fresh, &ctx).unwrap();

        assert_eq!(schema_objects(&migrated), schema_objects(&fresh));
        for table in [
            "measurements",
            "identifiers",
            "locations",
            "pressures",
            "events",
            "attachments",
        ] {
            assert_eq!(columns(&migrated, table), columns(&fresh, table), "{}", table);
        }
        assert_eq!(
            schema::get_schema_version(&migrated).unwrap(),
            SCHEMA_VERSION
        );
    }

    #[test]
    fn test_migrate_8_to_12_preserves_rows() {
        let ctx = MigrationContext::default();
        let mut conn = database_at(8, &ctx);
        seed_v8(&conn);

        migrate(&mut conn, 8, 12, &ctx).unwrap();
        assert_eq!(schema::get_schema_version(&conn).unwrap(), 12);

        assert_eq!(count(&conn, "SELECT COUNT(*) FROM measurements"), 3);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM locations"), 5);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM events"), 2);

        let mapped: Vec<(i64, String, String)> = conn
            .prepare("SELECT _id, status, modality FROM measurements ORDER BY _id")
            .unwrap()
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert_eq!(
            mapped,
            vec![
                (1, "SYNCED".to_string(), "BICYCLE".to_string()),
                (2, "FINISHED".to_string(), "CAR".to_string()),
                (3, "OPEN".to_string(), "UNKNOWN".to_string()),
            ]
        );

        let distance: f64 = conn
            .query_row("SELECT distance FROM measurements WHERE _id = 1", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert!((distance - TWO_LEGS_METERS).abs() < 0.01);

        let accuracy: f64 = conn
            .query_row(
                "SELECT accuracy FROM locations WHERE measurement_fk = 2",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(accuracy, 12.5);

        let altitude: Option<f64> = conn
            .query_row(
                "SELECT altitude FROM locations WHERE measurement_fk = 2",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(altitude, None);
    }

    #[test]
    fn test_measurement_timestamp_backfill() {
        let ctx = MigrationContext::default();
        let mut conn = database_at(7, &ctx);
        conn.execute_batch(
            "INSERT INTO measurements (_id, finished, vehicle, synced) VALUES (1, 1, 'CAR', 0);
             INSERT INTO gps_points (gps_time, lat, lon, speed, accuracy, measurement_fk)
                VALUES (5000, 0.0, 0.0, 1.0, 100, 1), (4000, 0.0, 0.0, 1.0, 100, 1);",
        )
        .unwrap();

        migrate(&mut conn, 7, 8, &ctx).unwrap();
        assert_eq!(
            count(&conn, "SELECT timestamp FROM measurements WHERE _id = 1"),
            4000
        );
    }

    #[test]
    fn test_migrate_11_to_12_imports_legacy_database() {
        let dir = tempfile::tempdir().unwrap();
        let legacy_path = dir.path().join("v6.db");
        create_legacy_file(
            &legacy_path,
            &[
                (
                    1,
                    GeoLocation::new(1000, 0.0, 0.0, 1.0)
                        .with_altitude(100.0)
                        .with_accuracy(3.0)
                        .with_vertical_accuracy(6.0),
                ),
                (
                    1,
                    GeoLocation::new(1001, 0.0, 0.001, 1.0)
                        .with_altitude(103.0)
                        .with_accuracy(3.0)
                        .with_vertical_accuracy(6.0),
                ),
                (9, GeoLocation::new(9000, 0.0, 0.0, 1.0).with_altitude(1.0)),
            ],
        );

        let ctx = MigrationContext {
            legacy_database: Some(legacy_path.clone()),
            preferences_device_id: None,
        };
        let mut conn = database_at(11, &MigrationContext::default());
        conn.execute_batch(
            "INSERT INTO measurements (_id, status, modality, file_format_version, timestamp, distance)
                VALUES (1, 'FINISHED', 'CAR', 2, 1000, 111.19),
                       (2, 'FINISHED', 'CAR', 2, 2000, 0.0);
             INSERT INTO locations (timestamp, latitude, longitude, speed, accuracy, measurement_fk)
                VALUES (1000, 0.0, 0.0, 1.0, 3.0, 1),
                       (1001, 0.0, 0.001, 1.0, 3.0, 1),
                       (2000, 51.0, 13.0, 1.0, 3.0, 2);",
        )
        .unwrap();

        migrate(&mut conn, 11, 12, &ctx).unwrap();

        assert_eq!(count(&conn, "SELECT COUNT(*) FROM measurements"), 2);
        assert_eq!(
            count(&conn, "SELECT COUNT(*) FROM locations WHERE measurement_fk = 1"),
            2
        );
        assert_eq!(
            count(&conn, "SELECT COUNT(*) FROM locations WHERE measurement_fk = 2"),
            1
        );
        // Legacy-only measurements are not imported
        assert_eq!(
            count(&conn, "SELECT COUNT(*) FROM locations WHERE measurement_fk = 9"),
            0
        );

        let altitudes: Vec<Option<f64>> = conn
            .prepare("SELECT altitude FROM locations WHERE measurement_fk = 1 ORDER BY timestamp")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert_eq!(altitudes, vec![Some(100.0), Some(103.0)]);

        assert!(!legacy_path.exists());
    }

    #[test]
    fn test_failed_step_rolls_back() {
        let ctx = MigrationContext::default();
        let mut conn = database_at(2, &ctx);
        conn.execute_batch("CREATE TABLE events (_id INTEGER PRIMARY KEY)")
            .unwrap();

        let err = migrate(&mut conn, 2, SCHEMA_VERSION, &ctx).unwrap_err();
        assert!(matches!(err, Error::Migration { from: 2, to: 3, .. }));
        assert_eq!(schema::get_schema_version(&conn).unwrap(), 2);
    }

    #[test]
    fn test_failed_step_keeps_legacy_database() {
        let dir = tempfile::tempdir().unwrap();
        let legacy_path = dir.path().join("v6.db");
        create_legacy_file(&legacy_path, &[]);

        let ctx = MigrationContext {
            legacy_database: Some(legacy_path.clone()),
            preferences_device_id: None,
        };
        let mut conn = database_at(11, &MigrationContext::default());
        conn.execute_batch("ALTER TABLE locations ADD COLUMN altitude REAL")
            .unwrap();

        assert!(migrate(&mut conn, 11, 12, &ctx).is_err());
        assert_eq!(schema::get_schema_version(&conn).unwrap(), 11);
        assert!(legacy_path.exists());
    }

    #[test]
    fn test_device_id_promoted_from_preferences() {
        let ctx = MigrationContext {
            legacy_database: None,
            preferences_device_id: Some("61e112e1-548e-4a90-be42-6f95a8fd8e4e".to_string()),
        };
        let conn = database_at(SCHEMA_VERSION, &ctx);

        let device_id: String = conn
            .query_row("SELECT device_id FROM identifiers WHERE _id = 1", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(device_id, "61e112e1-548e-4a90-be42-6f95a8fd8e4e");
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM identifiers"), 1);
    }

    #[test]
    fn test_identifiers_collapse_to_single_row() {
        let ctx = MigrationContext::default();
        let mut conn = database_at(16, &ctx);
        conn.execute_batch(
            "INSERT INTO identifiers (device_id) VALUES ('first'), ('second');",
        )
        .unwrap();

        migrate(&mut conn, 16, 17, &ctx).unwrap();
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM identifiers"), 1);
        let device_id: String = conn
            .query_row("SELECT device_id FROM identifiers", [], |row| row.get(0))
            .unwrap();
        assert_eq!(device_id, "first");
        assert!(
            conn.execute("INSERT INTO identifiers (_id, device_id) VALUES (2, 'x')", [])
                .is_err()
        );
    }

    #[test]
    fn test_foreign_keys_drop_orphans_and_cascade() {
        let ctx = MigrationContext::default();
        let mut conn = database_at(15, &ctx);
        conn.execute_batch(
            "INSERT INTO measurements (_id, status, modality, file_format_version, timestamp)
                VALUES (1, 'FINISHED', 'CAR', 2, 1000);
             INSERT INTO locations (timestamp, latitude, longitude, speed, measurement_fk)
                VALUES (1000, 0.0, 0.0, 1.0, 1), (5000, 0.0, 0.0, 1.0, 42);
             INSERT INTO attachments (timestamp, status, type, file_format_version, size, path, measurement_fk)
                VALUES (1000, 'SAVED', 'JPG', 1, 10, '/a.jpg', 1);",
        )
        .unwrap();

        migrate(&mut conn, 15, 16, &ctx).unwrap();
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM locations"), 1);

        conn.execute_batch("PRAGMA foreign_keys = ON").unwrap();
        conn.execute("DELETE FROM measurements WHERE _id = 1", [])
            .unwrap();
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM locations"), 0);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM attachments"), 0);
    }

    #[test]
    fn test_files_size_backfill() {
        let ctx = MigrationContext::default();
        let mut conn = database_at(13, &ctx);
        conn.execute_batch(
            "INSERT INTO measurements (_id, status, modality, file_format_version, timestamp)
                VALUES (1, 'FINISHED', 'CAR', 2, 1000);
             INSERT INTO attachments (timestamp, status, type, file_format_version, size, path, measurement_fk)
                VALUES (1000, 'SAVED', 'JPG', 1, 10, '/a.jpg', 1),
                       (1001, 'SAVED', 'CSV', 1, 32, '/b.csv', 1);",
        )
        .unwrap();

        migrate(&mut conn, 13, 14, &ctx).unwrap();
        assert_eq!(
            count(&conn, "SELECT files_size FROM measurements WHERE _id = 1"),
            42
        );
    }

    #[test]
    fn test_old_formats_deprecated_and_events_renamed() {
        let ctx = MigrationContext::default();
        let mut conn = database_at(17, &ctx);
        conn.execute_batch(
            "INSERT INTO measurements (_id, status, modality, file_format_version, timestamp)
                VALUES (1, 'FINISHED', 'CAR', 2, 1000),
                       (2, 'SYNCED', 'CAR', 2, 2000),
                       (3, 'FINISHED', 'CAR', 3, 3000);
             INSERT INTO events (timestamp, type, value, measurement_fk)
                VALUES (3001, 'VEHICLE_TYPE_CHANGE', 'BUS', 3);",
        )
        .unwrap();

        migrate(&mut conn, 17, SCHEMA_VERSION, &ctx).unwrap();

        let statuses: Vec<String> = conn
            .prepare("SELECT status FROM measurements ORDER BY _id")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert_eq!(statuses, vec!["DEPRECATED", "SYNCED", "FINISHED"]);

        let event_type: String = conn
            .query_row("SELECT type FROM events", [], |row| row.get(0))
            .unwrap();
        assert_eq!(event_type, "MODALITY_TYPE_CHANGE");
    }
}
