//! Database schema and version tracking.

use rusqlite::Connection;
use tracing::info;

use crate::error::Result;
use crate::migrations::{self, MigrationContext};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 19;

/// Initialize the database schema.
///
/// A fresh database receives the current schema directly. An older database
/// is upgraded step by step through the migration registry; there is no
/// destructive fallback.
pub fn initialize(conn: &mut Connection, ctx: &MigrationContext) -> Result<()> {
    let version = get_schema_version(conn)?;

    if version == 0 {
        // Fresh database - create all tables
        let tx = conn.transaction()?;
        create_schema(&tx)?;
        set_schema_version(&tx, SCHEMA_VERSION)?;
        tx.commit()?;
        info!("Created database schema version {}", SCHEMA_VERSION);
    } else if version < SCHEMA_VERSION {
        migrations::migrate(conn, version, SCHEMA_VERSION, ctx)?;
    }

    Ok(())
}

/// Get the current schema version, 0 for an empty database.
pub(crate) fn get_schema_version(conn: &Connection) -> Result<i32> {
    // Check if the schema_version table exists
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 =
        conn.query_row("SELECT version FROM schema_version", [], |row| row.get(0))?;

    Ok(version)
}

/// Set the schema version.
pub(crate) fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?)",
        [version],
    )?;
    Ok(())
}

/// Create the current schema.
fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS measurements (
            _id INTEGER PRIMARY KEY AUTOINCREMENT,
            status TEXT NOT NULL,
            modality TEXT NOT NULL,
            file_format_version INTEGER NOT NULL,
            timestamp INTEGER NOT NULL,
            distance REAL NOT NULL DEFAULT 0,
            files_size INTEGER NOT NULL DEFAULT 0
        );

        -- Installation identifier, at most one row
        CREATE TABLE IF NOT EXISTS identifiers (
            _id INTEGER PRIMARY KEY CHECK (_id = 1),
            device_id TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS locations (
            _id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp INTEGER NOT NULL,
            latitude REAL NOT NULL,
            longitude REAL NOT NULL,
            altitude REAL,
            speed REAL NOT NULL,
            accuracy REAL,
            vertical_accuracy REAL,
            measurement_fk INTEGER NOT NULL
                REFERENCES measurements(_id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS index_locations_measurement_fk
            ON locations(measurement_fk);

        CREATE TABLE IF NOT EXISTS pressures (
            _id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp INTEGER NOT NULL,
            pressure REAL NOT NULL,
            measurement_fk INTEGER NOT NULL
                REFERENCES measurements(_id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS index_pressures_measurement_fk
            ON pressures(measurement_fk);

        CREATE TABLE IF NOT EXISTS events (
            _id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp INTEGER NOT NULL,
            type TEXT NOT NULL,
            value TEXT,
            measurement_fk INTEGER NOT NULL
                REFERENCES measurements(_id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS index_events_measurement_fk
            ON events(measurement_fk);

        CREATE TABLE IF NOT EXISTS attachments (
            _id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp INTEGER NOT NULL,
            status TEXT NOT NULL,
            type TEXT NOT NULL,
            file_format_version INTEGER NOT NULL,
            size INTEGER NOT NULL,
            path TEXT NOT NULL,
            latitude REAL,
            longitude REAL,
            location_timestamp INTEGER,
            measurement_fk INTEGER NOT NULL
                REFERENCES measurements(_id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS index_attachments_measurement_fk
            ON attachments(measurement_fk);
        "#,
    )?;

    Ok(())
}
