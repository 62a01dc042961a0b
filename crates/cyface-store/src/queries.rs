//! Query builders for measurements and locations.
//!
//! Both [`MeasurementQuery`] and [`LocationQuery`] follow the builder pattern.
//! Location queries are used by the serializers to page through large
//! measurements without loading every row at once.
//!
//! # Example
//!
//! ```
//! use cyface_store::{LocationQuery, MeasurementQuery, Store};
//! use cyface_types::MeasurementStatus;
//!
//! let store = Store::open_in_memory()?;
//!
//! let finished = store.query_measurements(
//!     &MeasurementQuery::new().status(MeasurementStatus::Finished),
//! )?;
//!
//! // Second page of 10 000 locations of measurement 1, in capture order
//! let page = store.query_locations(
//!     &LocationQuery::new().measurement(1).limit(10_000).offset(10_000),
//! )?;
//! # let _ = (finished, page);
//! # Ok::<(), cyface_store::Error>(())
//! ```

use cyface_types::MeasurementStatus;

/// Fluent query builder for measurements.
///
/// By default, queries return results ordered by creation time descending
/// (newest first).
#[derive(Debug, Default, Clone)]
pub struct MeasurementQuery {
    /// Filter by status.
    pub status: Option<MeasurementStatus>,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Offset for pagination.
    pub offset: Option<u32>,
    /// Order by creation time descending.
    pub newest_first: bool,
}

impl MeasurementQuery {
    /// Create a new query returning all measurements, newest first.
    pub fn new() -> Self {
        Self {
            newest_first: true,
            ..Default::default()
        }
    }

    /// Only include measurements with this status.
    pub fn status(mut self, status: MeasurementStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Limit the maximum number of results returned.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first N results.
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Order results by oldest first.
    pub fn oldest_first(mut self) -> Self {
        self.newest_first = false;
        self
    }

    /// Build the SQL WHERE clause and parameters.
    pub(crate) fn build_where(&self) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        let where_clause = match self.status {
            Some(status) => {
                params.push(Box::new(status.as_str()));
                "WHERE status = ?".to_string()
            }
            None => String::new(),
        };

        (where_clause, params)
    }

    /// Build the full SQL query.
    pub(crate) fn build_sql(&self) -> String {
        let (where_clause, _) = self.build_where();
        let order = if self.newest_first { "DESC" } else { "ASC" };

        let mut sql = format!(
            "SELECT _id, status, modality, file_format_version, distance, timestamp, files_size \
             FROM measurements {} ORDER BY timestamp {}, _id {}",
            where_clause, order, order
        );
        push_pagination(&mut sql, self.limit, self.offset);
        sql
    }
}

/// Fluent query builder for locations.
///
/// Unlike measurements, locations are returned in capture order (oldest
/// first) unless [`LocationQuery::newest_first`] is called, because every
/// consumer of the location sequence depends on ascending timestamps.
#[derive(Debug, Default, Clone)]
pub struct LocationQuery {
    /// Filter by owning measurement.
    pub measurement_id: Option<i64>,
    /// Include only locations at or after this timestamp (ms).
    pub since: Option<i64>,
    /// Include only locations at or before this timestamp (ms).
    pub until: Option<i64>,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Offset for pagination.
    pub offset: Option<u32>,
    /// Order by timestamp descending.
    pub newest_first: bool,
}

impl LocationQuery {
    /// Create a new query returning all locations in capture order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only include locations of this measurement.
    pub fn measurement(mut self, measurement_id: i64) -> Self {
        self.measurement_id = Some(measurement_id);
        self
    }

    /// Filter to locations captured at or after this timestamp.
    pub fn since(mut self, timestamp: i64) -> Self {
        self.since = Some(timestamp);
        self
    }

    /// Filter to locations captured at or before this timestamp.
    pub fn until(mut self, timestamp: i64) -> Self {
        self.until = Some(timestamp);
        self
    }

    /// Limit the maximum number of results returned.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first N results.
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Order results by newest first.
    pub fn newest_first(mut self) -> Self {
        self.newest_first = true;
        self
    }

    /// Build the SQL WHERE clause and parameters.
    pub(crate) fn build_where(&self) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(measurement_id) = self.measurement_id {
            conditions.push("measurement_fk = ?");
            params.push(Box::new(measurement_id));
        }

        if let Some(since) = self.since {
            conditions.push("timestamp >= ?");
            params.push(Box::new(since));
        }

        if let Some(until) = self.until {
            conditions.push("timestamp <= ?");
            params.push(Box::new(until));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    /// Build the full SQL query.
    pub(crate) fn build_sql(&self) -> String {
        let (where_clause, _) = self.build_where();
        let order = if self.newest_first { "DESC" } else { "ASC" };

        let mut sql = format!(
            "SELECT timestamp, latitude, longitude, altitude, speed, accuracy, vertical_accuracy \
             FROM locations {} ORDER BY timestamp {}, _id {}",
            where_clause, order, order
        );
        push_pagination(&mut sql, self.limit, self.offset);
        sql
    }
}

fn push_pagination(sql: &mut String, limit: Option<u32>, offset: Option<u32>) {
    // SQLite only accepts OFFSET together with LIMIT
    match (limit, offset) {
        (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset)),
        (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
        (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
        (None, None) => {}
    }
}
