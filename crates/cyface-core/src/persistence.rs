//! Async facade over the blocking store.
//!
//! [`Persistence`] is cheap to clone and shares one [`Store`] behind a tokio
//! mutex. Every database call runs on the blocking thread pool, so async
//! callers never stall the runtime on SQLite I/O.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use cyface_store::{
    Attachment, LocationQuery, Measurement, MeasurementQuery, MigrationContext, SensorFiles, Store,
};
use cyface_types::{Event, GeoLocation, MeasurementStatus, Modality, Point3D, Point3DType, Pressure};

use crate::error::Result;
use crate::serializer;
use crate::track::{self, Track};

/// Source of the device identifier sent along with uploads.
#[async_trait]
pub trait DeviceIdProvider: Send + Sync {
    /// The identifier of this installation, created on first use.
    async fn device_id(&self) -> Result<String>;
}

/// Shared access to measurements and their sensor files.
#[derive(Clone)]
pub struct Persistence {
    store: Arc<Mutex<Store>>,
    files: SensorFiles,
    capture_running: Arc<AtomicBool>,
}

impl Persistence {
    /// Wrap an open store and the sensor file root.
    pub fn new(store: Store, files: SensorFiles) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            files,
            capture_running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Open the database and sensor files of a data directory.
    ///
    /// Pending migrations run before this returns.
    pub async fn open(data_dir: &Path, ctx: MigrationContext) -> Result<Self> {
        let db_path = cyface_store::db_path(data_dir);
        let files = SensorFiles::new(cyface_store::sensor_files_dir(data_dir));

        let store = tokio::task::spawn_blocking(move || Store::open_with(db_path, &ctx)).await??;
        Ok(Self::new(store, files))
    }

    /// Schema version of the open database.
    pub async fn schema_version(&self) -> Result<i32> {
        self.with_store(|store| store.schema_version()).await
    }

    /// The sensor files this facade writes to.
    pub fn sensor_files(&self) -> &SensorFiles {
        &self.files
    }

    /// Run a store operation on the blocking pool.
    async fn with_store<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Store) -> cyface_store::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let value = tokio::task::spawn_blocking(move || {
            let store = store.blocking_lock();
            f(&store)
        })
        .await??;
        Ok(value)
    }

    /// Claim the process-wide capture slot, `false` if already taken.
    pub(crate) fn begin_capture(&self) -> bool {
        !self.capture_running.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn end_capture(&self) {
        self.capture_running.store(false, Ordering::SeqCst);
    }

    /// Whether a capture session holds the capture slot.
    pub fn is_capturing(&self) -> bool {
        self.capture_running.load(Ordering::SeqCst)
    }
}

// Measurements
impl Persistence {
    pub async fn create_measurement(&self, modality: Modality, timestamp: i64) -> Result<Measurement> {
        self.with_store(move |store| store.create_measurement(modality, timestamp))
            .await
    }

    pub async fn get_measurement(&self, measurement_id: i64) -> Result<Option<Measurement>> {
        self.with_store(move |store| store.get_measurement(measurement_id))
            .await
    }

    pub async fn load_measurement(&self, measurement_id: i64) -> Result<Measurement> {
        self.with_store(move |store| store.load_measurement(measurement_id))
            .await
    }

    pub async fn query_measurements(&self, query: MeasurementQuery) -> Result<Vec<Measurement>> {
        self.with_store(move |store| store.query_measurements(&query))
            .await
    }

    /// Measurements that are OPEN or PAUSED.
    pub async fn active_measurements(&self) -> Result<Vec<Measurement>> {
        self.with_store(|store| store.active_measurements()).await
    }

    /// Change the status along a valid lifecycle transition.
    pub async fn update_status(&self, measurement_id: i64, status: MeasurementStatus) -> Result<()> {
        self.with_store(move |store| store.update_status(measurement_id, status))
            .await
    }

    /// Change the status without validating the transition.
    pub async fn force_status(&self, measurement_id: i64, status: MeasurementStatus) -> Result<()> {
        self.with_store(move |store| store.force_status(measurement_id, status))
            .await
    }

    pub async fn increment_distance(&self, measurement_id: i64, delta: f64) -> Result<()> {
        self.with_store(move |store| store.increment_distance(measurement_id, delta))
            .await
    }

    pub async fn update_distance(&self, measurement_id: i64, distance: f64) -> Result<()> {
        self.with_store(move |store| store.update_distance(measurement_id, distance))
            .await
    }

    /// Delete a measurement, its rows and its sensor files.
    pub async fn delete_measurement(&self, measurement_id: i64) -> Result<()> {
        let files = self.files.clone();
        self.with_store(move |store| {
            store.delete_measurement(measurement_id)?;
            files.delete(measurement_id)
        })
        .await
    }
}

// Captured rows
impl Persistence {
    pub async fn insert_location(&self, measurement_id: i64, location: GeoLocation) -> Result<()> {
        self.with_store(move |store| store.insert_location(measurement_id, &location).map(|_| ()))
            .await
    }

    pub async fn count_locations(&self, measurement_id: i64) -> Result<u64> {
        self.with_store(move |store| store.count_locations(measurement_id))
            .await
    }

    /// One page of locations in capture order.
    pub async fn location_page(
        &self,
        measurement_id: i64,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<GeoLocation>> {
        let query = LocationQuery::new()
            .measurement(measurement_id)
            .offset(offset)
            .limit(limit);
        self.with_store(move |store| store.query_locations(&query))
            .await
    }

    pub async fn load_locations(&self, measurement_id: i64) -> Result<Vec<GeoLocation>> {
        self.with_store(move |store| store.load_locations(measurement_id))
            .await
    }

    pub async fn insert_pressure(&self, measurement_id: i64, pressure: Pressure) -> Result<()> {
        self.with_store(move |store| store.insert_pressure(measurement_id, &pressure).map(|_| ()))
            .await
    }

    pub async fn load_pressures(&self, measurement_id: i64) -> Result<Vec<Pressure>> {
        self.with_store(move |store| store.load_pressures(measurement_id))
            .await
    }

    pub async fn insert_event(&self, measurement_id: i64, event: Event) -> Result<()> {
        self.with_store(move |store| store.insert_event(measurement_id, &event).map(|_| ()))
            .await
    }

    /// Events in chronological order.
    pub async fn load_events(&self, measurement_id: i64) -> Result<Vec<Event>> {
        self.with_store(move |store| store.load_events(measurement_id))
            .await
    }

    pub async fn load_attachments(&self, measurement_id: i64) -> Result<Vec<Attachment>> {
        self.with_store(move |store| store.load_attachments(measurement_id))
            .await
    }

    /// Split a measurement into its tracks.
    pub async fn load_tracks(&self, measurement_id: i64) -> Result<Vec<Track>> {
        let (locations, pressures, events) = self
            .with_store(move |store| {
                Ok((
                    store.load_locations(measurement_id)?,
                    store.load_pressures(measurement_id)?,
                    store.load_events(measurement_id)?,
                ))
            })
            .await?;
        Ok(track::build_tracks(&locations, &pressures, &events))
    }
}

// Sensor files
impl Persistence {
    /// Serialize a batch of samples and append it to the sensor file.
    ///
    /// Returns the number of bytes appended.
    pub async fn append_points(
        &self,
        measurement_id: i64,
        sensor: Point3DType,
        points: Vec<Point3D>,
    ) -> Result<usize> {
        let files = self.files.clone();
        let written = tokio::task::spawn_blocking(move || {
            let bytes = serializer::serialize_points(&points, sensor);
            if !bytes.is_empty() {
                files.append(measurement_id, sensor, &bytes)?;
            }
            Ok::<_, cyface_store::Error>(bytes.len())
        })
        .await??;
        Ok(written)
    }

    /// Bytes of a sensor file, `None` when nothing was captured.
    pub async fn read_sensor_file(
        &self,
        measurement_id: i64,
        sensor: Point3DType,
    ) -> Result<Option<Vec<u8>>> {
        let files = self.files.clone();
        let bytes =
            tokio::task::spawn_blocking(move || files.read(measurement_id, sensor)).await??;
        if let Some(bytes) = &bytes {
            debug!(
                "Read {} bytes of {} data for measurement {}",
                bytes.len(),
                sensor,
                measurement_id
            );
        }
        Ok(bytes)
    }
}

#[async_trait]
impl DeviceIdProvider for Persistence {
    async fn device_id(&self) -> Result<String> {
        let id = self.with_store(|store| store.device_id_or_create()).await?;
        info!("Using device id {}", id);
        Ok(id)
    }
}
