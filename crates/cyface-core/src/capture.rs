//! Lifecycle of a running capture.
//!
//! A [`CaptureSession`] owns the single capture slot of its [`Persistence`]
//! and the measurement it records into. Every lifecycle change writes both
//! the new status and the matching event, so tracks can be rebuilt later.
//!
//! A session that is dropped without [`CaptureSession::stop`] leaves its
//! measurement OPEN or PAUSED, as happens when the process dies. The next
//! [`CaptureSession::start`] detects that and finishes the leftover first.

use time::OffsetDateTime;
use tracing::{info, warn};

use cyface_store::Measurement;
use cyface_types::{
    Event, EventType, GeoLocation, MeasurementStatus, Modality, Point3D, Point3DType, Pressure,
};

use crate::distance::DistanceAccumulator;
use crate::error::{Error, Result};
use crate::persistence::Persistence;

/// Releases the capture slot when dropped.
struct CaptureSlot {
    persistence: Persistence,
}

impl CaptureSlot {
    fn claim(persistence: &Persistence) -> Result<Self> {
        if !persistence.begin_capture() {
            return Err(Error::CaptureAlreadyRunning);
        }
        Ok(Self {
            persistence: persistence.clone(),
        })
    }
}

impl Drop for CaptureSlot {
    fn drop(&mut self) {
        self.persistence.end_capture();
    }
}

/// A measurement being captured.
pub struct CaptureSession {
    slot: CaptureSlot,
    measurement_id: i64,
    paused: bool,
    distance: DistanceAccumulator,
}

impl CaptureSession {
    /// Create a new measurement and start capturing into it.
    ///
    /// # Errors
    ///
    /// [`Error::CaptureAlreadyRunning`] if another session of the same
    /// persistence is alive. [`Error::IllegalState`] if an active measurement
    /// remains even after recovering dead measurements.
    pub async fn start(persistence: &Persistence, modality: Modality) -> Result<Self> {
        let slot = CaptureSlot::claim(persistence)?;
        let now = now_millis();

        let measurement = match persistence.create_measurement(modality, now).await {
            Err(Error::Store(cyface_store::Error::MeasurementAlreadyActive(id))) => {
                warn!("Measurement {} was left active by a previous run", id);
                recover_dead_measurements(persistence).await?;
                persistence
                    .create_measurement(modality, now)
                    .await
                    .map_err(|e| match e {
                        Error::Store(cyface_store::Error::MeasurementAlreadyActive(id)) => {
                            Error::IllegalState(format!(
                                "measurement {} is still active after recovery",
                                id
                            ))
                        }
                        other => other,
                    })?
            }
            result => result?,
        };

        persistence
            .insert_event(measurement.id, Event::new(now, EventType::LifecycleStart))
            .await?;
        info!("Started capturing measurement {}", measurement.id);

        Ok(Self {
            slot,
            measurement_id: measurement.id,
            paused: false,
            distance: DistanceAccumulator::new(),
        })
    }

    pub fn measurement_id(&self) -> i64 {
        self.measurement_id
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    fn persistence(&self) -> &Persistence {
        &self.slot.persistence
    }

    fn ensure_running(&self) -> Result<()> {
        if self.paused {
            return Err(Error::NoActiveCapture);
        }
        Ok(())
    }

    /// Store a location and add the distance from the previous one.
    ///
    /// A location that fails to store is not counted, so the next distance
    /// is measured from the last stored location.
    pub async fn record_location(&mut self, location: GeoLocation) -> Result<()> {
        self.ensure_running()?;
        self.persistence()
            .insert_location(self.measurement_id, location.clone())
            .await?;
        let delta = self.distance.push(&location);
        if delta > 0.0 {
            self.persistence()
                .increment_distance(self.measurement_id, delta)
                .await?;
        }
        Ok(())
    }

    pub async fn record_pressure(&mut self, pressure: Pressure) -> Result<()> {
        self.ensure_running()?;
        self.persistence()
            .insert_pressure(self.measurement_id, pressure)
            .await
    }

    /// Append a batch of sensor samples to the measurement's sensor file.
    pub async fn record_points(&mut self, sensor: Point3DType, points: Vec<Point3D>) -> Result<usize> {
        self.ensure_running()?;
        self.persistence()
            .append_points(self.measurement_id, sensor, points)
            .await
    }

    /// Record that the mode of transport changed.
    pub async fn change_modality(&mut self, modality: Modality) -> Result<()> {
        let event =
            Event::new(now_millis(), EventType::ModalityTypeChange).with_value(modality.as_str());
        self.persistence()
            .insert_event(self.measurement_id, event)
            .await?;
        info!("Measurement {} changed modality to {}", self.measurement_id, modality);
        Ok(())
    }

    /// Pause the capture. The next location starts a new track.
    pub async fn pause(&mut self) -> Result<()> {
        self.ensure_running()?;
        self.transition(MeasurementStatus::Paused, EventType::LifecyclePause)
            .await?;
        self.paused = true;
        self.distance.reset();
        Ok(())
    }

    pub async fn resume(&mut self) -> Result<()> {
        if !self.paused {
            return Err(Error::IllegalState(format!(
                "measurement {} is not paused",
                self.measurement_id
            )));
        }
        self.transition(MeasurementStatus::Open, EventType::LifecycleResume)
            .await?;
        self.paused = false;
        Ok(())
    }

    /// Finish the measurement and release the capture slot.
    pub async fn stop(self) -> Result<Measurement> {
        self.transition(MeasurementStatus::Finished, EventType::LifecycleStop)
            .await?;
        info!("Stopped capturing measurement {}", self.measurement_id);
        self.persistence().load_measurement(self.measurement_id).await
    }

    async fn transition(&self, status: MeasurementStatus, event_type: EventType) -> Result<()> {
        let persistence = self.persistence();
        persistence.update_status(self.measurement_id, status).await?;
        persistence
            .insert_event(self.measurement_id, Event::new(now_millis(), event_type))
            .await
    }
}

/// Finish every measurement left OPEN or PAUSED by a session that never
/// stopped.
///
/// Returns the ids of the recovered measurements.
pub async fn recover_dead_measurements(persistence: &Persistence) -> Result<Vec<i64>> {
    let mut recovered = Vec::new();
    for measurement in persistence.active_measurements().await? {
        persistence
            .force_status(measurement.id, MeasurementStatus::Finished)
            .await?;
        warn!(
            "Recovered dead measurement {} ({})",
            measurement.id, measurement.status
        );
        recovered.push(measurement.id);
    }
    Ok(recovered)
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyface_store::{SensorFiles, Store};

    fn persistence() -> (tempfile::TempDir, Persistence) {
        let dir = tempfile::tempdir().unwrap();
        let persistence =
            Persistence::new(Store::open_in_memory().unwrap(), SensorFiles::new(dir.path()));
        (dir, persistence)
    }

    #[tokio::test]
    async fn test_paused_session_rejects_data() {
        let (_dir, persistence) = persistence();
        let mut session = CaptureSession::start(&persistence, Modality::Bicycle)
            .await
            .unwrap();

        session.pause().await.unwrap();
        assert!(session.is_paused());
        let result = session
            .record_location(GeoLocation::new(now_millis(), 51.0, 13.0, 5.0))
            .await;
        assert!(matches!(result, Err(Error::NoActiveCapture)));
        assert!(matches!(session.pause().await, Err(Error::NoActiveCapture)));

        session.resume().await.unwrap();
        assert!(matches!(session.resume().await, Err(Error::IllegalState(_))));
    }

    #[tokio::test]
    async fn test_slot_released_on_drop() {
        let (_dir, persistence) = persistence();
        let session = CaptureSession::start(&persistence, Modality::Car).await.unwrap();
        assert!(persistence.is_capturing());

        drop(session);
        assert!(!persistence.is_capturing());
    }

    #[tokio::test]
    async fn test_recover_nothing() {
        let (_dir, persistence) = persistence();
        assert!(recover_dead_measurements(&persistence).await.unwrap().is_empty());
    }

    #[test]
    fn test_now_millis() {
        // Later than 2020-01-01
        assert!(now_millis() > 1_577_836_800_000);
    }
}
