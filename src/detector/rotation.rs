//! Rotation detector.

use crate::config::RotationConfig;
use crate::core::{RotationClassifier, RotationEvent};
use crate::detector::{start_sensor_session, EventStream, Session};
use crate::source::{SensorKind, SensorSource};
use std::sync::Arc;

/// Watches the gyroscope for sustained rotation around the X or Z axis.
pub struct RotationDetector {
    source: Arc<dyn SensorSource>,
    config: RotationConfig,
    session: Option<Session>,
}

impl RotationDetector {
    pub fn new(source: Arc<dyn SensorSource>, config: RotationConfig) -> Self {
        Self {
            source,
            config,
            session: None,
        }
    }

    /// Start observing. Must be called from within a Tokio runtime.
    ///
    /// Fails straight away with `GyroscopeUnavailable` on devices without a
    /// gyroscope.
    pub fn observe_rotation(&mut self) -> EventStream<RotationEvent> {
        self.stop_observing();

        let (session, stream) = start_sensor_session(
            &self.source,
            SensorKind::Gyroscope,
            self.config.sample_buffer,
            RotationClassifier::new(&self.config),
            "rotation",
        );
        self.session = session;
        stream
    }

    pub fn stop_observing(&mut self) {
        if let Some(session) = self.session.take() {
            session.stop();
        }
    }

    pub fn is_observing(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_running)
    }
}

impl Drop for RotationDetector {
    fn drop(&mut self) {
        self.stop_observing();
    }
}
