//! Shake detector.

use crate::config::ShakeConfig;
use crate::core::{ShakeClassifier, ShakeEvent};
use crate::detector::{start_sensor_session, EventStream, Session};
use crate::source::{SensorKind, SensorSource};
use std::sync::Arc;

/// Watches the accelerometer for shaking gestures.
pub struct ShakeDetector {
    source: Arc<dyn SensorSource>,
    config: ShakeConfig,
    session: Option<Session>,
}

impl ShakeDetector {
    pub fn new(source: Arc<dyn SensorSource>, config: ShakeConfig) -> Self {
        Self {
            source,
            config,
            session: None,
        }
    }

    /// Start observing. Must be called from within a Tokio runtime.
    ///
    /// A running session is stopped first, so the new stream starts with
    /// empty buffers. If the device has no accelerometer the stream fails
    /// straight away with `AccelerometerUnavailable`.
    pub fn observe_shaking(&mut self) -> EventStream<ShakeEvent> {
        self.stop_observing();

        let (session, stream) = start_sensor_session(
            &self.source,
            SensorKind::Accelerometer,
            self.config.sample_buffer,
            ShakeClassifier::new(&self.config),
            "shake",
        );
        self.session = session;
        stream
    }

    /// Unregister from the accelerometer and end the stream with `Stopped`.
    /// Does nothing when not observing.
    pub fn stop_observing(&mut self) {
        if let Some(session) = self.session.take() {
            session.stop();
        }
    }

    /// Whether a session is currently running.
    pub fn is_observing(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_running)
    }
}

impl Drop for ShakeDetector {
    fn drop(&mut self) {
        self.stop_observing();
    }
}
