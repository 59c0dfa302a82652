//! Location change detector.
//!
//! Live updates are only requested after the permission and settings gates
//! have both granted. A gate that does not grant ends the stream with its
//! error; the location source is never touched in that case.

use crate::config::LocationConfig;
use crate::core::{LocationAnalyzer, LocationEvent};
use crate::detector::{event_channel, pump, DetectorMessage, EventStream, RegistrationSlot, Session};
use crate::error::DetectorError;
use crate::gate::{GateOutcome, LocationGates, PermissionGate, SettingsGate};
use crate::source::{sample_channel, LocationSource, PermissionPlatform, SettingsPlatform};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Reports when the device has moved far enough from its last checkpoint.
pub struct LocationChangeDetector {
    gates: Arc<LocationGates>,
    source: Arc<dyn LocationSource>,
    config: LocationConfig,
    session: Option<Session>,
}

impl LocationChangeDetector {
    pub fn new(
        permissions: Arc<dyn PermissionPlatform>,
        settings: Arc<dyn SettingsPlatform>,
        source: Arc<dyn LocationSource>,
        config: LocationConfig,
    ) -> Self {
        let gates = LocationGates::new(PermissionGate::new(permissions), SettingsGate::new(settings));
        Self {
            gates: Arc::new(gates),
            source,
            config,
            session: None,
        }
    }

    /// Run the gates, then start live updates. Must be called from within a
    /// Tokio runtime.
    ///
    /// Each call starts a fresh session: no checkpoint and no previous fix.
    pub fn observe_location_change(&mut self) -> EventStream<LocationEvent> {
        self.stop_observing();

        let (events, stream) = event_channel();
        let (stop, stop_signal) = oneshot::channel();
        let slot = RegistrationSlot::default();
        let task = tokio::spawn(run_session(
            self.gates.clone(),
            self.source.clone(),
            self.config.clone(),
            slot.clone(),
            events,
            stop_signal,
        ));

        self.session = Some(Session {
            stop: Some(stop),
            slot,
            task,
        });
        stream
    }

    /// Stop live updates, or abandon the gates if they are still pending.
    pub fn stop_observing(&mut self) {
        if let Some(session) = self.session.take() {
            session.stop();
        }
    }

    pub fn is_observing(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_running)
    }
}

impl Drop for LocationChangeDetector {
    fn drop(&mut self) {
        self.stop_observing();
    }
}

async fn run_session(
    gates: Arc<LocationGates>,
    source: Arc<dyn LocationSource>,
    config: LocationConfig,
    slot: RegistrationSlot,
    events: mpsc::Sender<DetectorMessage<LocationEvent>>,
    mut stop: oneshot::Receiver<()>,
) {
    let request = config.location_request();

    let outcome = tokio::select! {
        biased;
        _ = &mut stop => {
            tracing::info!("location detector stopped while gating");
            let _ = events.send(DetectorMessage::Stopped).await;
            return;
        }
        outcome = gates.pass(&request) => outcome,
    };

    let error = match outcome {
        GateOutcome::Granted => None,
        GateOutcome::Denied(error) => Some(error),
        GateOutcome::Cancelled => Some(DetectorError::Unknown),
    };
    if let Some(error) = error {
        tracing::warn!("Location updates not started: {}", error);
        slot.close();
        let _ = events.send(DetectorMessage::Failed(error)).await;
        return;
    }

    let (sink, fixes) = sample_channel(config.sample_buffer);
    match source.request_updates(&request, sink) {
        Ok(registration) => {
            if !slot.install(registration) {
                let _ = events.send(DetectorMessage::Stopped).await;
                return;
            }
        }
        Err(e) => {
            tracing::warn!("Could not start location updates: {}", e);
            slot.close();
            let _ = events.send(DetectorMessage::Failed(e.into())).await;
            return;
        }
    }
    tracing::info!(
        "Live location updates started ({:?} every {} ms)",
        request.priority,
        request.interval.as_millis()
    );

    pump(fixes, stop, events, slot, LocationAnalyzer::new(&config), "location").await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::scripted::{
        Prompt, Resolution, ScriptedLocationSource, ScriptedPermissions, ScriptedSettings,
    };
    use crate::source::{LocationFix, PermissionGrants, SettingsCheck};

    const METERS_PER_DEGREE: f64 = 111_195.08;

    fn fix(north_m: f64, seconds: i64) -> LocationFix {
        LocationFix {
            latitude: north_m / METERS_PER_DEGREE,
            longitude: 0.0,
            accuracy: 5.0,
            bearing: 90.0,
            speed: 1.2,
            timestamp_ms: seconds * 1000,
        }
    }

    struct Rig {
        permissions: ScriptedPermissions,
        settings: ScriptedSettings,
        source: ScriptedLocationSource,
        detector: LocationChangeDetector,
    }

    fn rig(permissions: ScriptedPermissions, settings: ScriptedSettings) -> Rig {
        let source = ScriptedLocationSource::new();
        let detector = LocationChangeDetector::new(
            Arc::new(permissions.clone()),
            Arc::new(settings.clone()),
            Arc::new(source.clone()),
            LocationConfig::default(),
        );
        Rig {
            permissions,
            settings,
            source,
            detector,
        }
    }

    async fn wait_for_updates(source: &ScriptedLocationSource) {
        while !source.is_registered() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_walk_emits_after_gates_grant() {
        let mut rig = rig(ScriptedPermissions::granting(), ScriptedSettings::satisfied());
        let mut stream = rig.detector.observe_location_change();
        wait_for_updates(&rig.source).await;

        assert_eq!(rig.source.last_request(), Some(LocationConfig::default().location_request()));
        assert!(rig.source.emit(fix(0.0, 0)));
        assert!(rig.source.emit(fix(15.0, 10)));
        assert!(rig.source.emit(fix(30.0, 20)));
        assert_eq!(stream.next().await, Some(DetectorMessage::Event(LocationEvent)));

        rig.detector.stop_observing();
        assert!(!rig.source.is_registered());
        assert_eq!(stream.next().await, Some(DetectorMessage::Stopped));
    }

    #[tokio::test]
    async fn test_fine_denial_never_checks_settings() {
        let permissions = ScriptedPermissions::new(Prompt::Answer(PermissionGrants {
            coarse: true,
            fine: false,
        }));
        let mut rig = rig(permissions, ScriptedSettings::satisfied());
        let mut stream = rig.detector.observe_location_change();

        assert_eq!(
            stream.next().await,
            Some(DetectorMessage::Failed(DetectorError::FineLocationDenied))
        );
        assert_eq!(stream.next().await, None);
        assert_eq!(rig.permissions.request_count(), 1);
        assert_eq!(rig.settings.check_count(), 0);
        assert_eq!(rig.source.request_count(), 0);
    }

    #[tokio::test]
    async fn test_rejected_settings_never_start_updates() {
        let settings = ScriptedSettings::new(
            Prompt::Answer(SettingsCheck::Resolvable),
            Resolution::Prompt(Prompt::Answer(false)),
        );
        let mut rig = rig(ScriptedPermissions::granting(), settings);
        let mut stream = rig.detector.observe_location_change();

        assert_eq!(
            stream.next().await,
            Some(DetectorMessage::Failed(DetectorError::LocationSettingsRejected))
        );
        assert_eq!(rig.settings.resolution_count(), 1);
        assert_eq!(rig.source.request_count(), 0);
    }

    #[tokio::test]
    async fn test_stop_while_gating_ends_quietly() {
        let mut rig = rig(
            ScriptedPermissions::new(Prompt::Hold),
            ScriptedSettings::satisfied(),
        );
        let mut stream = rig.detector.observe_location_change();
        while rig.permissions.request_count() == 0 {
            tokio::task::yield_now().await;
        }

        rig.detector.stop_observing();
        assert_eq!(stream.next().await, Some(DetectorMessage::Stopped));
        assert_eq!(stream.next().await, None);
        assert_eq!(rig.source.request_count(), 0);
    }

    #[tokio::test]
    async fn test_dismissed_prompt_fails_with_unknown() {
        let mut rig = rig(
            ScriptedPermissions::new(Prompt::Dismiss),
            ScriptedSettings::satisfied(),
        );
        let mut stream = rig.detector.observe_location_change();
        assert_eq!(
            stream.next().await,
            Some(DetectorMessage::Failed(DetectorError::Unknown))
        );
    }
}
