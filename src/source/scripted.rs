//! In-memory implementations of the platform sources.
//!
//! These stand in for the device when replaying recorded sessions and in
//! tests. Samples are pushed by calling `emit`, exactly as a platform callback
//! would push them into the registered sink.

use crate::error::SourceError;
use crate::source::{
    lock, LocationFix, LocationPermission, LocationRequest, LocationSource, PermissionGrants,
    PermissionPlatform, Registration, SampleSink, SensorKind, SensorSample, SensorSource,
    SettingsCheck, SettingsPlatform,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// A registered sink tagged with the registration that installed it.
type TaggedSink<T> = (u64, SampleSink<T>);

#[derive(Default)]
struct SensorInner {
    missing: Mutex<HashSet<SensorKind>>,
    sinks: Mutex<HashMap<SensorKind, TaggedSink<SensorSample>>>,
    next_id: AtomicU64,
    registrations: AtomicUsize,
}

/// Scripted accelerometer/gyroscope source.
#[derive(Clone, Default)]
pub struct ScriptedSensorSource {
    inner: Arc<SensorInner>,
}

impl ScriptedSensorSource {
    /// Create a source with both sensors present.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a sensor from the simulated device.
    pub fn without(self, kind: SensorKind) -> Self {
        lock(&self.inner.missing).insert(kind);
        self
    }

    /// Deliver a sample to the listener registered for `kind`.
    ///
    /// Returns false if nobody is listening or the sample was dropped.
    pub fn emit(&self, kind: SensorKind, sample: SensorSample) -> bool {
        match lock(&self.inner.sinks).get(&kind) {
            Some((_, sink)) => sink.push(sample),
            None => false,
        }
    }

    /// Check if a listener is currently registered for `kind`.
    pub fn is_registered(&self, kind: SensorKind) -> bool {
        lock(&self.inner.sinks).contains_key(&kind)
    }

    /// Total number of successful registrations so far.
    pub fn registration_count(&self) -> usize {
        self.inner.registrations.load(Ordering::SeqCst)
    }
}

impl SensorSource for ScriptedSensorSource {
    fn is_available(&self, kind: SensorKind) -> bool {
        !lock(&self.inner.missing).contains(&kind)
    }

    fn register(
        &self,
        kind: SensorKind,
        sink: SampleSink<SensorSample>,
    ) -> Result<Registration, SourceError> {
        if !self.is_available(kind) {
            return Err(SourceError::SensorUnavailable(kind));
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        lock(&self.inner.sinks).insert(kind, (id, sink));
        self.inner.registrations.fetch_add(1, Ordering::SeqCst);

        let inner = self.inner.clone();
        Ok(Registration::new(move || {
            let mut sinks = lock(&inner.sinks);
            if sinks.get(&kind).map(|(current, _)| *current) == Some(id) {
                sinks.remove(&kind);
            }
        }))
    }
}

#[derive(Default)]
struct LocationInner {
    sink: Mutex<Option<TaggedSink<LocationFix>>>,
    last_request: Mutex<Option<LocationRequest>>,
    next_id: AtomicU64,
    requests: AtomicUsize,
}

/// Scripted live location source.
#[derive(Clone, Default)]
pub struct ScriptedLocationSource {
    inner: Arc<LocationInner>,
}

impl ScriptedLocationSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a fix to the registered listener.
    pub fn emit(&self, fix: LocationFix) -> bool {
        match lock(&self.inner.sink).as_ref() {
            Some((_, sink)) => sink.push(fix),
            None => false,
        }
    }

    /// Check if live updates are currently running.
    pub fn is_registered(&self) -> bool {
        lock(&self.inner.sink).is_some()
    }

    /// Number of times live updates were started.
    pub fn request_count(&self) -> usize {
        self.inner.requests.load(Ordering::SeqCst)
    }

    /// The request used to start the most recent live updates.
    pub fn last_request(&self) -> Option<LocationRequest> {
        lock(&self.inner.last_request).clone()
    }
}

impl LocationSource for ScriptedLocationSource {
    fn request_updates(
        &self,
        request: &LocationRequest,
        sink: SampleSink<LocationFix>,
    ) -> Result<Registration, SourceError> {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        *lock(&self.inner.sink) = Some((id, sink));
        *lock(&self.inner.last_request) = Some(request.clone());
        self.inner.requests.fetch_add(1, Ordering::SeqCst);

        let inner = self.inner.clone();
        Ok(Registration::new(move || {
            let mut sink = lock(&inner.sink);
            if sink.as_ref().map(|(current, _)| *current) == Some(id) {
                *sink = None;
            }
        }))
    }
}

/// How a scripted platform answers a one-shot prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt<T> {
    /// Answer immediately
    Answer(T),
    /// Keep the prompt open until answered through the scripted platform
    Hold,
    /// Close the prompt without an answer
    Dismiss,
}

struct PermissionInner {
    prompt: Prompt<PermissionGrants>,
    pending: Mutex<Option<oneshot::Sender<PermissionGrants>>>,
    requests: AtomicUsize,
    last_permissions: Mutex<Vec<LocationPermission>>,
}

/// Scripted permission dialog.
#[derive(Clone)]
pub struct ScriptedPermissions {
    inner: Arc<PermissionInner>,
}

impl ScriptedPermissions {
    pub fn new(prompt: Prompt<PermissionGrants>) -> Self {
        Self {
            inner: Arc::new(PermissionInner {
                prompt,
                pending: Mutex::new(None),
                requests: AtomicUsize::new(0),
                last_permissions: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Dialog that grants both permissions.
    pub fn granting() -> Self {
        Self::new(Prompt::Answer(PermissionGrants {
            coarse: true,
            fine: true,
        }))
    }

    /// Answer a held request. Returns false if no request is open.
    pub fn answer(&self, grants: PermissionGrants) -> bool {
        match lock(&self.inner.pending).take() {
            Some(sender) => sender.send(grants).is_ok(),
            None => false,
        }
    }

    /// Number of permission requests made.
    pub fn request_count(&self) -> usize {
        self.inner.requests.load(Ordering::SeqCst)
    }

    /// Permissions asked for in the most recent request.
    pub fn last_permissions(&self) -> Vec<LocationPermission> {
        lock(&self.inner.last_permissions).clone()
    }
}

impl PermissionPlatform for ScriptedPermissions {
    fn request_permissions(
        &self,
        permissions: &[LocationPermission],
    ) -> oneshot::Receiver<PermissionGrants> {
        self.inner.requests.fetch_add(1, Ordering::SeqCst);
        *lock(&self.inner.last_permissions) = permissions.to_vec();

        let (sender, receiver) = oneshot::channel();
        match self.inner.prompt {
            Prompt::Answer(grants) => {
                let _ = sender.send(grants);
            }
            Prompt::Hold => {
                *lock(&self.inner.pending) = Some(sender);
            }
            Prompt::Dismiss => drop(sender),
        }
        receiver
    }
}

/// What the scripted resolution prompt does when started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The prompt opens and yields this answer
    Prompt(Prompt<bool>),
    /// The prompt cannot be shown
    Unavailable,
}

struct SettingsInner {
    check: Prompt<SettingsCheck>,
    resolution: Resolution,
    pending_check: Mutex<Option<oneshot::Sender<SettingsCheck>>>,
    pending_resolution: Mutex<Option<oneshot::Sender<bool>>>,
    checks: AtomicUsize,
    resolutions: AtomicUsize,
    last_request: Mutex<Option<LocationRequest>>,
}

/// Scripted settings check and resolution prompt.
#[derive(Clone)]
pub struct ScriptedSettings {
    inner: Arc<SettingsInner>,
}

impl ScriptedSettings {
    pub fn new(check: Prompt<SettingsCheck>, resolution: Resolution) -> Self {
        Self {
            inner: Arc::new(SettingsInner {
                check,
                resolution,
                pending_check: Mutex::new(None),
                pending_resolution: Mutex::new(None),
                checks: AtomicUsize::new(0),
                resolutions: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            }),
        }
    }

    /// Settings that already satisfy any request.
    pub fn satisfied() -> Self {
        Self::new(
            Prompt::Answer(SettingsCheck::Satisfied),
            Resolution::Unavailable,
        )
    }

    /// Answer a held settings check.
    pub fn answer_check(&self, check: SettingsCheck) -> bool {
        match lock(&self.inner.pending_check).take() {
            Some(sender) => sender.send(check).is_ok(),
            None => false,
        }
    }

    /// Answer a held resolution prompt.
    pub fn resolve(&self, accepted: bool) -> bool {
        match lock(&self.inner.pending_resolution).take() {
            Some(sender) => sender.send(accepted).is_ok(),
            None => false,
        }
    }

    /// Number of settings checks started.
    pub fn check_count(&self) -> usize {
        self.inner.checks.load(Ordering::SeqCst)
    }

    /// Number of resolution prompts started.
    pub fn resolution_count(&self) -> usize {
        self.inner.resolutions.load(Ordering::SeqCst)
    }

    /// Request passed to the most recent settings check.
    pub fn last_request(&self) -> Option<LocationRequest> {
        lock(&self.inner.last_request).clone()
    }
}

impl SettingsPlatform for ScriptedSettings {
    fn check_settings(&self, request: &LocationRequest) -> oneshot::Receiver<SettingsCheck> {
        self.inner.checks.fetch_add(1, Ordering::SeqCst);
        *lock(&self.inner.last_request) = Some(request.clone());

        let (sender, receiver) = oneshot::channel();
        match self.inner.check {
            Prompt::Answer(check) => {
                let _ = sender.send(check);
            }
            Prompt::Hold => {
                *lock(&self.inner.pending_check) = Some(sender);
            }
            Prompt::Dismiss => drop(sender),
        }
        receiver
    }

    fn start_resolution(
        &self,
        _request: &LocationRequest,
    ) -> Result<oneshot::Receiver<bool>, SourceError> {
        let prompt = match self.inner.resolution {
            Resolution::Prompt(prompt) => prompt,
            Resolution::Unavailable => {
                return Err(SourceError::ResolutionUnavailable(
                    "no host to show the prompt".to_string(),
                ))
            }
        };
        self.inner.resolutions.fetch_add(1, Ordering::SeqCst);

        let (sender, receiver) = oneshot::channel();
        match prompt {
            Prompt::Answer(accepted) => {
                let _ = sender.send(accepted);
            }
            Prompt::Hold => {
                *lock(&self.inner.pending_resolution) = Some(sender);
            }
            Prompt::Dismiss => drop(sender),
        }
        Ok(receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::sample_channel;

    #[test]
    fn test_sensor_source_registration_lifecycle() {
        let source = ScriptedSensorSource::new();
        let (sink, mut receiver) = sample_channel(8);

        let registration = source
            .register(SensorKind::Gyroscope, sink)
            .expect("gyroscope present");
        assert!(source.is_registered(SensorKind::Gyroscope));
        assert!(source.emit(SensorKind::Gyroscope, SensorSample::new(1, 0.1, 0.2, 0.3)));
        assert!(receiver.try_recv().is_ok());

        drop(registration);
        assert!(!source.is_registered(SensorKind::Gyroscope));
        assert!(!source.emit(SensorKind::Gyroscope, SensorSample::new(2, 0.0, 0.0, 0.0)));
    }

    #[test]
    fn test_missing_sensor_refuses_registration() {
        let source = ScriptedSensorSource::new().without(SensorKind::Accelerometer);
        let (sink, _receiver) = sample_channel(8);

        assert!(!source.is_available(SensorKind::Accelerometer));
        assert_eq!(
            source.register(SensorKind::Accelerometer, sink).err(),
            Some(SourceError::SensorUnavailable(SensorKind::Accelerometer))
        );
    }

    #[test]
    fn test_stale_registration_does_not_remove_newer_sink() {
        let source = ScriptedSensorSource::new();
        let (first_sink, _first) = sample_channel(8);
        let (second_sink, _second) = sample_channel(8);

        let first = source
            .register(SensorKind::Accelerometer, first_sink)
            .expect("present");
        let _second_registration = source
            .register(SensorKind::Accelerometer, second_sink)
            .expect("present");

        drop(first);
        assert!(source.is_registered(SensorKind::Accelerometer));
        assert_eq!(source.registration_count(), 2);
    }

    #[tokio::test]
    async fn test_held_permission_prompt() {
        let permissions = ScriptedPermissions::new(Prompt::Hold);
        let receiver = permissions.request_permissions(&[LocationPermission::Fine]);

        assert!(permissions.answer(PermissionGrants {
            coarse: true,
            fine: false,
        }));
        let grants = receiver.await.expect("answered");
        assert!(grants.coarse);
        assert!(!grants.fine);
    }
}
