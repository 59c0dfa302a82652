//! Platform-facing sample sources.
//!
//! The platform pushes samples through callbacks. Each detector hands the
//! platform a [`SampleSink`] bound to its own bounded channel and keeps the
//! returned [`Registration`] for as long as it wants samples. Dropping the
//! registration unregisters the callback.

pub mod script;
pub mod scripted;
pub mod types;

use crate::error::SourceError;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot};

// Re-export commonly used types
pub use types::{LocationFix, LocationRequest, Priority, SensorKind, SensorSample};

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Push end of a detector's sample channel, handed to platform callbacks.
#[derive(Debug)]
pub struct SampleSink<T> {
    sender: mpsc::Sender<T>,
}

impl<T> Clone for SampleSink<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T> SampleSink<T> {
    /// Push a sample without blocking the caller.
    ///
    /// Returns false if the sample was dropped because the channel is full or
    /// the detector has gone away.
    pub fn push(&self, sample: T) -> bool {
        self.sender.try_send(sample).is_ok()
    }

    /// Check if the consuming detector has gone away.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Create a bounded sample channel.
pub fn sample_channel<T>(capacity: usize) -> (SampleSink<T>, mpsc::Receiver<T>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (SampleSink { sender }, receiver)
}

/// Scoped listener registration. Dropping it unregisters the listener.
pub struct Registration {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Registration {
    /// Create a registration that runs `release` when dropped.
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Unregister now.
    pub fn release(mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("active", &self.release.is_some())
            .finish()
    }
}

/// Motion sensor source (accelerometer and gyroscope).
pub trait SensorSource: Send + Sync {
    /// Whether the device has the given sensor.
    fn is_available(&self, kind: SensorKind) -> bool;

    /// Start delivering samples of `kind` to `sink` at game rate.
    fn register(
        &self,
        kind: SensorKind,
        sink: SampleSink<SensorSample>,
    ) -> Result<Registration, SourceError>;
}

/// Live location updates.
pub trait LocationSource: Send + Sync {
    /// Start delivering fixes matching `request` to `sink`.
    fn request_updates(
        &self,
        request: &LocationRequest,
        sink: SampleSink<LocationFix>,
    ) -> Result<Registration, SourceError>;
}

/// Location permissions requested together in one platform call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationPermission {
    Coarse,
    Fine,
}

/// Result of a permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PermissionGrants {
    pub coarse: bool,
    pub fine: bool,
}

/// Platform permission dialog.
pub trait PermissionPlatform: Send + Sync {
    /// Ask for all `permissions` at once. Dropping the sender without an
    /// answer cancels the request.
    fn request_permissions(
        &self,
        permissions: &[LocationPermission],
    ) -> oneshot::Receiver<PermissionGrants>;
}

/// Result of validating device settings against a location request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsCheck {
    /// Settings already satisfy the request
    Satisfied,
    /// Settings can be fixed by prompting the user
    Resolvable,
    /// Settings cannot satisfy the request
    Unresolvable,
}

/// Platform location-settings check and resolution prompt.
pub trait SettingsPlatform: Send + Sync {
    /// Validate current device settings against `request`.
    fn check_settings(&self, request: &LocationRequest) -> oneshot::Receiver<SettingsCheck>;

    /// Prompt the user to fix the settings. Resolves to true if the user
    /// accepted the change.
    fn start_resolution(
        &self,
        request: &LocationRequest,
    ) -> Result<oneshot::Receiver<bool>, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_registration_releases_once() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        let registration = Registration::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        registration.release();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_registration_releases_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        {
            let _registration = Registration::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_sink_drops_when_full() {
        let (sink, mut receiver) = sample_channel::<u32>(2);
        assert!(sink.push(1));
        assert!(sink.push(2));
        assert!(!sink.push(3));

        assert_eq!(receiver.try_recv().ok(), Some(1));
        assert_eq!(receiver.try_recv().ok(), Some(2));
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_sink_reports_closed_receiver() {
        let (sink, receiver) = sample_channel::<u32>(4);
        drop(receiver);
        assert!(sink.is_closed());
        assert!(!sink.push(1));
    }
}
