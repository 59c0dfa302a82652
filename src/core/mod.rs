//! Core classification for the sensor remote.
//!
//! This module contains:
//! - Buffering primitives shared by the detectors
//! - The shake, rotation and location classifiers
//!
//! Classifiers are synchronous and own their buffers; the streaming layer in
//! [`crate::detector`] feeds them one sample at a time.

pub mod location;
pub mod rotation;
pub mod shake;
pub mod window;

// Re-export commonly used types
pub use location::{FixVerdict, LocationAnalyzer, LocationEvent};
pub use rotation::{RotationClassifier, RotationEvent};
pub use shake::{ShakeClassifier, ShakeEvent};
pub use window::{BatchWindow, OccurrenceCounter, TimedWindow, Timestamped};

/// Turns a stream of samples into discrete events.
pub trait Classifier<T>: Send + 'static {
    type Event: Send + std::fmt::Debug + 'static;

    /// Feed one sample. Returns at most one event.
    fn classify(&mut self, sample: &T) -> Option<Self::Event>;
}
