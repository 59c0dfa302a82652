//! Sensor Remote - motion and location gestures for a media player.
//!
//! This library turns live accelerometer, gyroscope and location samples into
//! player commands:
//!
//! - **Shake** the device to pause playback
//! - **Tilt** around the X axis to step the volume, around the Z axis to seek
//! - **Walk away** from the last checkpoint to replay from the start
//!
//! Location tracking only starts after the permission gate and then the
//! settings gate have both granted.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          Sensor Remote                            │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  accelerometer ──▶ ShakeDetector ─────────┐                       │
//! │  gyroscope ──────▶ RotationDetector ──────┼──▶ Coordinator ──▶ commands
//! │  Permission ─▶ Settings ─▶ LocationChange ┘         │             │
//! │       (gates)                Detector                ▼             │
//! │                                                   errors          │
//! │                                            ┌─────────────┐        │
//! │                                            │ Activity Log │        │
//! │                                            └─────────────┘        │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sensor_remote::config::Config;
//! use sensor_remote::detector::{LocationChangeDetector, RotationDetector, ShakeDetector};
//! use sensor_remote::source::scripted::{
//!     ScriptedLocationSource, ScriptedPermissions, ScriptedSensorSource, ScriptedSettings,
//! };
//! use sensor_remote::Coordinator;
//!
//! # async fn run() {
//! let config = Config::default();
//! let sensors = Arc::new(ScriptedSensorSource::new());
//!
//! let mut coordinator = Coordinator::new(
//!     ShakeDetector::new(sensors.clone(), config.shake.clone()),
//!     RotationDetector::new(sensors, config.rotation.clone()),
//!     LocationChangeDetector::new(
//!         Arc::new(ScriptedPermissions::granting()),
//!         Arc::new(ScriptedSettings::satisfied()),
//!         Arc::new(ScriptedLocationSource::new()),
//!         config.location.clone(),
//!     ),
//!     config.coordinator.clone(),
//! );
//!
//! let mut streams = coordinator.start();
//! while let Some(command) = streams.commands.recv().await {
//!     println!("{command}");
//! }
//! # }
//! ```

pub mod activity;
pub mod config;
pub mod coordinator;
pub mod core;
pub mod detector;
pub mod error;
pub mod gate;
pub mod source;

// Re-export key types at crate root for convenience
pub use activity::{ActivityLog, ActivityStats, SharedActivityLog};
pub use config::Config;
pub use coordinator::{Coordinator, Player, PlayerCommand, RemoteEvent, RemoteStreams};
pub use crate::core::{LocationEvent, RotationEvent, ShakeEvent};
pub use detector::{
    DetectorMessage, EventStream, LocationChangeDetector, RotationDetector, ShakeDetector,
};
pub use error::{DetectorError, SourceError};
pub use gate::GateOutcome;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Gesture guide that can be displayed to users.
pub const GESTURE_GUIDE: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║                SENSOR REMOTE - GESTURE GUIDE                     ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  Playback starts on its own 4 seconds after the remote starts.   ║
║                                                                  ║
║  ✓ GESTURES:                                                     ║
║    • Shake the device firmly a few times    → pause              ║
║    • Tilt forward / backward (X axis)       → volume up / down   ║
║      (faster tilts take bigger steps)                            ║
║    • Twist left / right (Z axis)            → seek back / ahead  ║
║    • Walk more than 10 m from where you were → replay from start ║
║                                                                  ║
║  ✓ LOCATION NEEDS:                                               ║
║    • Both coarse and precise location permission                 ║
║    • Device location settings set to high accuracy               ║
║                                                                  ║
║  Shaking and tilting keep working even if location is refused.   ║
║                                                                  ║
║  You can view session statistics anytime with:                   ║
║    sensor-remote status                                          ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gesture_guide_contents() {
        assert!(GESTURE_GUIDE.contains("GESTURE GUIDE"));
        assert!(GESTURE_GUIDE.contains("pause"));
        assert!(GESTURE_GUIDE.contains("replay from start"));
    }
}
