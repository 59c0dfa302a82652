//! Sample types produced by the platform sources.
//!
//! Samples are ephemeral: each one is handed to exactly one detector and
//! dropped once classified.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Mean Earth radius in meters, used for fix-to-fix distances.
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Kind of motion sensor a detector subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Accelerometer,
    Gyroscope,
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorKind::Accelerometer => write!(f, "accelerometer"),
            SensorKind::Gyroscope => write!(f, "gyroscope"),
        }
    }
}

/// A raw three-axis motion sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    /// Monotonic timestamp in nanoseconds
    pub timestamp_ns: u64,
    /// Axis values (m/s² for the accelerometer, rad/s for the gyroscope)
    pub axes: [f64; 3],
}

impl SensorSample {
    pub fn new(timestamp_ns: u64, x: f64, y: f64, z: f64) -> Self {
        Self {
            timestamp_ns,
            axes: [x, y, z],
        }
    }

    /// Squared Euclidean magnitude of the sample.
    pub fn magnitude_squared(&self) -> f64 {
        self.axes.iter().map(|v| v * v).sum()
    }
}

/// A single location fix reported by the location source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Estimated horizontal accuracy radius in meters
    pub accuracy: f32,
    /// Bearing in degrees; exactly 0 means the platform has no bearing
    pub bearing: f32,
    /// Ground speed in m/s; exactly 0 means the platform has no speed
    pub speed: f32,
    /// Wall-clock time of the fix in milliseconds
    pub timestamp_ms: i64,
}

impl LocationFix {
    /// Great-circle distance to another fix in meters.
    pub fn distance_to(&self, other: &LocationFix) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
    }

    /// Seconds elapsed since an earlier fix (negative if `earlier` is newer).
    pub fn seconds_since(&self, earlier: &LocationFix) -> f64 {
        self.timestamp_ms.saturating_sub(earlier.timestamp_ms) as f64 / 1000.0
    }
}

/// Accuracy/power trade-off requested from the location source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    HighAccuracy,
    Balanced,
    LowPower,
}

/// Location request descriptor, validated by the settings gate and then used
/// to start live updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationRequest {
    pub interval: Duration,
    pub fastest_interval: Duration,
    pub priority: Priority,
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            fastest_interval: Duration::from_millis(1000),
            priority: Priority::HighAccuracy,
        }
    }
}
