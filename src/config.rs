//! Configuration for the sensor remote.
//!
//! Thresholds are read once when detectors are constructed; changing the file
//! only affects detectors built afterwards.

use crate::source::{LocationRequest, Priority};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub shake: ShakeConfig,
    pub rotation: RotationConfig,
    pub location: LocationConfig,
    pub coordinator: CoordinatorConfig,

    /// Path for storing session statistics
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shake: ShakeConfig::default(),
            rotation: RotationConfig::default(),
            location: LocationConfig::default(),
            coordinator: CoordinatorConfig::default(),
            data_path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("sensor-remote"),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sensor-remote")
            .join("config.json")
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }
}

/// Shake detection thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShakeConfig {
    /// Acceleration magnitude (m/s²) above which a reading counts as accelerating
    pub acceleration_threshold: f64,
    /// How long readings stay in the burst window
    #[serde(with = "duration_ms")]
    pub reading_retention: Duration,
    /// Minimum readings in the window before a burst can be recognised
    pub min_readings: usize,
    /// Fraction of accelerating readings that makes a burst
    pub accelerating_ratio: f64,
    /// How long bursts are remembered while counting repetitions
    #[serde(with = "duration_ms")]
    pub burst_retention: Duration,
    /// Bursts needed inside the retention span to report a shake
    pub bursts_to_notify: usize,
    /// Capacity of the sample channel between the sensor and the detector
    pub sample_buffer: usize,
}

impl Default for ShakeConfig {
    fn default() -> Self {
        Self {
            acceleration_threshold: 12.0,
            reading_retention: Duration::from_millis(500),
            min_readings: 10,
            accelerating_ratio: 0.5,
            burst_retention: Duration::from_millis(1200),
            bursts_to_notify: 3,
            sample_buffer: 1024,
        }
    }
}

/// Rotation detection thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// Gyroscope samples averaged per window
    pub window_size: usize,
    /// Minimum absolute mean angular velocity (rad/s) to report
    pub magnitude_threshold: f64,
    pub sample_buffer: usize,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            magnitude_threshold: 0.5,
            sample_buffer: 1024,
        }
    }
}

/// Location change detection thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Fixes with a worse accuracy radius (meters) are ignored
    pub accuracy_threshold_m: f32,
    /// Displacement from the checkpoint (meters) that counts as moving away
    pub distance_threshold_m: f64,
    /// Implied speeds above this (m/s) are treated as GPS jumps
    pub max_speed_mps: f64,
    /// Requested update interval
    #[serde(with = "duration_ms")]
    pub update_interval: Duration,
    /// Fastest update interval the detector accepts
    #[serde(with = "duration_ms")]
    pub fastest_update_interval: Duration,
    pub sample_buffer: usize,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            accuracy_threshold_m: 18.0,
            distance_threshold_m: 10.0,
            max_speed_mps: 2.8,
            update_interval: Duration::from_millis(2000),
            fastest_update_interval: Duration::from_millis(1000),
            sample_buffer: 64,
        }
    }
}

impl LocationConfig {
    /// The high-accuracy request validated by the settings gate and used for
    /// live updates.
    pub fn location_request(&self) -> LocationRequest {
        LocationRequest {
            interval: self.update_interval,
            fastest_interval: self.fastest_update_interval,
            priority: Priority::HighAccuracy,
        }
    }
}

/// Coordinator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Delay between activation and the first play command
    #[serde(with = "duration_ms")]
    pub initial_delay: Duration,
    /// Capacity of the command and error channels
    pub event_buffer: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(4000),
            event_buffer: 64,
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration as whole milliseconds.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
