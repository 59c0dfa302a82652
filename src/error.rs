//! Error taxonomy surfaced by the detectors.
//!
//! Every detector failure is folded into one of the six [`DetectorError`]
//! kinds before it leaves the detector. Stopping a detector is not an error
//! and never produces one.

use crate::source::SensorKind;
use serde::{Deserialize, Serialize};

/// Closed set of failures reported on the coordinator's error stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectorError {
    AccelerometerUnavailable,
    GyroscopeUnavailable,
    LocationPermissionDenied,
    FineLocationDenied,
    LocationSettingsRejected,
    Unknown,
}

impl DetectorError {
    /// All error kinds, in display order.
    pub const ALL: [DetectorError; 6] = [
        DetectorError::AccelerometerUnavailable,
        DetectorError::GyroscopeUnavailable,
        DetectorError::LocationPermissionDenied,
        DetectorError::FineLocationDenied,
        DetectorError::LocationSettingsRejected,
        DetectorError::Unknown,
    ];

    /// The message shown to the user for this error.
    pub fn message(&self) -> &'static str {
        match self {
            DetectorError::AccelerometerUnavailable => {
                "This device has no accelerometer, so shaking to pause is not available."
            }
            DetectorError::GyroscopeUnavailable => {
                "This device has no gyroscope, so tilting to seek or change volume is not available."
            }
            DetectorError::LocationPermissionDenied => {
                "Location permission was not granted, so walking away will not replay the video."
            }
            DetectorError::FineLocationDenied => {
                "Precise location permission is required to detect when you move away."
            }
            DetectorError::LocationSettingsRejected => {
                "Location settings do not allow high-accuracy tracking."
            }
            DetectorError::Unknown => "Something went wrong while reading the sensors.",
        }
    }
}

impl std::fmt::Display for DetectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectorError::AccelerometerUnavailable => write!(f, "accelerometer unavailable"),
            DetectorError::GyroscopeUnavailable => write!(f, "gyroscope unavailable"),
            DetectorError::LocationPermissionDenied => write!(f, "location permission denied"),
            DetectorError::FineLocationDenied => write!(f, "fine location permission denied"),
            DetectorError::LocationSettingsRejected => write!(f, "location settings rejected"),
            DetectorError::Unknown => write!(f, "unknown detector failure"),
        }
    }
}

impl std::error::Error for DetectorError {}

/// Errors raised by platform sample sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The requested sensor does not exist on this device
    SensorUnavailable(SensorKind),
    /// The platform refused the listener registration
    RegistrationFailed(String),
    /// The settings resolution flow could not be started
    ResolutionUnavailable(String),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::SensorUnavailable(kind) => write!(f, "No {kind} on this device"),
            SourceError::RegistrationFailed(e) => write!(f, "Registration failed: {e}"),
            SourceError::ResolutionUnavailable(e) => {
                write!(f, "Settings resolution unavailable: {e}")
            }
        }
    }
}

impl std::error::Error for SourceError {}

impl From<SourceError> for DetectorError {
    fn from(error: SourceError) -> Self {
        match error {
            SourceError::SensorUnavailable(SensorKind::Accelerometer) => {
                DetectorError::AccelerometerUnavailable
            }
            SourceError::SensorUnavailable(SensorKind::Gyroscope) => {
                DetectorError::GyroscopeUnavailable
            }
            SourceError::ResolutionUnavailable(_) => DetectorError::LocationSettingsRejected,
            SourceError::RegistrationFailed(_) => DetectorError::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_kind_has_a_distinct_message() {
        let messages: HashSet<&str> = DetectorError::ALL.iter().map(|e| e.message()).collect();
        assert_eq!(messages.len(), DetectorError::ALL.len());
    }

    #[test]
    fn test_source_error_mapping() {
        assert_eq!(
            DetectorError::from(SourceError::SensorUnavailable(SensorKind::Accelerometer)),
            DetectorError::AccelerometerUnavailable
        );
        assert_eq!(
            DetectorError::from(SourceError::SensorUnavailable(SensorKind::Gyroscope)),
            DetectorError::GyroscopeUnavailable
        );
        assert_eq!(
            DetectorError::from(SourceError::RegistrationFailed("busy".to_string())),
            DetectorError::Unknown
        );
    }
}
