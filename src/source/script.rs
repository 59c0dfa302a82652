//! Recorded session scripts.
//!
//! A script is a JSON Lines file, one entry per line:
//!
//! ```text
//! {"accelerometer": {"timestamp_ns": 0, "axes": [10.0, 10.0, 5.0]}}
//! {"gyroscope": {"timestamp_ns": 0, "axes": [0.9, 0.1, 0.05]}}
//! {"location": {"latitude": 0.0, "longitude": 0.0, "accuracy": 5.0, "bearing": 10.0, "speed": 1.0, "timestamp_ms": 0}}
//! {"wait": {"ms": 4000}}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Replaying pushes the
//! entries into the scripted sources in order, as the platform callbacks would.

use crate::source::scripted::{ScriptedLocationSource, ScriptedSensorSource};
use crate::source::{LocationFix, SensorKind, SensorSample};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// One line of a session script.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptEntry {
    Accelerometer(SensorSample),
    Gyroscope(SensorSample),
    Location(LocationFix),
    /// Pause the replay
    Wait { ms: u64 },
}

/// Script loading errors.
#[derive(Debug)]
pub enum ScriptError {
    IoError(String),
    ParseError { line: usize, message: String },
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptError::IoError(e) => write!(f, "IO error: {e}"),
            ScriptError::ParseError { line, message } => {
                write!(f, "Parse error on line {line}: {message}")
            }
        }
    }
}

impl std::error::Error for ScriptError {}

/// Parse a script from JSON Lines text.
pub fn parse_script(text: &str) -> Result<Vec<ScriptEntry>, ScriptError> {
    let mut entries = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let entry = serde_json::from_str(line).map_err(|e| ScriptError::ParseError {
            line: index + 1,
            message: e.to_string(),
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

/// Load a script file.
pub fn load_script(path: &Path) -> Result<Vec<ScriptEntry>, ScriptError> {
    let text = std::fs::read_to_string(path).map_err(|e| ScriptError::IoError(e.to_string()))?;
    parse_script(&text)
}

/// What happened during a replay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Samples and fixes a listener accepted
    pub delivered: usize,
    /// Samples and fixes nobody was listening for, or that overflowed
    pub dropped: usize,
    /// Total time spent in wait entries
    pub waited_ms: u64,
}

/// Push `entries` into the scripted sources. Stops early when `running` is
/// cleared.
pub async fn replay(
    entries: &[ScriptEntry],
    sensors: &ScriptedSensorSource,
    location: &ScriptedLocationSource,
    running: &AtomicBool,
) -> ReplayStats {
    let mut stats = ReplayStats::default();

    for entry in entries {
        if !running.load(Ordering::SeqCst) {
            tracing::info!("Replay interrupted");
            break;
        }

        let delivered = match *entry {
            ScriptEntry::Accelerometer(sample) => sensors.emit(SensorKind::Accelerometer, sample),
            ScriptEntry::Gyroscope(sample) => sensors.emit(SensorKind::Gyroscope, sample),
            ScriptEntry::Location(fix) => location.emit(fix),
            ScriptEntry::Wait { ms } => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                stats.waited_ms += ms;
                continue;
            }
        };

        if delivered {
            stats.delivered += 1;
        } else {
            stats.dropped += 1;
        }
        // Let the detector tasks drain their channels
        tokio::task::yield_now().await;
    }

    tracing::debug!("Replay finished: {:?}", stats);
    stats
}
