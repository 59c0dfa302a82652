//! Session activity log.
//!
//! Counts what the remote saw and did during a session. Only counts are kept:
//! no sensor values and no coordinates.

use crate::error::DetectorError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Activity statistics for the current session.
#[derive(Debug)]
pub struct ActivityLog {
    /// Shake gestures recognised
    shake_events: AtomicU64,
    /// Rotation windows that produced an event
    rotation_events: AtomicU64,
    /// Checkpoints left behind
    location_events: AtomicU64,
    /// Player commands emitted
    commands_emitted: AtomicU64,
    /// Detector failures reported
    errors_reported: AtomicU64,
    session_id: Uuid,
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self {
            shake_events: AtomicU64::new(0),
            rotation_events: AtomicU64::new(0),
            location_events: AtomicU64::new(0),
            commands_emitted: AtomicU64::new(0),
            errors_reported: AtomicU64::new(0),
            session_id: Uuid::new_v4(),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create an activity log that adds to the totals stored at `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            tracing::warn!("Could not load previous activity stats: {}", e);
        }

        log
    }

    pub fn record_shake(&self) {
        self.shake_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rotation(&self) {
        self.rotation_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_location_change(&self) {
        self.location_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Record `count` emitted player commands.
    pub fn record_commands(&self, count: u64) {
        self.commands_emitted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_error(&self, error: DetectorError) {
        tracing::debug!("Recording detector error {:?}", error);
        self.errors_reported.fetch_add(1, Ordering::Relaxed);
    }

    /// Identifier of this session, used to correlate log lines.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Get the current statistics.
    pub fn stats(&self) -> ActivityStats {
        ActivityStats {
            session_id: self.session_id,
            shake_events: self.shake_events.load(Ordering::Relaxed),
            rotation_events: self.rotation_events.load(Ordering::Relaxed),
            location_events: self.location_events.load(Ordering::Relaxed),
            commands_emitted: self.commands_emitted.load(Ordering::Relaxed),
            errors_reported: self.errors_reported.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session {}:\n\
             - Shakes recognised: {}\n\
             - Rotations recognised: {}\n\
             - Checkpoints left: {}\n\
             - Player commands issued: {}\n\
             - Detector errors: {}\n\
             - Session duration: {} seconds",
            stats.session_id,
            stats.shake_events,
            stats.rotation_events,
            stats.location_events,
            stats.commands_emitted,
            stats.errors_reported,
            stats.session_duration_secs
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                shake_events: stats.shake_events,
                rotation_events: stats.rotation_events,
                location_events: stats.location_events,
                commands_emitted: stats.commands_emitted,
                errors_reported: stats.errors_reported,
                last_session: stats.session_id,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.shake_events
                    .store(persisted.shake_events, Ordering::Relaxed);
                self.rotation_events
                    .store(persisted.rotation_events, Ordering::Relaxed);
                self.location_events
                    .store(persisted.location_events, Ordering::Relaxed);
                self.commands_emitted
                    .store(persisted.commands_emitted, Ordering::Relaxed);
                self.errors_reported
                    .store(persisted.errors_reported, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of activity statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityStats {
    pub session_id: Uuid,
    pub shake_events: u64,
    pub rotation_events: u64,
    pub location_events: u64,
    pub commands_emitted: u64,
    pub errors_reported: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    shake_events: u64,
    rotation_events: u64,
    location_events: u64,
    commands_emitted: u64,
    errors_reported: u64,
    last_session: Uuid,
    last_updated: DateTime<Utc>,
}

/// Activity log shared between the coordinator task and its owner.
pub type SharedActivityLog = Arc<ActivityLog>;

pub fn create_shared_log() -> SharedActivityLog {
    Arc::new(ActivityLog::new())
}

pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedActivityLog {
    Arc::new(ActivityLog::with_persistence(path))
}
