//! Shake classification.
//!
//! Two debouncing stages: readings are first grouped into short bursts
//! (enough readings, mostly accelerating), then a shake is reported once
//! several bursts follow each other closely.

use crate::config::ShakeConfig;
use crate::core::window::{OccurrenceCounter, TimedWindow, Timestamped};
use crate::core::Classifier;
use crate::source::SensorSample;

/// A completed shaking gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShakeEvent;

/// One thresholded accelerometer reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Reading {
    timestamp_ns: u64,
    accelerating: bool,
}

impl Timestamped for Reading {
    fn timestamp_ns(&self) -> u64 {
        self.timestamp_ns
    }
}

/// Burst and repetition state for one shake detector session.
#[derive(Debug, Clone)]
pub struct ShakeClassifier {
    threshold_squared: f64,
    min_readings: usize,
    accelerating_ratio: f64,
    readings: TimedWindow<Reading>,
    bursts: OccurrenceCounter,
}

impl ShakeClassifier {
    pub fn new(config: &ShakeConfig) -> Self {
        Self {
            threshold_squared: config.acceleration_threshold * config.acceleration_threshold,
            min_readings: config.min_readings,
            accelerating_ratio: config.accelerating_ratio,
            readings: TimedWindow::new(config.reading_retention.as_nanos() as u64),
            bursts: OccurrenceCounter::new(
                config.burst_retention.as_nanos() as u64,
                config.bursts_to_notify,
            ),
        }
    }

    /// Process one accelerometer sample.
    pub fn process(&mut self, sample: &SensorSample) -> Option<ShakeEvent> {
        self.readings.push(Reading {
            timestamp_ns: sample.timestamp_ns,
            accelerating: sample.magnitude_squared() > self.threshold_squared,
        });

        if !self.is_burst() {
            return None;
        }

        self.readings.clear();
        if self.bursts.record(sample.timestamp_ns) {
            Some(ShakeEvent)
        } else {
            None
        }
    }

    fn is_burst(&self) -> bool {
        let total = self.readings.len();
        if total < self.min_readings {
            return false;
        }
        let accelerating = self.readings.count_where(|r| r.accelerating);
        accelerating as f64 / total as f64 >= self.accelerating_ratio
    }

    /// Readings currently in the burst window.
    pub fn buffered_readings(&self) -> usize {
        self.readings.len()
    }

    /// Bursts counted towards the next shake.
    pub fn pending_bursts(&self) -> usize {
        self.bursts.pending()
    }
}

impl Classifier<SensorSample> for ShakeClassifier {
    type Event = ShakeEvent;

    fn classify(&mut self, sample: &SensorSample) -> Option<ShakeEvent> {
        self.process(sample)
    }
}
