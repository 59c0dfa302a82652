//! Rotation classification over non-overlapping gyroscope windows.

use crate::config::RotationConfig;
use crate::core::window::BatchWindow;
use crate::core::Classifier;
use crate::source::SensorSample;
use serde::{Deserialize, Serialize};

/// A sustained rotation around one axis, carrying the mean angular velocity.
///
/// X drives volume, Z drives seeking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RotationEvent {
    AxisX(f64),
    AxisZ(f64),
}

/// Averages fixed-size gyroscope windows and reports the dominant axis.
#[derive(Debug, Clone)]
pub struct RotationClassifier {
    window: BatchWindow<[f64; 3]>,
    magnitude_threshold: f64,
}

impl RotationClassifier {
    pub fn new(config: &RotationConfig) -> Self {
        Self {
            window: BatchWindow::new(config.window_size),
            magnitude_threshold: config.magnitude_threshold,
        }
    }

    /// Process one gyroscope sample.
    pub fn process(&mut self, sample: &SensorSample) -> Option<RotationEvent> {
        let batch = self.window.push(sample.axes)?;
        let [x, y, z] = axis_means(&batch);
        classify_means(x, y, z, self.magnitude_threshold)
    }

    /// Samples waiting for the current window to fill.
    pub fn buffered_samples(&self) -> usize {
        self.window.len()
    }
}

impl Classifier<SensorSample> for RotationClassifier {
    type Event = RotationEvent;

    fn classify(&mut self, sample: &SensorSample) -> Option<RotationEvent> {
        self.process(sample)
    }
}

/// Arithmetic mean of each axis.
fn axis_means(batch: &[[f64; 3]]) -> [f64; 3] {
    if batch.is_empty() {
        return [0.0; 3];
    }
    let n = batch.len() as f64;
    let mut sums = [0.0; 3];
    for axes in batch {
        for (sum, value) in sums.iter_mut().zip(axes) {
            *sum += value;
        }
    }
    sums.map(|sum| sum / n)
}

/// Pick the axis whose magnitude strictly exceeds both others, if it clears
/// the threshold. Only X and Z are reported.
fn classify_means(x: f64, y: f64, z: f64, threshold: f64) -> Option<RotationEvent> {
    let (ax, ay, az) = (x.abs(), y.abs(), z.abs());

    if ax > ay && ax > az && ax >= threshold {
        Some(RotationEvent::AxisX(x))
    } else if az > ax && az > ay && az >= threshold {
        Some(RotationEvent::AxisZ(z))
    } else {
        None
    }
}
