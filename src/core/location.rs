//! Location change analysis.
//!
//! A fix has to pass two filters before it is compared with the checkpoint:
//! its accuracy radius must be small enough, and the speed implied by the
//! previous fix must be plausible for someone on foot. The checkpoint only
//! moves when a fix that passed both filters is far enough away from it.

use crate::config::LocationConfig;
use crate::core::Classifier;
use crate::source::LocationFix;

/// The tracked subject moved past the checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationEvent;

/// What happened to a single fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixVerdict {
    /// Accuracy radius above the threshold
    Inaccurate,
    /// Missing bearing/speed, no previous fix, or an implausible jump
    Noise,
    /// First accepted fix, adopted as the checkpoint
    CheckpointSet,
    /// Accepted fix closer to the checkpoint than the threshold
    Stationary { distance_m: f64 },
    /// Accepted fix past the threshold; checkpoint replaced
    Moved { distance_m: f64 },
}

/// Checkpoint state for one location detector session.
#[derive(Debug, Clone)]
pub struct LocationAnalyzer {
    config: LocationConfig,
    previous: Option<LocationFix>,
    checkpoint: Option<LocationFix>,
}

impl LocationAnalyzer {
    pub fn new(config: &LocationConfig) -> Self {
        Self {
            config: config.clone(),
            previous: None,
            checkpoint: None,
        }
    }

    /// Analyze one fix. The previous fix is always replaced, whatever the
    /// verdict.
    pub fn analyze(&mut self, fix: &LocationFix) -> FixVerdict {
        let verdict = self.judge(fix);
        self.previous = Some(*fix);
        verdict
    }

    fn judge(&mut self, fix: &LocationFix) -> FixVerdict {
        if fix.accuracy > self.config.accuracy_threshold_m {
            return FixVerdict::Inaccurate;
        }
        if self.is_unexpected_jump(fix) {
            return FixVerdict::Noise;
        }

        let checkpoint = match self.checkpoint {
            Some(checkpoint) => checkpoint,
            None => {
                self.checkpoint = Some(*fix);
                return FixVerdict::CheckpointSet;
            }
        };

        let distance_m = fix.distance_to(&checkpoint);
        if distance_m >= self.config.distance_threshold_m {
            self.checkpoint = Some(*fix);
            FixVerdict::Moved { distance_m }
        } else {
            FixVerdict::Stationary { distance_m }
        }
    }

    fn is_unexpected_jump(&self, fix: &LocationFix) -> bool {
        if fix.bearing == 0.0 || fix.speed == 0.0 {
            return true;
        }
        let previous = match self.previous {
            Some(previous) => previous,
            None => return true,
        };

        let seconds = fix.seconds_since(&previous);
        if seconds <= 0.0 {
            return true;
        }
        fix.distance_to(&previous) / seconds > self.config.max_speed_mps
    }

    /// The current checkpoint, if one has been established.
    pub fn checkpoint(&self) -> Option<&LocationFix> {
        self.checkpoint.as_ref()
    }

    /// The most recent fix seen, accepted or not.
    pub fn previous(&self) -> Option<&LocationFix> {
        self.previous.as_ref()
    }
}

impl Classifier<LocationFix> for LocationAnalyzer {
    type Event = LocationEvent;

    fn classify(&mut self, fix: &LocationFix) -> Option<LocationEvent> {
        match self.analyze(fix) {
            FixVerdict::Moved { distance_m } => {
                tracing::debug!("Moved {:.1} m past checkpoint", distance_m);
                Some(LocationEvent)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Meters per degree of latitude on the mean-radius sphere.
    const METERS_PER_DEGREE: f64 = 111_195.08;

    /// A good fix `north_m` meters north of the origin at `seconds`.
    fn fix(north_m: f64, seconds: i64) -> LocationFix {
        LocationFix {
            latitude: north_m / METERS_PER_DEGREE,
            longitude: 0.0,
            accuracy: 5.0,
            bearing: 10.0,
            speed: 1.0,
            timestamp_ms: seconds * 1000,
        }
    }

    #[test]
    fn test_first_fix_is_noise() {
        let mut analyzer = LocationAnalyzer::new(&LocationConfig::default());
        assert_eq!(analyzer.analyze(&fix(0.0, 0)), FixVerdict::Noise);
        assert!(analyzer.checkpoint().is_none());
        assert!(analyzer.previous().is_some());
    }

    #[test]
    fn test_walk_sets_checkpoint_then_moves() {
        let mut analyzer = LocationAnalyzer::new(&LocationConfig::default());
        assert_eq!(analyzer.analyze(&fix(0.0, 0)), FixVerdict::Noise);
        // 15 m in 10 s is 1.5 m/s
        assert_eq!(analyzer.analyze(&fix(15.0, 10)), FixVerdict::CheckpointSet);
        assert!(matches!(
            analyzer.analyze(&fix(30.0, 20)),
            FixVerdict::Moved { distance_m } if (distance_m - 15.0).abs() < 0.1
        ));
        let checkpoint = analyzer.checkpoint().expect("checkpoint");
        assert_eq!(checkpoint.timestamp_ms, 20_000);
    }

    #[test]
    fn test_fast_jump_is_rejected() {
        let mut analyzer = LocationAnalyzer::new(&LocationConfig::default());
        analyzer.analyze(&fix(0.0, 0));
        analyzer.analyze(&fix(15.0, 10));
        // 15 m in 1 s is 15 m/s
        assert_eq!(analyzer.analyze(&fix(30.0, 11)), FixVerdict::Noise);
        assert_eq!(analyzer.checkpoint().map(|c| c.timestamp_ms), Some(10_000));
    }

    #[test]
    fn test_inaccurate_fix_only_updates_previous() {
        let mut analyzer = LocationAnalyzer::new(&LocationConfig::default());
        analyzer.analyze(&fix(0.0, 0));
        analyzer.analyze(&fix(15.0, 10));

        let mut blurry = fix(40.0, 20);
        blurry.accuracy = 18.5;
        assert_eq!(analyzer.analyze(&blurry), FixVerdict::Inaccurate);
        assert_eq!(analyzer.checkpoint().map(|c| c.timestamp_ms), Some(10_000));
        assert_eq!(analyzer.previous().map(|p| p.timestamp_ms), Some(20_000));
    }

    #[test]
    fn test_accuracy_at_threshold_is_accepted() {
        let mut analyzer = LocationAnalyzer::new(&LocationConfig::default());
        analyzer.analyze(&fix(0.0, 0));
        let mut edge = fix(15.0, 10);
        edge.accuracy = 18.0;
        assert_eq!(analyzer.analyze(&edge), FixVerdict::CheckpointSet);
    }

    #[test]
    fn test_missing_bearing_or_speed_is_noise() {
        let mut analyzer = LocationAnalyzer::new(&LocationConfig::default());
        analyzer.analyze(&fix(0.0, 0));

        let mut no_bearing = fix(5.0, 10);
        no_bearing.bearing = 0.0;
        assert_eq!(analyzer.analyze(&no_bearing), FixVerdict::Noise);

        let mut no_speed = fix(10.0, 20);
        no_speed.speed = 0.0;
        assert_eq!(analyzer.analyze(&no_speed), FixVerdict::Noise);
        assert!(analyzer.checkpoint().is_none());
    }

    #[test]
    fn test_small_displacement_keeps_checkpoint() {
        let mut analyzer = LocationAnalyzer::new(&LocationConfig::default());
        analyzer.analyze(&fix(0.0, 0));
        analyzer.analyze(&fix(5.0, 5));
        assert!(matches!(
            analyzer.analyze(&fix(12.0, 10)),
            FixVerdict::Stationary { .. }
        ));
        assert_eq!(analyzer.checkpoint().map(|c| c.timestamp_ms), Some(5_000));
    }

    #[test]
    fn test_non_increasing_time_is_noise() {
        let mut analyzer = LocationAnalyzer::new(&LocationConfig::default());
        analyzer.analyze(&fix(0.0, 10));
        assert_eq!(analyzer.analyze(&fix(1.0, 10)), FixVerdict::Noise);
    }

    #[test]
    fn test_classify_emits_only_on_move() {
        let mut analyzer = LocationAnalyzer::new(&LocationConfig::default());
        assert!(analyzer.classify(&fix(0.0, 0)).is_none());
        assert!(analyzer.classify(&fix(15.0, 10)).is_none());
        assert_eq!(analyzer.classify(&fix(30.0, 20)), Some(LocationEvent));
    }
}
