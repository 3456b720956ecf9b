use anyhow::{ensure, Result};
use std::collections::VecDeque;

/// Display-side statistics over successive loudness readings.
///
/// Keeps an exponentially smoothed level plus a rolling window of recent
/// smoothed values for averaging, and the loudest level seen since the
/// last reset. Raw readings stay untouched; this only shapes what gets
/// shown.
pub struct LevelTracker {
    smoothing: f32,
    smoothed: Option<f32>,
    history: VecDeque<f32>,
    history_len: usize,
    peak: Option<f32>,
}

impl LevelTracker {
    /// `smoothing` is the weight of the previous level, `0.0` meaning no
    /// smoothing at all.
    pub fn new(smoothing: f32, history_len: usize) -> Result<Self> {
        ensure!(
            (0.0..1.0).contains(&smoothing),
            "smoothing factor must be at least 0.0 and below 1.0, got {}",
            smoothing
        );
        ensure!(history_len > 0, "history length must be at least 1");
        Ok(Self {
            smoothing,
            smoothed: None,
            history: VecDeque::with_capacity(history_len),
            history_len,
            peak: None,
        })
    }

    /// Folds in a new reading and returns the smoothed level.
    ///
    /// The first reading seeds the smoothed level directly so the meter
    /// does not ramp up from an artificial floor.
    pub fn update(&mut self, db: f32) -> f32 {
        let smoothed = match self.smoothed {
            Some(prev) => prev * self.smoothing + db * (1.0 - self.smoothing),
            None => db,
        };
        self.smoothed = Some(smoothed);

        self.history.push_back(smoothed);
        if self.history.len() > self.history_len {
            self.history.pop_front();
        }

        self.peak = Some(match self.peak {
            Some(peak) => peak.max(smoothed),
            None => smoothed,
        });

        smoothed
    }

    pub fn smoothed(&self) -> Option<f32> {
        self.smoothed
    }

    /// Mean of the smoothed levels currently in the history window.
    pub fn average(&self) -> Option<f32> {
        if self.history.is_empty() {
            return None;
        }
        Some(self.history.iter().sum::<f32>() / self.history.len() as f32)
    }

    /// Loudest smoothed level since construction or the last reset.
    pub fn peak(&self) -> Option<f32> {
        self.peak
    }

    /// Clears the history and the peak. The smoothed level is kept so
    /// the displayed meter does not jump after a reset.
    pub fn reset(&mut self) {
        self.history.clear();
        self.peak = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(LevelTracker::new(-0.1, 50).is_err());
        assert!(LevelTracker::new(1.0, 50).is_err());
        assert!(LevelTracker::new(0.3, 0).is_err());
        assert!(LevelTracker::new(0.0, 1).is_ok());
    }

    #[test]
    fn test_first_reading_seeds_the_level() {
        let mut tracker = LevelTracker::new(0.3, 50).unwrap();
        assert_eq!(tracker.smoothed(), None);
        assert_eq!(tracker.update(-10.0), -10.0);
    }

    #[test]
    fn test_smoothing_weights_previous_level() {
        let mut tracker = LevelTracker::new(0.3, 50).unwrap();
        tracker.update(-10.0);
        let level = tracker.update(-20.0);
        // 0.3 * -10 + 0.7 * -20
        assert!((level + 17.0).abs() < 1e-4, "expected -17.0, got {}", level);
    }

    #[test]
    fn test_zero_smoothing_passes_readings_through() {
        let mut tracker = LevelTracker::new(0.0, 50).unwrap();
        tracker.update(-40.0);
        assert_eq!(tracker.update(-3.5), -3.5);
    }

    #[test]
    fn test_average_over_history() {
        let mut tracker = LevelTracker::new(0.0, 50).unwrap();
        assert_eq!(tracker.average(), None);
        tracker.update(-10.0);
        tracker.update(-20.0);
        tracker.update(-30.0);
        let avg = tracker.average().unwrap();
        assert!((avg + 20.0).abs() < 1e-4, "expected -20.0, got {}", avg);
    }

    #[test]
    fn test_history_is_capped() {
        let mut tracker = LevelTracker::new(0.0, 3).unwrap();
        for db in [-50.0, -40.0, -30.0, -20.0, -10.0] {
            tracker.update(db);
        }
        // Only the newest three readings remain.
        let avg = tracker.average().unwrap();
        assert!((avg + 20.0).abs() < 1e-4, "expected -20.0, got {}", avg);
    }

    #[test]
    fn test_peak_tracks_the_loudest_level() {
        let mut tracker = LevelTracker::new(0.0, 50).unwrap();
        tracker.update(-42.0);
        tracker.update(-12.5);
        tracker.update(-60.0);
        assert_eq!(tracker.peak(), Some(-12.5));
    }

    #[test]
    fn test_reset_clears_statistics_but_keeps_the_level() {
        let mut tracker = LevelTracker::new(0.3, 50).unwrap();
        tracker.update(-10.0);
        tracker.update(-20.0);
        tracker.reset();

        assert_eq!(tracker.average(), None);
        assert_eq!(tracker.peak(), None);
        assert!(tracker.smoothed().is_some(), "smoothed level survives a reset");
    }
}
