//! Debouncing of per-frame classifications.
//!
//! A label is only reported once the last `consistency_frames` raw
//! predictions agree and the latest confidence clears the threshold.
//! Stability is re-evaluated on every frame: one disagreeing frame is
//! enough to drop back to an unstable reading.

use super::history::ClassHistory;
use super::{PredictionConfig, PredictionError};

/// Result of feeding one classification into the stabilizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observation {
    /// History is full, unanimous and the confidence clears the threshold.
    Stable { class_index: usize, confidence: f32 },
    /// Anything else; the raw values are passed through for diagnostics.
    Unstable { class_index: usize, confidence: f32 },
}

impl Observation {
    pub fn is_stable(&self) -> bool {
        matches!(self, Observation::Stable { .. })
    }
}

/// Last stable reading emitted by the stabilizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StableReading {
    pub class_index: usize,
    pub confidence: f32,
}

/// Rolling-window agreement check over raw classifier outputs.
///
/// Not reentrant: use one stabilizer per prediction stream.
pub struct PredictionStabilizer {
    history: ClassHistory,
    threshold: f32,
    /// Confidence of the most recent classification (0 after a failure).
    raw_confidence: f32,
    /// Whether the most recent observation was stable.
    stable: bool,
    last_stable: Option<StableReading>,
}

impl PredictionStabilizer {
    pub fn new(config: &PredictionConfig) -> Result<Self, PredictionError> {
        validate_threshold(config.confidence_threshold)?;
        if config.consistency_frames == 0 {
            return Err(PredictionError::InvalidWindow);
        }
        Ok(Self {
            history: ClassHistory::new(config.consistency_frames),
            threshold: config.confidence_threshold,
            raw_confidence: 0.0,
            stable: false,
            last_stable: None,
        })
    }

    /// Records one raw classification and re-evaluates stability.
    pub fn observe(&mut self, class_index: usize, confidence: f32) -> Observation {
        self.history.push(class_index);
        self.raw_confidence = confidence;

        let agreed = self.history.unanimous() == Some(class_index);
        let was_stable = self.stable;
        self.stable = agreed && confidence > self.threshold;

        if self.stable {
            if !was_stable {
                tracing::debug!(class_index, confidence, "Prediction became stable");
            }
            self.last_stable = Some(StableReading {
                class_index,
                confidence,
            });
            Observation::Stable {
                class_index,
                confidence,
            }
        } else {
            if was_stable {
                tracing::debug!(class_index, confidence, "Prediction lost stability");
            }
            Observation::Unstable {
                class_index,
                confidence,
            }
        }
    }

    /// Records a frame whose classification failed.
    ///
    /// History is left untouched so the failure cannot count towards or
    /// against agreement.
    pub fn reject(&mut self) {
        self.raw_confidence = 0.0;
        self.stable = false;
    }

    /// Clears history and all emitted state.
    pub fn reset(&mut self) {
        self.history.clear();
        self.raw_confidence = 0.0;
        self.stable = false;
        self.last_stable = None;
    }

    /// Whether the most recent observation was stable.
    pub fn is_stable(&self) -> bool {
        self.stable
    }

    pub fn raw_confidence(&self) -> f32 {
        self.raw_confidence
    }

    /// The last stable reading, even if stability has since been lost.
    pub fn last_stable(&self) -> Option<StableReading> {
        self.last_stable
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Changes the confidence threshold for subsequent frames.
    pub fn set_threshold(&mut self, threshold: f32) -> Result<(), PredictionError> {
        validate_threshold(threshold)?;
        self.threshold = threshold;
        Ok(())
    }

    pub fn history(&self) -> &ClassHistory {
        &self.history
    }
}

fn validate_threshold(threshold: f32) -> Result<(), PredictionError> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(PredictionError::InvalidThreshold(threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stabilizer(frames: usize, threshold: f32) -> PredictionStabilizer {
        PredictionStabilizer::new(&PredictionConfig {
            confidence_threshold: threshold,
            consistency_frames: frames,
        })
        .unwrap()
    }

    #[test]
    fn test_stable_after_consistent_window() {
        let mut s = stabilizer(3, 0.8);

        assert!(!s.observe(2, 0.95).is_stable());
        assert!(!s.observe(2, 0.95).is_stable());
        assert_eq!(
            s.observe(2, 0.95),
            Observation::Stable {
                class_index: 2,
                confidence: 0.95
            }
        );

        // one disagreeing frame drops stability immediately
        assert_eq!(
            s.observe(5, 0.99),
            Observation::Unstable {
                class_index: 5,
                confidence: 0.99
            }
        );
        assert!(!s.is_stable());
        assert_eq!(
            s.last_stable(),
            Some(StableReading {
                class_index: 2,
                confidence: 0.95
            })
        );
    }

    #[test]
    fn test_threshold_is_strict() {
        let mut s = stabilizer(2, 0.8);
        s.observe(1, 0.8);
        assert!(!s.observe(1, 0.8).is_stable());
        assert!(s.observe(1, 0.81).is_stable());
    }

    #[test]
    fn test_low_confidence_latest_frame_is_unstable() {
        let mut s = stabilizer(3, 0.8);
        s.observe(0, 0.9);
        s.observe(0, 0.9);
        assert!(!s.observe(0, 0.5).is_stable());
        assert_eq!(s.raw_confidence(), 0.5);
        assert!(s.observe(0, 0.9).is_stable());
    }

    #[test]
    fn test_reject_keeps_history() {
        let mut s = stabilizer(3, 0.8);
        s.observe(4, 0.9);
        s.observe(4, 0.9);
        s.reject();
        assert_eq!(s.raw_confidence(), 0.0);
        assert_eq!(s.history().len(), 2);

        // the failed frame did not break the run
        assert!(s.observe(4, 0.9).is_stable());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut s = stabilizer(2, 0.5);
        s.observe(1, 0.9);
        s.observe(1, 0.9);
        assert!(s.is_stable());

        s.reset();
        assert!(!s.is_stable());
        assert!(s.last_stable().is_none());
        assert!(s.history().is_empty());
        assert!(!s.observe(1, 0.9).is_stable());
    }

    #[test]
    fn test_threshold_validation() {
        let mut s = stabilizer(2, 0.5);
        assert!(s.set_threshold(0.95).is_ok());
        assert_eq!(s.threshold(), 0.95);
        assert!(matches!(
            s.set_threshold(1.2),
            Err(PredictionError::InvalidThreshold(_))
        ));
        assert!(PredictionStabilizer::new(&PredictionConfig {
            confidence_threshold: 0.8,
            consistency_frames: 0,
        })
        .is_err());
    }
}
