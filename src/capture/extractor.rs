//! Landmark extraction boundary.
//!
//! Detection itself is an external collaborator. The core only relies on
//! the contract that extraction never fails: when no hand is found the
//! extractor returns the zero sentinel.

use super::{CameraFrame, KeypointFrame, COORDS_PER_LANDMARK};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Turns camera frames into keypoint vectors.
pub trait LandmarkExtractor {
    /// Extracts keypoints from a frame; the zero frame means "no detection".
    fn extract(&mut self, frame: &CameraFrame) -> KeypointFrame;

    /// Width of every frame this extractor produces.
    fn keypoints_per_frame(&self) -> usize;
}

/// Deterministic synthetic hand landmarks.
///
/// Produces a pose per "gesture" with small seeded jitter, and drops a
/// configurable fraction of frames to the zero sentinel to mimic missed
/// detections.
pub struct MockExtractor {
    rng: ChaCha20Rng,
    keypoints: usize,
    gesture: usize,
    dropout: f64,
    jitter: f64,
}

impl MockExtractor {
    /// Creates an extractor seeded for reproducible output.
    pub fn new(keypoints: usize, seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            keypoints,
            gesture: 0,
            dropout: 0.0,
            jitter: 0.01,
        }
    }

    /// Sets the fraction of frames reported as "no detection".
    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout.clamp(0.0, 1.0);
        self
    }

    /// Selects which synthetic gesture pose subsequent frames follow.
    pub fn set_gesture(&mut self, gesture: usize) {
        self.gesture = gesture;
    }

    /// Returns the active gesture pose.
    pub fn gesture(&self) -> usize {
        self.gesture
    }

    fn pose_value(&self, feature: usize, frame_phase: f64) -> f64 {
        let landmark = (feature / COORDS_PER_LANDMARK) as f64;
        let axis = feature % COORDS_PER_LANDMARK;
        let g = self.gesture as f64;
        match axis {
            0 => 0.5 + 0.15 * (landmark * 0.3 + g).cos() + 0.02 * frame_phase.sin(),
            1 => 0.5 + 0.15 * (landmark * 0.3 + g * 0.7).sin() + 0.02 * frame_phase.cos(),
            _ => -0.05 * (landmark / 20.0) * (1.0 + g * 0.1),
        }
    }
}

impl LandmarkExtractor for MockExtractor {
    fn extract(&mut self, frame: &CameraFrame) -> KeypointFrame {
        if self.dropout > 0.0 && self.rng.gen_bool(self.dropout) {
            tracing::trace!(frame = frame.frame_number(), "No hand detected");
            return KeypointFrame::zeros(self.keypoints);
        }

        let phase = frame.frame_number() as f64 * 0.2;
        let values = (0..self.keypoints)
            .map(|i| {
                let noise = self.rng.gen_range(-self.jitter..=self.jitter);
                self.pose_value(i, phase) + noise
            })
            .collect();
        KeypointFrame::new(values)
    }

    fn keypoints_per_frame(&self) -> usize {
        self.keypoints
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(number: u64) -> CameraFrame {
        CameraFrame::new(vec![0u8; 4 * 4 * 3], 4, 4, number)
    }

    #[test]
    fn test_extract_has_configured_width() {
        let mut extractor = MockExtractor::new(63, 7);
        let keypoints = extractor.extract(&frame(1));
        assert_eq!(keypoints.len(), 63);
        assert!(!keypoints.is_empty_detection());
    }

    #[test]
    fn test_same_seed_is_reproducible() {
        let mut a = MockExtractor::new(63, 42);
        let mut b = MockExtractor::new(63, 42);
        for i in 0..5 {
            assert_eq!(a.extract(&frame(i)), b.extract(&frame(i)));
        }
    }

    #[test]
    fn test_full_dropout_yields_zero_sentinel() {
        let mut extractor = MockExtractor::new(63, 1).with_dropout(1.0);
        for i in 0..5 {
            assert!(extractor.extract(&frame(i)).is_empty_detection());
        }
    }

    #[test]
    fn test_partial_dropout_misses_some_hands() {
        let mut extractor = MockExtractor::new(63, 11).with_dropout(0.5);
        let missed = (0..400)
            .filter(|&i| extractor.extract(&frame(i)).is_empty_detection())
            .count();
        assert!((120..280).contains(&missed), "missed {} of 400", missed);
    }

    #[test]
    fn test_jitter_stays_near_pose() {
        let mut a = MockExtractor::new(63, 1);
        let mut b = MockExtractor::new(63, 2);
        let (a, b) = (a.extract(&frame(3)), b.extract(&frame(3)));
        assert_ne!(a, b);
        for (x, y) in a.values().iter().zip(b.values()) {
            assert!((x - y).abs() <= 0.02 + 1e-12);
        }
    }

    #[test]
    fn test_gestures_produce_distinct_poses() {
        let mut extractor = MockExtractor::new(63, 3);
        let a = extractor.extract(&frame(1));
        extractor.set_gesture(4);
        let b = extractor.extract(&frame(1));
        assert_ne!(a, b);
    }
}
