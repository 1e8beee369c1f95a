//! Deterministic classifier that replays scripted outputs.

use super::{Classifier, ClassifierError};
use crate::sequence::Sequence;
use std::collections::VecDeque;

/// Replays a fixed script of distributions or failures, one per call.
///
/// Used in tests and the demo CLI in place of a trained model.
pub struct ScriptedClassifier {
    num_classes: usize,
    script: VecDeque<Result<Vec<f32>, ClassifierError>>,
    /// Replay the script from the start once it runs out.
    cycle: bool,
    played: Vec<Result<Vec<f32>, ClassifierError>>,
    calls: u64,
}

impl ScriptedClassifier {
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            script: VecDeque::new(),
            cycle: false,
            played: Vec::new(),
            calls: 0,
        }
    }

    /// Restarts the script when exhausted instead of failing.
    pub fn cycling(mut self) -> Self {
        self.cycle = true;
        self
    }

    /// Queues a raw distribution.
    pub fn then(mut self, probabilities: Vec<f32>) -> Self {
        self.script.push_back(Ok(probabilities));
        self
    }

    /// Queues a distribution with `confidence` on `class` and the rest
    /// spread evenly over the other classes.
    pub fn then_class(self, class: usize, confidence: f32) -> Self {
        let dist = Self::peaked(self.num_classes, class, confidence);
        self.then(dist)
    }

    /// Queues the same peaked distribution `times` times.
    pub fn then_repeat(mut self, class: usize, confidence: f32, times: usize) -> Self {
        for _ in 0..times {
            self = self.then_class(class, confidence);
        }
        self
    }

    /// Queues an inference failure.
    pub fn then_fail(mut self, message: &str) -> Self {
        self.script
            .push_back(Err(ClassifierError::Inference(message.to_string())));
        self
    }

    /// Number of `predict` calls so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }

    /// Builds a distribution peaked on `class`.
    pub fn peaked(num_classes: usize, class: usize, confidence: f32) -> Vec<f32> {
        let rest = if num_classes > 1 {
            (1.0 - confidence) / (num_classes - 1) as f32
        } else {
            0.0
        };
        (0..num_classes)
            .map(|i| if i == class { confidence } else { rest })
            .collect()
    }
}

impl Classifier for ScriptedClassifier {
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn predict(&mut self, _sequence: &Sequence) -> Result<Vec<f32>, ClassifierError> {
        self.calls += 1;

        if self.script.is_empty() && self.cycle && !self.played.is_empty() {
            self.script.extend(self.played.drain(..));
        }

        let step = self.script.pop_front().ok_or(ClassifierError::Exhausted)?;
        if self.cycle {
            self.played.push(step.clone());
        }
        step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::KeypointFrame;
    use crate::sequence::SequenceShape;

    fn sequence() -> Sequence {
        let shape = SequenceShape::new(2, 2);
        Sequence::new(vec![KeypointFrame::zeros(2); 2], shape).unwrap()
    }

    #[test]
    fn test_replays_in_order_then_exhausts() {
        let mut classifier = ScriptedClassifier::new(3)
            .then_class(2, 0.9)
            .then_fail("boom");
        let seq = sequence();

        let first = classifier.predict(&seq).unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(first[2], 0.9);
        assert!(matches!(
            classifier.predict(&seq),
            Err(ClassifierError::Inference(_))
        ));
        assert_eq!(classifier.predict(&seq), Err(ClassifierError::Exhausted));
        assert_eq!(classifier.calls(), 3);
    }

    #[test]
    fn test_cycling_restarts_script() {
        let mut classifier = ScriptedClassifier::new(2)
            .then_class(0, 0.8)
            .then_class(1, 0.7)
            .cycling();
        let seq = sequence();

        let picks: Vec<f32> = (0..5)
            .map(|_| classifier.predict(&seq).unwrap()[0])
            .collect();
        assert_eq!(picks.len(), 5);
        assert!((picks[0] - 0.8).abs() < 1e-6);
        assert!((picks[2] - 0.8).abs() < 1e-6);
        assert!((picks[4] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_peaked_distribution_sums_to_one() {
        let dist = ScriptedClassifier::peaked(4, 1, 0.7);
        let total: f32 = dist.iter().sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert_eq!(dist[1], 0.7);
    }
}
