//! Sequence classifier boundary.
//!
//! The model itself is an external collaborator. The pipeline only needs
//! a probability distribution over a fixed, ordered set of classes for
//! each full sequence.

mod scripted;

pub use scripted::ScriptedClassifier;

use crate::sequence::Sequence;
use thiserror::Error;

/// Errors reported by a classifier.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassifierError {
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("invalid output: {0}")]
    InvalidOutput(String),
    #[error("classifier has no more scripted outputs")]
    Exhausted,
}

/// A sequence classifier bound to a fixed number of classes.
///
/// The mapping from class index to label is fixed for the lifetime of
/// the instance.
pub trait Classifier: Send {
    /// Number of classes in every distribution returned by `predict`.
    fn num_classes(&self) -> usize;

    /// Returns one probability per class for a full sequence.
    fn predict(&mut self, sequence: &Sequence) -> Result<Vec<f32>, ClassifierError>;
}

/// Picks the most probable class; ties resolve to the lowest index.
///
/// Returns `None` for an empty distribution.
pub fn argmax(probabilities: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &p) in probabilities.iter().enumerate() {
        match best {
            Some((_, top)) if p <= top => {}
            _ => best = Some((index, p)),
        }
    }
    best
}

/// Checks a distribution before it reaches the stabilizer.
pub fn check_distribution(probabilities: &[f32], num_classes: usize) -> Result<(), ClassifierError> {
    if probabilities.is_empty() {
        return Err(ClassifierError::InvalidOutput("empty distribution".into()));
    }
    if probabilities.len() != num_classes {
        return Err(ClassifierError::InvalidOutput(format!(
            "{} probabilities for {} classes",
            probabilities.len(),
            num_classes
        )));
    }
    if let Some(bad) = probabilities.iter().find(|p| !p.is_finite() || **p < 0.0) {
        return Err(ClassifierError::InvalidOutput(format!(
            "probability {} out of range",
            bad
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_picks_maximum() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), Some((1, 0.7)));
    }

    #[test]
    fn test_argmax_ties_resolve_to_lowest_index() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), Some((1, 0.4)));
        assert_eq!(argmax(&[0.25, 0.25, 0.25, 0.25]), Some((0, 0.25)));
    }

    #[test]
    fn test_argmax_empty() {
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_check_distribution() {
        assert!(check_distribution(&[0.5, 0.5], 2).is_ok());
        assert!(check_distribution(&[], 0).is_err());
        assert!(check_distribution(&[1.0], 2).is_err());
        assert!(check_distribution(&[f32::NAN, 1.0], 2).is_err());
        assert!(check_distribution(&[-0.1, 1.1], 2).is_err());
    }
}
