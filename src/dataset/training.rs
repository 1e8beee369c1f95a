//! Assembling stored sequences into a labelled training set.

use crate::sequence::Sequence;
use crate::store::{SequenceStore, StoreError};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// Fraction of each class held out for validation by default.
pub const DEFAULT_VALIDATION_SPLIT: f64 = 0.2;

/// Samples and integer targets ready for an external trainer.
///
/// `targets[i]` indexes into `labels`, which follows sorted label order,
/// so the same dataset always produces the same class mapping.
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    pub samples: Vec<Sequence>,
    pub targets: Vec<usize>,
    pub labels: Vec<String>,
    /// Sequences left out because they could not be read.
    pub skipped: usize,
}

impl TrainingSet {
    /// Loads every readable sequence in the store.
    ///
    /// Corrupt sequences are skipped with a warning; I/O failures abort.
    pub fn load(store: &SequenceStore) -> Result<Self, StoreError> {
        let mut set = TrainingSet {
            labels: store.list_labels()?,
            ..Default::default()
        };

        for (target, label) in set.labels.iter().enumerate() {
            for index in store.sequence_indices(label)? {
                match store.load(label, index) {
                    Ok(Some(loaded)) => {
                        if !loaded.missing_frames.is_empty() {
                            tracing::warn!(
                                label = %label,
                                index,
                                missing = ?loaded.missing_frames,
                                "Zero-filled missing legacy frames"
                            );
                        }
                        set.samples.push(loaded.sequence);
                        set.targets.push(target);
                    }
                    Ok(None) => {
                        tracing::warn!(label = %label, index, "Sequence has no frames, skipping");
                        set.skipped += 1;
                    }
                    Err(e @ (StoreError::Corrupt { .. } | StoreError::Sequence(_))) => {
                        tracing::warn!(label = %label, index, error = %e, "Skipping corrupt sequence");
                        set.skipped += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        tracing::info!(
            samples = set.samples.len(),
            classes = set.labels.len(),
            skipped = set.skipped,
            "Training set assembled"
        );
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of samples per class, indexed like `labels`.
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.labels.len()];
        for &t in &self.targets {
            counts[t] += 1;
        }
        counts
    }

    /// Splits into `(train, validation)` with the same class proportions.
    ///
    /// Each class keeps at least one training sample. The shuffle is
    /// seeded so a split is reproducible.
    pub fn split(&self, validation_fraction: f64, seed: u64) -> (TrainingSet, TrainingSet) {
        let fraction = validation_fraction.clamp(0.0, 1.0);
        let mut rng = ChaCha20Rng::seed_from_u64(seed);

        let mut train = self.empty_like();
        let mut validation = self.empty_like();

        for class in 0..self.labels.len() {
            let mut members: Vec<usize> = self
                .targets
                .iter()
                .enumerate()
                .filter(|(_, t)| **t == class)
                .map(|(i, _)| i)
                .collect();
            members.shuffle(&mut rng);

            let held_out = ((members.len() as f64 * fraction).round() as usize)
                .min(members.len().saturating_sub(1));
            for (n, &i) in members.iter().enumerate() {
                let dest = if n < held_out { &mut validation } else { &mut train };
                dest.samples.push(self.samples[i].clone());
                dest.targets.push(class);
            }
        }

        (train, validation)
    }

    fn empty_like(&self) -> TrainingSet {
        TrainingSet {
            labels: self.labels.clone(),
            ..Default::default()
        }
    }
}
