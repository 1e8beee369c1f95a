//! Readiness checks run before training.

use super::DatasetStats;
use crate::store::{SequenceStore, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimums a dataset must meet to be trainable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// A classifier needs at least two classes.
    pub min_labels: usize,
    /// Sequences required per label.
    pub min_sequences: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_labels: 2,
            min_sequences: 5,
        }
    }
}

/// Reasons a dataset is not ready for training.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("need at least {required} labels, found {found}")]
    InsufficientLabels { found: usize, required: usize },
    #[error("label '{label}' has {count} sequences, need at least {minimum}")]
    InsufficientSamples {
        label: String,
        count: usize,
        minimum: usize,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Successful validation result.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationSummary {
    pub stats: DatasetStats,
    pub message: String,
}

/// Checks a dataset against a [`ValidationConfig`].
#[derive(Debug, Clone, Default)]
pub struct DatasetValidator {
    config: ValidationConfig,
}

impl DatasetValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Recomputes statistics and checks them.
    ///
    /// Labels are checked in sorted order; the first one below the
    /// minimum is reported.
    pub fn validate(&self, store: &SequenceStore) -> Result<ValidationSummary, ValidationError> {
        let stats = DatasetStats::compute(store)?;
        self.check(stats)
    }

    /// Checks already computed statistics.
    pub fn check(&self, stats: DatasetStats) -> Result<ValidationSummary, ValidationError> {
        let required = self.config.min_labels;
        if stats.total_labels < required {
            tracing::debug!(found = stats.total_labels, required, "Too few labels");
            return Err(ValidationError::InsufficientLabels {
                found: stats.total_labels,
                required,
            });
        }

        let minimum = self.config.min_sequences;
        if let Some((label, &count)) = stats.labels.iter().find(|(_, count)| **count < minimum) {
            tracing::debug!(label = %label, count, minimum, "Label below minimum");
            return Err(ValidationError::InsufficientSamples {
                label: label.clone(),
                count,
                minimum,
            });
        }

        let message = format!(
            "Dataset ready: {} labels, {} sequences",
            stats.total_labels, stats.total_sequences
        );
        tracing::info!(
            labels = stats.total_labels,
            sequences = stats.total_sequences,
            "Dataset validated"
        );
        Ok(ValidationSummary { stats, message })
    }
}
