//! Per-label sequence counts.

use crate::store::{SequenceStore, StoreError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Snapshot of how many sequences each label holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStats {
    /// Sequence count per label, sorted by label.
    pub labels: BTreeMap<String, usize>,
    pub total_labels: usize,
    pub total_sequences: usize,
    pub computed_at: DateTime<Utc>,
}

impl DatasetStats {
    /// Counts every label in the store.
    pub fn compute(store: &SequenceStore) -> Result<Self, StoreError> {
        let mut labels = BTreeMap::new();
        for label in store.list_labels()? {
            let count = store.count(&label)?;
            labels.insert(label, count);
        }

        let total_sequences = labels.values().sum();
        Ok(Self {
            total_labels: labels.len(),
            total_sequences,
            labels,
            computed_at: Utc::now(),
        })
    }

    /// Count for one label, zero if it is absent.
    pub fn count(&self, label: &str) -> usize {
        self.labels.get(label).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label with the fewest sequences; ties go to the first in sorted order.
    pub fn smallest_label(&self) -> Option<(&str, usize)> {
        self.labels
            .iter()
            .min_by_key(|(_, count)| **count)
            .map(|(label, count)| (label.as_str(), *count))
    }
}
