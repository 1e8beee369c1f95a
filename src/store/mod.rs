//! Persistent sequence storage.
//!
//! Sequences live under `<root>/<label>/<index>/`. The store reads both
//! the consolidated single-array layout and the older one-file-per-frame
//! layout, and upgrades the latter on read when configured to.

mod layout;
pub mod npy;
mod preview;
mod sequence_store;

pub use layout::{CONSOLIDATED_FILE, PREVIEW_FILE};
pub use preview::PreviewSettings;
pub use sequence_store::{
    LoadedSequence, MigrationReport, SequenceLayout, SequenceStore, StoreConfig,
};

use crate::sequence::SequenceError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid label {label:?}: {reason}")]
    InvalidLabel { label: String, reason: String },

    #[error("label {0:?} does not exist")]
    LabelNotFound(String),

    #[error("label {0:?} already exists")]
    LabelExists(String),

    #[error("sequence {label}/{index} already exists")]
    SequenceExists { label: String, index: u32 },

    #[error("sequence {label}/{index} does not exist")]
    SequenceNotFound { label: String, index: u32 },

    #[error("corrupt sequence file {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("sequence shape error: {0}")]
    Sequence(#[from] SequenceError),

    #[error("failed to encode preview: {0}")]
    Preview(#[from] image::ImageError),
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn corrupt(path: &Path, reason: impl ToString) -> Self {
        StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// True for conflicts with existing labels or sequences.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::LabelExists(_) | StoreError::SequenceExists { .. }
        )
    }
}
