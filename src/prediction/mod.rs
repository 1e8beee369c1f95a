//! Real-time prediction over a live keypoint stream.
//!
//! ```text
//! KeypointFrame → SequenceBuffer → Classifier → PredictionStabilizer → Prediction
//! ```
//!
//! The stream moves through three states: `Filling` until the buffer
//! holds a full sequence, then `Streaming` with one raw classification
//! per frame, and `Stable` whenever the recent classifications agree with
//! enough confidence.

mod history;
mod predictor;
mod stabilizer;

pub use history::ClassHistory;
pub use predictor::{Predictor, SessionStats};
pub use stabilizer::{Observation, PredictionStabilizer, StableReading};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stabilizer tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    /// Latest confidence must exceed this for a stable reading.
    pub confidence_threshold: f32,
    /// Number of consecutive agreeing classifications required.
    pub consistency_frames: usize,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.8,
            consistency_frames: 10,
        }
    }
}

/// Errors configuring prediction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error("confidence threshold {0} outside 0.0-1.0")]
    InvalidThreshold(f32),
    #[error("consistency window must hold at least one frame")]
    InvalidWindow,
    #[error("classifier reports {classes} classes but {labels} labels were given")]
    LabelMismatch { classes: usize, labels: usize },
}

/// Observable state of a prediction stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StreamState {
    /// Sequence buffer not yet full; no classification attempted.
    Filling,
    /// Classifying every frame, no stable agreement.
    Streaming,
    /// Recent classifications agree above the threshold.
    Stable,
}

impl StreamState {
    /// Numeric encoding used for metrics.
    pub fn as_gauge(&self) -> i64 {
        match self {
            StreamState::Filling => 0,
            StreamState::Streaming => 1,
            StreamState::Stable => 2,
        }
    }
}

/// Per-frame output of the [`Predictor`].
///
/// Stable and raw confidences are kept as distinct variants so callers
/// never mistake a diagnostic reading for a debounced one.
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    /// No model has been loaded.
    NoModel,
    /// Collecting frames until a full sequence is available.
    Filling { buffered: usize, required: usize },
    /// Classification or frame intake failed for this frame.
    Failed,
    /// A raw classification that has not (yet) stabilized.
    Unstable {
        class_index: usize,
        raw_confidence: f32,
    },
    /// A debounced, user-facing label.
    Stable {
        label: String,
        class_index: usize,
        confidence: f32,
    },
}

impl Prediction {
    /// The stable label, if any.
    pub fn label(&self) -> Option<&str> {
        match self {
            Prediction::Stable { label, .. } => Some(label),
            _ => None,
        }
    }

    /// Confidence to display: stable or raw, zero when there is none.
    pub fn confidence(&self) -> f32 {
        match self {
            Prediction::Stable { confidence, .. } => *confidence,
            Prediction::Unstable { raw_confidence, .. } => *raw_confidence,
            _ => 0.0,
        }
    }

    pub fn is_stable(&self) -> bool {
        matches!(self, Prediction::Stable { .. })
    }
}
