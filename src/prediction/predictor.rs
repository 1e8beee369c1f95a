//! Frame-by-frame prediction driver.

use super::{
    Observation, Prediction, PredictionConfig, PredictionError, PredictionStabilizer,
    StableReading, StreamState,
};
use crate::capture::KeypointFrame;
use crate::classifier::{argmax, check_distribution, Classifier};
use crate::sequence::{SequenceBuffer, SequenceShape};
use serde::Serialize;
use std::collections::BTreeMap;

/// Counters accumulated since the last reset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStats {
    /// Frames passed to `predict` while a model was loaded.
    pub frames: u64,
    /// Frames that produced a stable prediction.
    pub stable_emissions: u64,
    /// Frames rejected because of a classifier or intake failure.
    pub adapter_failures: u64,
    /// Stable emissions per label.
    pub per_label: BTreeMap<String, u64>,
}

/// Drives a [`SequenceBuffer`], a [`Classifier`] and a
/// [`PredictionStabilizer`] for a single stream.
pub struct Predictor {
    buffer: SequenceBuffer,
    stabilizer: PredictionStabilizer,
    classifier: Option<Box<dyn Classifier>>,
    labels: Vec<String>,
    stats: SessionStats,
}

impl Predictor {
    pub fn new(config: PredictionConfig, shape: SequenceShape) -> Result<Self, PredictionError> {
        Ok(Self {
            buffer: SequenceBuffer::new(shape),
            stabilizer: PredictionStabilizer::new(&config)?,
            classifier: None,
            labels: Vec::new(),
            stats: SessionStats::default(),
        })
    }

    /// Binds a classifier and its ordered label list, then resets the stream.
    ///
    /// `labels[i]` names class `i`; the list length must match the
    /// classifier's class count.
    pub fn load_model(
        &mut self,
        classifier: Box<dyn Classifier>,
        labels: Vec<String>,
    ) -> Result<(), PredictionError> {
        let classes = classifier.num_classes();
        if classes != labels.len() {
            return Err(PredictionError::LabelMismatch {
                classes,
                labels: labels.len(),
            });
        }

        tracing::info!(classes, labels = ?labels, "Model loaded");
        self.classifier = Some(classifier);
        self.labels = labels;
        self.reset();
        Ok(())
    }

    /// Consumes one frame and returns the prediction for it.
    pub fn predict(&mut self, frame: KeypointFrame) -> Prediction {
        if self.classifier.is_none() {
            return Prediction::NoModel;
        }
        self.stats.frames += 1;

        if let Err(e) = self.buffer.push(frame) {
            tracing::debug!(error = %e, "Frame rejected");
            return self.fail();
        }

        if !self.buffer.is_full() {
            return Prediction::Filling {
                buffered: self.buffer.len(),
                required: self.buffer.capacity(),
            };
        }

        let sequence = match self.buffer.snapshot() {
            Ok(sequence) => sequence,
            Err(e) => {
                tracing::debug!(error = %e, "Snapshot failed");
                return self.fail();
            }
        };

        let Some(classifier) = self.classifier.as_mut() else {
            return Prediction::NoModel;
        };
        let num_classes = classifier.num_classes();
        let best = classifier.predict(&sequence).and_then(|probabilities| {
            check_distribution(&probabilities, num_classes)?;
            Ok(argmax(&probabilities))
        });

        let (class_index, confidence) = match best {
            Ok(Some(best)) => best,
            Ok(None) => return self.fail(),
            Err(e) => {
                tracing::debug!(error = %e, "Classification failed");
                return self.fail();
            }
        };

        match self.stabilizer.observe(class_index, confidence) {
            Observation::Stable {
                class_index,
                confidence,
            } => {
                let label = self.label_for(class_index);
                self.stats.stable_emissions += 1;
                *self.stats.per_label.entry(label.clone()).or_insert(0) += 1;
                Prediction::Stable {
                    label,
                    class_index,
                    confidence,
                }
            }
            Observation::Unstable {
                class_index,
                confidence,
            } => Prediction::Unstable {
                class_index,
                raw_confidence: confidence,
            },
        }
    }

    fn fail(&mut self) -> Prediction {
        self.stats.adapter_failures += 1;
        self.stabilizer.reject();
        Prediction::Failed
    }

    /// Label bound to `class_index`, or the index itself when unbound.
    pub fn label_for(&self, class_index: usize) -> String {
        self.labels
            .get(class_index)
            .cloned()
            .unwrap_or_else(|| class_index.to_string())
    }

    pub fn state(&self) -> StreamState {
        if !self.buffer.is_full() {
            StreamState::Filling
        } else if self.stabilizer.is_stable() {
            StreamState::Stable
        } else {
            StreamState::Streaming
        }
    }

    /// Last stable label and confidence, if any since the last reset.
    pub fn last_stable(&self) -> Option<(String, f32)> {
        self.stabilizer
            .last_stable()
            .map(|StableReading { class_index, confidence }| {
                (self.label_for(class_index), confidence)
            })
    }

    /// Latest raw confidence (0 after a failed frame).
    pub fn raw_confidence(&self) -> f32 {
        self.stabilizer.raw_confidence()
    }

    /// Clears the buffer, stabilizer and session counters.
    pub fn reset(&mut self) {
        self.buffer.reset();
        self.stabilizer.reset();
        self.stats = SessionStats::default();
    }

    pub fn is_model_loaded(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn threshold(&self) -> f32 {
        self.stabilizer.threshold()
    }

    pub fn set_threshold(&mut self, threshold: f32) -> Result<(), PredictionError> {
        self.stabilizer.set_threshold(threshold)?;
        tracing::info!(threshold, "Confidence threshold changed");
        Ok(())
    }

    pub fn session_stats(&self) -> &SessionStats {
        &self.stats
    }
}
