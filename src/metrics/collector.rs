//! Metrics collection and registry.

use crate::dataset::DatasetStats;
use crate::prediction::Predictor;
use serde::Serialize;
use prometheus::{Encoder, Gauge, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of pipeline state for metrics update.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    /// Frames processed in the current prediction session.
    pub frames: u64,
    /// Stable predictions emitted in the current session.
    pub stable_predictions: u64,
    /// Failed classifications in the current session.
    pub adapter_failures: u64,
    /// Stable predictions per label in the current session.
    pub stable_by_label: BTreeMap<String, u64>,
    /// 0 = filling, 1 = streaming, 2 = stable.
    pub stream_state: i64,
    /// Latest raw classifier confidence.
    pub raw_confidence: f64,
    /// Dataset totals, when statistics were computed.
    pub dataset_labels: Option<usize>,
    pub dataset_sequences: Option<usize>,
}

impl MetricsSnapshot {
    /// Creates a snapshot from the predictor and, optionally, dataset statistics.
    pub fn from_components(predictor: &Predictor, dataset: Option<&DatasetStats>) -> Self {
        let stats = predictor.session_stats();
        Self {
            frames: stats.frames,
            stable_predictions: stats.stable_emissions,
            adapter_failures: stats.adapter_failures,
            stable_by_label: stats.per_label.clone(),
            stream_state: predictor.state().as_gauge(),
            raw_confidence: predictor.raw_confidence() as f64,
            dataset_labels: dataset.map(|d| d.total_labels),
            dataset_sequences: dataset.map(|d| d.total_sequences),
        }
    }
}

/// Prometheus metrics registry for the gesture pipeline.
pub struct MetricsRegistry {
    registry: Registry,

    // Stream metrics
    frames_total: IntCounter,
    stable_total: IntCounter,
    failures_total: IntCounter,
    stable_by_label: IntCounterVec,
    stream_state: IntGauge,
    raw_confidence: Gauge,

    // Dataset metrics
    dataset_labels: IntGauge,
    dataset_sequences: IntGauge,
}

impl MetricsRegistry {
    /// Creates a new registry with all pipeline metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let frames_total = IntCounter::new(
            "gesture_stream_frames_total",
            "Keypoint frames fed to the predictor",
        )?;
        let stable_total = IntCounter::new(
            "gesture_stream_stable_predictions_total",
            "Frames that produced a stable prediction",
        )?;
        let failures_total = IntCounter::new(
            "gesture_stream_adapter_failures_total",
            "Frames whose classification failed",
        )?;
        let stable_by_label = IntCounterVec::new(
            Opts::new(
                "gesture_stream_stable_predictions_by_label_total",
                "Stable predictions per label",
            ),
            &["label"],
        )?;
        let stream_state = IntGauge::new(
            "gesture_stream_stream_state",
            "Prediction stream state (0=filling, 1=streaming, 2=stable)",
        )?;
        let raw_confidence = Gauge::new(
            "gesture_stream_raw_confidence",
            "Latest raw classifier confidence",
        )?;
        let dataset_labels = IntGauge::new(
            "gesture_stream_dataset_labels",
            "Number of labels in the dataset",
        )?;
        let dataset_sequences = IntGauge::new(
            "gesture_stream_dataset_sequences",
            "Number of stored sequences across all labels",
        )?;

        registry.register(Box::new(frames_total.clone()))?;
        registry.register(Box::new(stable_total.clone()))?;
        registry.register(Box::new(failures_total.clone()))?;
        registry.register(Box::new(stable_by_label.clone()))?;
        registry.register(Box::new(stream_state.clone()))?;
        registry.register(Box::new(raw_confidence.clone()))?;
        registry.register(Box::new(dataset_labels.clone()))?;
        registry.register(Box::new(dataset_sequences.clone()))?;

        Ok(Self {
            registry,
            frames_total,
            stable_total,
            failures_total,
            stable_by_label,
            stream_state,
            raw_confidence,
            dataset_labels,
            dataset_sequences,
        })
    }

    /// Updates all metrics from a snapshot.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        // A new session drops every per-label series, including labels
        // the new session has not emitted yet.
        if snapshot.frames < self.frames_total.get()
            || snapshot.stable_predictions < self.stable_total.get()
        {
            self.stable_by_label.reset();
        }
        advance(&self.frames_total, snapshot.frames);
        advance(&self.stable_total, snapshot.stable_predictions);
        advance(&self.failures_total, snapshot.adapter_failures);
        for (label, &count) in &snapshot.stable_by_label {
            advance(&self.stable_by_label.with_label_values(&[label.as_str()]), count);
        }

        self.stream_state.set(snapshot.stream_state);
        self.raw_confidence.set(snapshot.raw_confidence);

        if let Some(labels) = snapshot.dataset_labels {
            self.dataset_labels.set(labels as i64);
        }
        if let Some(sequences) = snapshot.dataset_sequences {
            self.dataset_sequences.set(sequences as i64);
        }
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Moves a counter to a session total. A smaller total means the session
/// was reset, which is exported as a counter reset.
fn advance(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    } else if total < current {
        counter.reset();
        counter.inc_by(total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::KeypointFrame;
    use crate::classifier::ScriptedClassifier;
    use crate::prediction::PredictionConfig;
    use crate::sequence::SequenceShape;

    #[test]
    fn test_registry_creation() {
        assert!(MetricsRegistry::new().is_ok());
    }

    #[test]
    fn test_metrics_update() {
        let registry = MetricsRegistry::new().unwrap();

        let mut stable_by_label = BTreeMap::new();
        stable_by_label.insert("Hello".to_string(), 3);
        let snapshot = MetricsSnapshot {
            frames: 40,
            stable_predictions: 3,
            adapter_failures: 1,
            stable_by_label,
            stream_state: 2,
            raw_confidence: 0.9,
            dataset_labels: Some(4),
            dataset_sequences: Some(120),
        };
        registry.update(&snapshot);

        let output = registry.encode().unwrap();
        assert!(output.contains("gesture_stream_frames_total 40"));
        assert!(output.contains("gesture_stream_stream_state 2"));
        assert!(output.contains("gesture_stream_dataset_sequences 120"));
        assert!(output.contains("label=\"Hello\"} 3"));
    }

    #[test]
    fn test_session_reset_resets_counters() {
        let registry = MetricsRegistry::new().unwrap();
        registry.update(&MetricsSnapshot {
            frames: 50,
            ..Default::default()
        });
        registry.update(&MetricsSnapshot {
            frames: 7,
            ..Default::default()
        });
        assert!(registry
            .encode()
            .unwrap()
            .contains("gesture_stream_frames_total 7"));
    }

    #[test]
    fn test_session_reset_clears_label_counters() {
        let registry = MetricsRegistry::new().unwrap();
        let mut stable_by_label = BTreeMap::new();
        stable_by_label.insert("Hello".to_string(), 5);
        registry.update(&MetricsSnapshot {
            frames: 50,
            stable_predictions: 5,
            stable_by_label,
            ..Default::default()
        });
        assert!(registry.encode().unwrap().contains("label=\"Hello\"} 5"));

        registry.update(&MetricsSnapshot {
            frames: 2,
            ..Default::default()
        });
        let output = registry.encode().unwrap();
        assert!(!output.contains("label=\"Hello\""));
        assert!(output.contains("gesture_stream_stable_predictions_total 0"));
    }

    #[test]
    fn test_snapshot_from_predictor() {
        let mut predictor =
            Predictor::new(PredictionConfig::default(), SequenceShape::new(1, 2)).unwrap();
        predictor
            .load_model(
                Box::new(ScriptedClassifier::new(2).then_class(1, 0.6)),
                vec!["a".into(), "b".into()],
            )
            .unwrap();
        predictor.predict(KeypointFrame::new(vec![0.0, 0.0]));

        let snapshot = MetricsSnapshot::from_components(&predictor, None);
        assert_eq!(snapshot.frames, 1);
        assert_eq!(snapshot.stream_state, 1);
        assert!((snapshot.raw_confidence - 0.6).abs() < 1e-6);
        assert_eq!(snapshot.dataset_labels, None);
    }
}
