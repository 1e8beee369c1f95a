//! Prometheus metrics exporter for the gesture pipeline.
//!
//! # Metrics Exposed
//!
//! ## Stream Metrics
//! - `gesture_stream_frames_total` - Frames fed to the predictor
//! - `gesture_stream_stable_predictions_total` - Stable predictions emitted
//! - `gesture_stream_stable_predictions_by_label_total` - Stable predictions per label
//! - `gesture_stream_adapter_failures_total` - Failed classifications
//! - `gesture_stream_stream_state` - 0=filling, 1=streaming, 2=stable
//! - `gesture_stream_raw_confidence` - Latest raw classifier confidence
//!
//! ## Dataset Metrics
//! - `gesture_stream_dataset_labels` - Labels in the dataset
//! - `gesture_stream_dataset_sequences` - Sequences across all labels
//!
//! Counters follow the predictor's session: resetting the predictor is
//! exported as a counter reset.
//!
//! With the `metrics` feature, [`MetricsServer`] serves the registry
//! alongside `/session` and `/health`; `gesture-stream serve` runs it
//! next to a live mock pipeline.
//!
//! # Example
//!
//! ```no_run
//! use gesture_stream::metrics::{MetricsRegistry, MetricsSnapshot};
//! use gesture_stream::prediction::{PredictionConfig, Predictor};
//! use gesture_stream::sequence::SequenceShape;
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//! let predictor = Predictor::new(PredictionConfig::default(), SequenceShape::default())
//!     .expect("valid config");
//!
//! registry.update(&MetricsSnapshot::from_components(&predictor, None));
//! println!("{}", registry.encode().unwrap());
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, MetricsState, ServerError, SharedState};
