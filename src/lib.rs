//! Gesture Stream Library
//!
//! Captures hand-keypoint sequences, stores them as labelled on-disk
//! datasets, and turns a live keypoint stream into stable gesture
//! predictions.
//!
//! # Architecture
//!
//! ```text
//! camera → extractor → KeypointFrame ─┬→ CaptureSession → SequenceStore → dataset
//!                                     │
//!                                     └→ SequenceBuffer → Classifier → PredictionStabilizer
//! ```
//!
//! # Design Principles
//!
//! - **Fixed geometry**: every sequence is exactly `length × keypoints`
//! - **Atomic writes**: an interrupted save never leaves a partial sequence
//! - **Debounced output**: a label is only reported after consistent,
//!   confident classifications
//! - **Pluggable models**: detection and classification sit behind traits
//!
//! # Example
//!
//! ```no_run
//! use gesture_stream::{
//!     capture::{Camera, CaptureConfig, LandmarkExtractor, MockCamera, MockExtractor},
//!     classifier::ScriptedClassifier,
//!     prediction::{PredictionConfig, Predictor},
//!     sequence::SequenceShape,
//! };
//!
//! let shape = SequenceShape::default();
//! let mut camera = MockCamera::new();
//! camera.open(&CaptureConfig::default()).unwrap();
//! let mut extractor = MockExtractor::new(shape.keypoints, 42);
//!
//! let mut predictor = Predictor::new(PredictionConfig::default(), shape).unwrap();
//! let classifier = ScriptedClassifier::new(2).then_class(0, 0.95).cycling();
//! predictor
//!     .load_model(Box::new(classifier), vec!["Hello".into(), "Thanks".into()])
//!     .unwrap();
//!
//! for _ in 0..60 {
//!     let frame = camera.capture().unwrap();
//!     let prediction = predictor.predict(extractor.extract(&frame));
//!     if let Some(label) = prediction.label() {
//!         println!("{} ({:.2})", label, prediction.confidence());
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod classifier;
pub mod dataset;
pub mod metrics;
pub mod prediction;
pub mod sequence;
pub mod store;

// Re-export commonly used types at crate root
pub use capture::{
    Camera, CaptureConfig, CaptureSession, FileConfig, KeypointFrame, LandmarkExtractor,
    MockCamera, MockExtractor,
};
pub use classifier::{Classifier, ClassifierError, ScriptedClassifier};
pub use dataset::{DatasetStats, DatasetValidator, TrainingSet, ValidationError};
pub use prediction::{Prediction, PredictionConfig, PredictionStabilizer, Predictor, StreamState};
pub use sequence::{Sequence, SequenceBuffer, SequenceShape};
pub use store::{SequenceStore, StoreConfig, StoreError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
