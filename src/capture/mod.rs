//! Camera input, landmark extraction and sequence recording.
//!
//! This module provides the seams between the outside world and the
//! keypoint pipeline: a [`Camera`] yields raw frames, a
//! [`LandmarkExtractor`] turns each into a [`KeypointFrame`], and a
//! [`CaptureSession`] records labelled sequences into the store. The
//! configuration types shared by the binary also live here.

mod camera;
mod config;
mod extractor;
mod frame;
mod keypoint;
mod session;

pub use camera::{Camera, CameraError, MockCamera};
pub use config::{CaptureConfig, ConfigError, DatasetConfig, FileConfig, MetricsConfig};
pub use extractor::{LandmarkExtractor, MockExtractor};
pub use frame::{CameraFrame, PixelOrder};
pub use keypoint::{
    KeypointFrame, COORDS_PER_LANDMARK, DEFAULT_KEYPOINTS_PER_FRAME, LANDMARKS_PER_HAND,
};
pub use session::{CaptureError, CaptureReport, CaptureSession};
