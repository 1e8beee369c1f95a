//! Fixed-length keypoint sequences.
//!
//! A [`Sequence`] is exactly `length` frames of `keypoints` features each,
//! the unit that is stored on disk and handed to the classifier.
//! [`SequenceBuffer`] assembles sequences from a live frame stream.

mod ring;

pub use ring::SequenceBuffer;

use crate::capture::{KeypointFrame, DEFAULT_KEYPOINTS_PER_FRAME};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default frames per sequence (about one second at 30 fps).
pub const DEFAULT_SEQUENCE_LENGTH: usize = 30;

/// Geometry shared by buffers, stores and classifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceShape {
    /// Frames per sequence (L).
    pub length: usize,
    /// Features per frame (K).
    pub keypoints: usize,
}

impl SequenceShape {
    pub fn new(length: usize, keypoints: usize) -> Self {
        Self { length, keypoints }
    }

    /// Both dimensions must be non-zero.
    pub fn is_valid(&self) -> bool {
        self.length > 0 && self.keypoints > 0
    }

    /// Total number of values in one sequence.
    pub fn value_count(&self) -> usize {
        self.length * self.keypoints
    }
}

impl Default for SequenceShape {
    fn default() -> Self {
        Self::new(DEFAULT_SEQUENCE_LENGTH, DEFAULT_KEYPOINTS_PER_FRAME)
    }
}

/// Errors raised when frames do not fit the configured shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    #[error("frame has {found} keypoints, expected {expected}")]
    WidthMismatch { expected: usize, found: usize },
    #[error("sequence has {found} frames, expected {expected}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("buffer holds {buffered} of {required} frames")]
    BufferNotFull { buffered: usize, required: usize },
    #[error("invalid sequence shape {length}x{keypoints}")]
    InvalidShape { length: usize, keypoints: usize },
}

/// An immutable run of exactly `shape.length` keypoint frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    frames: Vec<KeypointFrame>,
    shape: SequenceShape,
}

impl Sequence {
    /// Builds a sequence, checking frame count and every frame's width.
    pub fn new(frames: Vec<KeypointFrame>, shape: SequenceShape) -> Result<Self, SequenceError> {
        if !shape.is_valid() {
            return Err(SequenceError::InvalidShape {
                length: shape.length,
                keypoints: shape.keypoints,
            });
        }
        if frames.len() != shape.length {
            return Err(SequenceError::LengthMismatch {
                expected: shape.length,
                found: frames.len(),
            });
        }
        if let Some(bad) = frames.iter().find(|f| f.len() != shape.keypoints) {
            return Err(SequenceError::WidthMismatch {
                expected: shape.keypoints,
                found: bad.len(),
            });
        }
        Ok(Self { frames, shape })
    }

    /// Rebuilds a sequence from row-major values.
    pub fn from_flat(values: &[f64], shape: SequenceShape) -> Result<Self, SequenceError> {
        if !shape.is_valid() {
            return Err(SequenceError::InvalidShape {
                length: shape.length,
                keypoints: shape.keypoints,
            });
        }
        if values.len() != shape.value_count() {
            return Err(SequenceError::LengthMismatch {
                expected: shape.length,
                found: values.len() / shape.keypoints,
            });
        }
        let frames = values
            .chunks_exact(shape.keypoints)
            .map(|chunk| KeypointFrame::new(chunk.to_vec()))
            .collect();
        Ok(Self { frames, shape })
    }

    /// Returns the frames, oldest first.
    #[inline]
    pub fn frames(&self) -> &[KeypointFrame] {
        &self.frames
    }

    #[inline]
    pub fn shape(&self) -> SequenceShape {
        self.shape
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of frames with no detection.
    pub fn empty_frame_count(&self) -> usize {
        self.frames.iter().filter(|f| f.is_empty_detection()).count()
    }

    /// Returns all values row-major (frame by frame).
    pub fn to_flat(&self) -> Vec<f64> {
        let mut values = Vec::with_capacity(self.shape.value_count());
        for frame in &self.frames {
            values.extend_from_slice(frame.values());
        }
        values
    }
}
