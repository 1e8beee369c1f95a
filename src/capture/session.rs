//! Recording labelled sequences from a camera into the store.

use super::{Camera, CameraError, CameraFrame, CaptureConfig, KeypointFrame, LandmarkExtractor};
use crate::sequence::{Sequence, SequenceError};
use crate::store::{SequenceStore, StoreError};
use image::DynamicImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Errors that abort a capture session.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("sequence error: {0}")]
    Sequence(#[from] SequenceError),
}

/// Outcome of [`CaptureSession::record`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureReport {
    /// Indices saved during this session, in order.
    pub saved: Vec<u32>,
    /// Frames where the extractor found no hand.
    pub empty_frames: usize,
    /// Whether the stop flag ended the session early.
    pub cancelled: bool,
}

/// Records fixed-length sequences for one label at a time.
///
/// The stop flag is checked between frames. A sequence interrupted by
/// it is discarded; only complete sequences reach the store.
pub struct CaptureSession<'a, C, E> {
    camera: C,
    extractor: E,
    store: &'a SequenceStore,
    config: CaptureConfig,
    stop: Arc<AtomicBool>,
}

impl<'a, C: Camera, E: LandmarkExtractor> CaptureSession<'a, C, E> {
    pub fn new(camera: C, extractor: E, store: &'a SequenceStore, config: CaptureConfig) -> Self {
        Self {
            camera,
            extractor,
            store,
            config,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shares an externally owned stop flag, e.g. one set by a signal handler.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// Handle that cancels the session when set.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn extractor_mut(&mut self) -> &mut E {
        &mut self.extractor
    }

    /// Records `count` sequences under `label`, appending after the
    /// highest existing index.
    pub fn record(&mut self, label: &str, count: usize) -> Result<CaptureReport, CaptureError> {
        if !self.camera.is_open() {
            self.camera.open(&self.config)?;
        }

        let length = self.store.shape().length;
        let mut report = CaptureReport::default();
        tracing::info!(label, count, length, "Capture started");

        for n in 0..count {
            let Some((frames, preview)) = self.record_sequence(length, &mut report)? else {
                report.cancelled = true;
                tracing::info!(label, saved = report.saved.len(), "Capture cancelled");
                return Ok(report);
            };

            let sequence = Sequence::new(frames, self.store.shape())?;
            let index = self.store.save_next(label, &sequence)?;
            report.saved.push(index);
            tracing::info!(
                label,
                index,
                progress = n + 1,
                total = count,
                empty = sequence.empty_frame_count(),
                "Sequence saved"
            );

            if let Some(frame) = preview {
                self.save_preview(label, index, &frame);
            }
        }

        tracing::info!(label, saved = report.saved.len(), "Capture finished");
        Ok(report)
    }

    /// Captures one sequence; `None` when stopped part-way.
    fn record_sequence(
        &mut self,
        length: usize,
        report: &mut CaptureReport,
    ) -> Result<Option<(Vec<KeypointFrame>, Option<CameraFrame>)>, CaptureError> {
        let mut frames = Vec::with_capacity(length);
        let mut preview = None;

        for i in 0..length {
            if self.stop.load(Ordering::SeqCst) {
                return Ok(None);
            }

            let raw = self.camera.capture()?;
            let keypoints = self.extractor.extract(&raw);
            if keypoints.is_empty_detection() {
                report.empty_frames += 1;
            }
            frames.push(keypoints);

            if i == length / 2 {
                preview = Some(raw);
            }
        }

        Ok(Some((frames, preview)))
    }

    fn save_preview(&self, label: &str, index: u32, frame: &CameraFrame) {
        let Some(rgb) = frame.to_rgb_image() else {
            tracing::warn!(label, index, "Preview frame has invalid dimensions");
            return;
        };
        if let Err(e) = self
            .store
            .save_preview(label, index, &DynamicImage::ImageRgb8(rgb))
        {
            tracing::warn!(label, index, error = %e, "Failed to save preview");
        }
    }

    /// Closes the camera and hands back the parts.
    pub fn finish(mut self) -> (C, E) {
        self.camera.close();
        (self.camera, self.extractor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{MockCamera, MockExtractor};
    use crate::sequence::SequenceShape;
    use crate::store::StoreConfig;
    use tempfile::TempDir;

    const KEYPOINTS: usize = 6;

    fn store(dir: &TempDir) -> SequenceStore {
        SequenceStore::new(
            StoreConfig::new(dir.path()).with_shape(SequenceShape::new(4, KEYPOINTS)),
        )
    }

    fn session<'a, C: Camera>(camera: C, store: &'a SequenceStore) -> CaptureSession<'a, C, MockExtractor> {
        CaptureSession::new(
            camera,
            MockExtractor::new(KEYPOINTS, 7),
            store,
            CaptureConfig::with_dimensions(32, 24),
        )
    }

    /// Raises the stop flag after a fixed number of captures.
    struct StoppingCamera {
        inner: MockCamera,
        stop: Arc<AtomicBool>,
        remaining: usize,
    }

    impl Camera for StoppingCamera {
        fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
            self.inner.open(config)
        }

        fn capture(&mut self) -> Result<CameraFrame, CameraError> {
            self.remaining = self.remaining.saturating_sub(1);
            if self.remaining == 0 {
                self.stop.store(true, Ordering::SeqCst);
            }
            self.inner.capture()
        }

        fn is_open(&self) -> bool {
            self.inner.is_open()
        }

        fn close(&mut self) {
            self.inner.close()
        }
    }

    #[test]
    fn test_records_sequences_with_previews() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let mut session = session(MockCamera::new(), &store);

        let report = session.record("Hello", 3).unwrap();
        assert_eq!(report.saved, vec![0, 1, 2]);
        assert!(!report.cancelled);
        assert_eq!(store.count("Hello").unwrap(), 3);
        assert!(store.preview_path("Hello", 1).is_file());

        let loaded = store.load("Hello", 2).unwrap().unwrap();
        assert_eq!(loaded.sequence.len(), 4);
    }

    #[test]
    fn test_appends_after_existing_sequences() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let mut session = session(MockCamera::new(), &store);

        session.record("Yes", 2).unwrap();
        store.delete("Yes", 0).unwrap();
        let report = session.record("Yes", 1).unwrap();
        assert_eq!(report.saved, vec![2]);
    }

    #[test]
    fn test_cancel_mid_sequence_writes_nothing_partial() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let stop = Arc::new(AtomicBool::new(false));
        let camera = StoppingCamera {
            inner: MockCamera::new(),
            stop: Arc::clone(&stop),
            // one full sequence plus two frames of the next
            remaining: 6,
        };
        let mut session = session(camera, &store).with_stop_flag(stop);

        let report = session.record("Thanks", 5).unwrap();
        assert!(report.cancelled);
        assert_eq!(report.saved, vec![0]);
        assert_eq!(store.sequence_indices("Thanks").unwrap(), vec![0]);
    }

    #[test]
    fn test_stopped_before_start() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let mut session = session(MockCamera::new(), &store);
        session.stop_flag().store(true, Ordering::SeqCst);

        let report = session.record("Hello", 2).unwrap();
        assert!(report.cancelled);
        assert!(report.saved.is_empty());
        assert!(!store.label_exists("Hello"));
    }

    #[test]
    fn test_dropout_counts_empty_frames() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let mut session = CaptureSession::new(
            MockCamera::new(),
            MockExtractor::new(KEYPOINTS, 3).with_dropout(1.0),
            &store,
            CaptureConfig::with_dimensions(32, 24),
        );

        let report = session.record("Hello", 1).unwrap();
        assert_eq!(report.empty_frames, 4);

        let loaded = store.load("Hello", 0).unwrap().unwrap();
        assert_eq!(loaded.sequence.empty_frame_count(), 4);
    }

    #[test]
    fn test_width_mismatch_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let mut session = CaptureSession::new(
            MockCamera::new(),
            MockExtractor::new(KEYPOINTS + 1, 3),
            &store,
            CaptureConfig::with_dimensions(32, 24),
        );

        assert!(matches!(
            session.record("Hello", 1),
            Err(CaptureError::Sequence(SequenceError::WidthMismatch { .. }))
        ));
        assert_eq!(store.count("Hello").unwrap(), 0);
    }
}
