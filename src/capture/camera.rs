//! Webcam boundary.
//!
//! Real device access belongs to a backend implementing [`Camera`].
//! [`MockCamera`] stands in for a webcam pointed at a signer: a dark
//! backdrop with a skin-toned patch drifting across it, delivered in BGR
//! like a typical capture device.

use super::{CameraFrame, CaptureConfig};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("no camera at device index {0}")]
    DeviceNotFound(u32),
    #[error("invalid capture settings: {0}")]
    ConfigFailed(String),
    #[error("frame grab failed: {0}")]
    CaptureFailed(String),
    #[error("camera is not open")]
    NotInitialized,
}

/// Source of raw frames for capture sessions and live prediction.
pub trait Camera {
    /// Opens the device with the configured resolution and frame rate.
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError>;

    fn capture(&mut self) -> Result<CameraFrame, CameraError>;

    fn is_open(&self) -> bool;

    /// Releases the device. Closing twice is harmless.
    fn close(&mut self);
}

const BACKDROP_BGR: [u8; 3] = [40, 32, 28];
const SKIN_BGR: [u8; 3] = [120, 160, 210];

/// Synthetic webcam.
#[derive(Debug, Default)]
pub struct MockCamera {
    config: Option<CaptureConfig>,
    frames: u64,
}

impl MockCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Centre and radius of the "hand" for the next frame.
    fn hand_position(&self, width: u32, height: u32) -> (i64, i64, i64) {
        let radius = i64::from(width.min(height) / 6).max(1);
        let travel = i64::from(width).max(1);
        let x = (self.frames as i64 * 3) % travel;
        (x, i64::from(height / 2), radius)
    }
}

impl Camera for MockCamera {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        if config.device_id != 0 {
            return Err(CameraError::DeviceNotFound(config.device_id));
        }
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;
        self.config = Some(config.clone());
        self.frames = 0;
        tracing::info!(
            width = config.width,
            height = config.height,
            fps = config.fps,
            "Mock webcam opened"
        );
        Ok(())
    }

    fn capture(&mut self) -> Result<CameraFrame, CameraError> {
        let config = self.config.as_ref().ok_or(CameraError::NotInitialized)?;
        let (width, height) = (config.width, config.height);
        let (cx, cy, r) = self.hand_position(width, height);

        let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
        for y in 0..i64::from(height) {
            for x in 0..i64::from(width) {
                let inside = (x - cx).pow(2) + (y - cy).pow(2) <= r * r;
                pixels.extend_from_slice(if inside { &SKIN_BGR } else { &BACKDROP_BGR });
            }
        }

        self.frames += 1;
        Ok(CameraFrame::from_bgr(pixels, width, height, self.frames))
    }

    fn is_open(&self) -> bool {
        self.config.is_some()
    }

    fn close(&mut self) {
        if self.config.take().is_some() {
            tracing::info!(frames = self.frames, "Mock webcam closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::PixelOrder;

    fn webcam() -> MockCamera {
        let mut camera = MockCamera::new();
        camera.open(&CaptureConfig::with_dimensions(60, 30)).unwrap();
        camera
    }

    #[test]
    fn test_frames_are_numbered_bgr_with_a_moving_hand() {
        let mut camera = webcam();

        let first = camera.capture().unwrap();
        let second = camera.capture().unwrap();
        assert_eq!((first.frame_number(), second.frame_number()), (1, 2));
        assert_eq!(first.order(), PixelOrder::Bgr);
        assert!(first.is_valid());
        assert_ne!(first.pixels(), second.pixels());

        let rgb = first.to_rgb_image().unwrap();
        assert_eq!(rgb.get_pixel(0, 15).0, [210, 160, 120]);
        assert_eq!(rgb.get_pixel(59, 0).0, [28, 32, 40]);
    }

    #[test]
    fn test_missing_device_is_reported() {
        let mut camera = MockCamera::new();
        let config = CaptureConfig {
            device_id: 2,
            ..CaptureConfig::default()
        };
        assert!(matches!(
            camera.open(&config),
            Err(CameraError::DeviceNotFound(2))
        ));
        assert!(!camera.is_open());
    }

    #[test]
    fn test_grab_after_close_fails() {
        let mut camera = webcam();
        camera.close();
        camera.close();
        assert!(matches!(camera.capture(), Err(CameraError::NotInitialized)));
    }
}
