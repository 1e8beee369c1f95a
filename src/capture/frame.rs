//! Raw camera frames.
//!
//! A frame is only looked at twice: the landmark extractor turns it into a
//! [`KeypointFrame`](super::KeypointFrame), and the middle frame of each
//! recorded sequence becomes the preview thumbnail.

use image::RgbImage;

/// Channel order of packed 8-bit pixels.
///
/// Webcam backends usually hand out BGR; thumbnails and extractors want RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelOrder {
    #[default]
    Rgb,
    Bgr,
}

/// One captured frame, numbered in capture order from 1.
#[derive(Clone)]
pub struct CameraFrame {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    order: PixelOrder,
    frame_number: u64,
}

impl CameraFrame {
    /// Wraps packed RGB8 pixels.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, frame_number: u64) -> Self {
        Self {
            pixels,
            width,
            height,
            order: PixelOrder::Rgb,
            frame_number,
        }
    }

    /// Wraps packed BGR8 pixels as delivered by most capture devices.
    pub fn from_bgr(pixels: Vec<u8>, width: u32, height: u32, frame_number: u64) -> Self {
        Self {
            order: PixelOrder::Bgr,
            ..Self::new(pixels, width, height, frame_number)
        }
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn order(&self) -> PixelOrder {
        self.order
    }

    /// Position in the capture stream; drives the synthetic hand motion.
    #[inline]
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Whether the buffer holds exactly `width * height` three-byte pixels.
    pub fn is_valid(&self) -> bool {
        self.pixels.len() == (self.width as usize) * (self.height as usize) * 3
    }

    /// RGB copy of the frame for thumbnailing, swapping channels if needed.
    ///
    /// `None` when the buffer does not match the dimensions.
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        let mut pixels = self.pixels.clone();
        if self.order == PixelOrder::Bgr {
            for px in pixels.chunks_exact_mut(3) {
                px.swap(0, 2);
            }
        }
        RgbImage::from_raw(self.width, self.height, pixels)
    }
}

impl std::fmt::Debug for CameraFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraFrame")
            .field("frame_number", &self.frame_number)
            .field("size", &format_args!("{}x{}", self.width, self.height))
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}
