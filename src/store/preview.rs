//! Preview thumbnails written next to captured sequences.
//!
//! Thumbnails are for people browsing the dataset; nothing in the
//! pipeline reads them back.

use super::layout::{validate_label, write_atomic};
use super::{SequenceStore, StoreError};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Thumbnail geometry and JPEG quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewSettings {
    pub width: u32,
    pub height: u32,
    /// JPEG quality, 1-100.
    pub quality: u8,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            quality: 80,
        }
    }
}

impl SequenceStore {
    /// Writes a JPEG thumbnail of `image` for an existing sequence.
    pub fn save_preview(
        &self,
        label: &str,
        index: u32,
        image: &DynamicImage,
    ) -> Result<PathBuf, StoreError> {
        validate_label(label)?;
        if !self.sequence_dir(label, index).is_dir() {
            return Err(StoreError::SequenceNotFound {
                label: label.to_string(),
                index,
            });
        }

        let settings = self.config().preview;
        let thumbnail = image
            .resize_exact(settings.width, settings.height, FilterType::Triangle)
            .to_rgb8();

        let mut bytes = Vec::new();
        thumbnail.write_with_encoder(JpegEncoder::new_with_quality(
            &mut bytes,
            settings.quality.clamp(1, 100),
        ))?;

        let path = self.preview_path(label, index);
        write_atomic(&path, &bytes)?;
        tracing::trace!(label, index, bytes = bytes.len(), "Saved preview");
        Ok(path)
    }
}
