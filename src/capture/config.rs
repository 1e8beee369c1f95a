//! Capture and application configuration.
//!
//! Every section has a usable default so a missing or partial TOML file
//! still produces a complete configuration.

use crate::dataset::ValidationConfig;
use crate::prediction::PredictionConfig;
use crate::sequence::SequenceShape;
use crate::store::{PreviewSettings, StoreConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for camera capture and sequence recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Camera device index (the mock webcam only answers on 0).
    pub device_id: u32,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Target frames per second.
    pub fps: u32,
    /// Sequences recorded per capture run.
    pub sequences_per_label: usize,
    /// Preview thumbnail width.
    pub preview_width: u32,
    /// Preview thumbnail height.
    pub preview_height: u32,
    /// Preview JPEG quality (1-100).
    pub preview_quality: u8,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_id: 0,
            width: 640,
            height: 480,
            fps: 30,
            sequences_per_label: 30,
            preview_width: 320,
            preview_height: 240,
            preview_quality: 80,
        }
    }
}

impl CaptureConfig {
    /// Creates a new configuration with the specified dimensions.
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.fps == 0 || self.fps > 120 {
            return Err(ConfigError::InvalidFrameRate);
        }
        if self.preview_width == 0 || self.preview_height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.preview_quality == 0 || self.preview_quality > 100 {
            return Err(ConfigError::InvalidPreviewQuality(self.preview_quality));
        }
        Ok(())
    }

    /// Sequences to record: the requested count, or the configured default.
    pub fn capture_count(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.sequences_per_label)
    }

    /// Preview thumbnail settings derived from this configuration.
    pub fn preview(&self) -> PreviewSettings {
        PreviewSettings {
            width: self.preview_width,
            height: self.preview_height,
            quality: self.preview_quality,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    #[error("invalid frame rate (must be 1-120 fps)")]
    InvalidFrameRate,
    #[error("invalid preview quality {0} (must be 1-100)")]
    InvalidPreviewQuality(u8),
    #[error("invalid sequence shape {length}x{keypoints}")]
    InvalidShape { length: usize, keypoints: usize },
    #[error("invalid confidence threshold {0} (must be within 0.0-1.0)")]
    InvalidThreshold(f32),
    #[error("consistency window must hold at least one frame")]
    InvalidConsistencyFrames,
    #[error("validation requires at least {0} labels; a classifier needs 2")]
    InvalidMinLabels(usize),
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Dataset location and sequence geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Directory holding one subdirectory per label.
    pub root: PathBuf,
    /// Frames per sequence.
    pub sequence_length: usize,
    /// Features per frame.
    pub keypoints_per_frame: usize,
    /// Rewrite legacy per-frame sequences as consolidated files on read.
    pub migrate_on_read: bool,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        let shape = SequenceShape::default();
        Self {
            root: PathBuf::from("dataset"),
            sequence_length: shape.length,
            keypoints_per_frame: shape.keypoints,
            migrate_on_read: true,
        }
    }
}

impl DatasetConfig {
    /// Returns the configured sequence shape.
    pub fn shape(&self) -> SequenceShape {
        SequenceShape::new(self.sequence_length, self.keypoints_per_frame)
    }
}

/// Metrics exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Metrics server port (0 to disable).
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { port: 9090 }
    }
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub prediction: PredictionConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.capture.validate()?;

        let shape = self.dataset.shape();
        if !shape.is_valid() {
            return Err(ConfigError::InvalidShape {
                length: shape.length,
                keypoints: shape.keypoints,
            });
        }

        let threshold = self.prediction.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidThreshold(threshold));
        }
        if self.prediction.consistency_frames == 0 {
            return Err(ConfigError::InvalidConsistencyFrames);
        }

        if self.validation.min_labels < 2 {
            return Err(ConfigError::InvalidMinLabels(self.validation.min_labels));
        }
        Ok(())
    }

    /// Builds the sequence store configuration.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            root: self.dataset.root.clone(),
            shape: self.dataset.shape(),
            migrate_on_read: self.dataset.migrate_on_read,
            preview: self.capture.preview(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = FileConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dataset.shape(), SequenceShape::new(30, 63));
        assert_eq!(config.prediction.consistency_frames, 10);
    }

    #[test]
    fn test_zero_dimensions_invalid() {
        let mut config = CaptureConfig::default();
        config.width = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDimensions)
        ));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = FileConfig::from_toml(
            r#"
            [dataset]
            root = "/tmp/gestures"
            sequence_length = 20

            [prediction]
            confidence_threshold = 0.9
            "#,
        )
        .unwrap();

        assert_eq!(config.dataset.root, PathBuf::from("/tmp/gestures"));
        assert_eq!(config.dataset.shape(), SequenceShape::new(20, 63));
        assert!(config.dataset.migrate_on_read);
        assert_eq!(config.prediction.confidence_threshold, 0.9);
        assert_eq!(config.prediction.consistency_frames, 10);
        assert_eq!(config.validation.min_sequences, 5);
    }

    #[test]
    fn test_capture_count_falls_back_to_config() {
        let config = FileConfig::from_toml("[capture]\nsequences_per_label = 12\n").unwrap();
        assert_eq!(config.capture.capture_count(None), 12);
        assert_eq!(config.capture.capture_count(Some(3)), 3);
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let result = FileConfig::from_toml("[prediction]\nconfidence_threshold = 1.5\n");
        assert!(matches!(result, Err(ConfigError::InvalidThreshold(_))));
    }

    #[test]
    fn test_zero_length_shape_rejected() {
        let result = FileConfig::from_toml("[dataset]\nsequence_length = 0\n");
        assert!(matches!(result, Err(ConfigError::InvalidShape { .. })));
    }

    #[test]
    fn test_store_config_carries_preview() {
        let config = FileConfig::default();
        let store = config.store_config();
        assert_eq!(store.preview.width, 320);
        assert_eq!(store.preview.height, 240);
        assert_eq!(store.preview.quality, 80);
    }
}
