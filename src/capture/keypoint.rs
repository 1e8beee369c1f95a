//! Per-frame hand landmark vectors.

/// Landmarks reported for a single hand.
pub const LANDMARKS_PER_HAND: usize = 21;

/// Coordinates per landmark (x, y, z).
pub const COORDS_PER_LANDMARK: usize = 3;

/// Default keypoint width: one hand, 21 landmarks, xyz.
pub const DEFAULT_KEYPOINTS_PER_FRAME: usize = LANDMARKS_PER_HAND * COORDS_PER_LANDMARK;

/// Landmark features detected in one camera frame.
///
/// The width is fixed per deployment. An all-zero frame is the
/// "nothing detected" sentinel and is a valid frame, not an error.
#[derive(Clone, PartialEq)]
pub struct KeypointFrame {
    values: Vec<f64>,
}

impl KeypointFrame {
    /// Wraps raw feature values.
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Creates the "no detection" sentinel of the given width.
    pub fn zeros(width: usize) -> Self {
        Self {
            values: vec![0.0; width],
        }
    }

    /// Returns the feature values.
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Returns the number of features.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the frame holds no features at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns true if this is the zero sentinel.
    pub fn is_empty_detection(&self) -> bool {
        self.values.iter().all(|&v| v == 0.0)
    }

    /// Returns the xyz triple of landmark `index`, if present.
    pub fn landmark(&self, index: usize) -> Option<[f64; 3]> {
        let start = index * COORDS_PER_LANDMARK;
        let chunk = self.values.get(start..start + COORDS_PER_LANDMARK)?;
        Some([chunk[0], chunk[1], chunk[2]])
    }

    /// Consumes the frame and returns its values.
    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

impl From<Vec<f64>> for KeypointFrame {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

impl std::fmt::Debug for KeypointFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeypointFrame")
            .field("width", &self.values.len())
            .field("detected", &!self.is_empty_detection())
            .finish()
    }
}
