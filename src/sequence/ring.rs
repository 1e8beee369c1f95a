//! Rolling window of the most recent keypoint frames.

use super::{Sequence, SequenceError, SequenceShape};
use crate::capture::KeypointFrame;

/// Ring buffer holding the last `shape.length` frames in arrival order.
///
/// `push` is O(1): once the buffer is full the oldest slot is
/// overwritten in place. `is_full` latches on the L-th push and stays
/// set until [`reset`](Self::reset).
pub struct SequenceBuffer {
    shape: SequenceShape,
    /// Frame slots; grows to `shape.length` then is reused.
    slots: Vec<KeypointFrame>,
    /// Next slot to write (also the oldest slot once full).
    write_index: usize,
    /// Whether the buffer has been filled at least once.
    filled: bool,
}

impl SequenceBuffer {
    pub fn new(shape: SequenceShape) -> Self {
        Self {
            shape,
            slots: Vec::with_capacity(shape.length),
            write_index: 0,
            filled: false,
        }
    }

    /// Appends a frame, evicting the oldest once capacity is reached.
    pub fn push(&mut self, frame: KeypointFrame) -> Result<(), SequenceError> {
        if frame.len() != self.shape.keypoints {
            return Err(SequenceError::WidthMismatch {
                expected: self.shape.keypoints,
                found: frame.len(),
            });
        }
        if self.shape.length == 0 {
            return Err(SequenceError::InvalidShape {
                length: self.shape.length,
                keypoints: self.shape.keypoints,
            });
        }

        if self.slots.len() < self.shape.length {
            self.slots.push(frame);
        } else {
            self.slots[self.write_index] = frame;
        }

        self.write_index = (self.write_index + 1) % self.shape.length;
        if self.write_index == 0 {
            self.filled = true;
        }
        Ok(())
    }

    /// True once `shape.length` frames have been pushed since the last reset.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.filled
    }

    /// Number of frames currently held.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Maximum number of frames held.
    pub fn capacity(&self) -> usize {
        self.shape.length
    }

    pub fn shape(&self) -> SequenceShape {
        self.shape
    }

    /// Copies the window out, oldest frame first.
    ///
    /// Fails with [`SequenceError::BufferNotFull`] until the buffer is full.
    pub fn snapshot(&self) -> Result<Sequence, SequenceError> {
        if !self.filled {
            return Err(SequenceError::BufferNotFull {
                buffered: self.slots.len(),
                required: self.shape.length,
            });
        }

        let len = self.shape.length;
        let frames = (0..len)
            .map(|i| self.slots[(self.write_index + i) % len].clone())
            .collect();
        Sequence::new(frames, self.shape)
    }

    /// Drops all frames and clears the full flag.
    pub fn reset(&mut self) {
        self.slots.clear();
        self.write_index = 0;
        self.filled = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tagged(tag: usize, width: usize) -> KeypointFrame {
        KeypointFrame::new(vec![tag as f64; width])
    }

    fn tags(seq: &Sequence) -> Vec<usize> {
        seq.frames().iter().map(|f| f.values()[0] as usize).collect()
    }

    #[test]
    fn test_snapshot_keeps_latest_in_arrival_order() {
        let mut buffer = SequenceBuffer::new(SequenceShape::new(30, 4));
        for i in 0..=40 {
            buffer.push(tagged(i, 4)).unwrap();
        }

        let snapshot = buffer.snapshot().unwrap();
        assert_eq!(tags(&snapshot), (11..=40).collect::<Vec<_>>());
        assert_eq!(buffer.len(), 30);
    }

    #[test]
    fn test_is_full_latches_at_capacity() {
        let mut buffer = SequenceBuffer::new(SequenceShape::new(30, 4));
        for i in 1..30 {
            buffer.push(tagged(i, 4)).unwrap();
            assert!(!buffer.is_full(), "full after only {} pushes", i);
        }
        for i in 30..75 {
            buffer.push(tagged(i, 4)).unwrap();
            assert!(buffer.is_full());
        }

        buffer.reset();
        assert!(!buffer.is_full());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_snapshot_before_full_is_rejected() {
        let mut buffer = SequenceBuffer::new(SequenceShape::new(5, 2));
        buffer.push(tagged(0, 2)).unwrap();
        buffer.push(tagged(1, 2)).unwrap();

        assert_eq!(
            buffer.snapshot(),
            Err(SequenceError::BufferNotFull {
                buffered: 2,
                required: 5
            })
        );
    }

    #[test]
    fn test_wrong_width_rejected_without_mutation() {
        let mut buffer = SequenceBuffer::new(SequenceShape::new(3, 4));
        buffer.push(tagged(0, 4)).unwrap();

        assert!(matches!(
            buffer.push(tagged(1, 5)),
            Err(SequenceError::WidthMismatch { expected: 4, found: 5 })
        ));
        assert_eq!(buffer.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_never_exceeds_capacity(capacity in 1usize..16, pushes in 0usize..64) {
            let mut buffer = SequenceBuffer::new(SequenceShape::new(capacity, 1));
            for i in 0..pushes {
                buffer.push(tagged(i, 1)).unwrap();
                prop_assert!(buffer.len() <= capacity);
            }

            prop_assert_eq!(buffer.is_full(), pushes >= capacity);
            if pushes >= capacity {
                let snapshot = buffer.snapshot().unwrap();
                prop_assert_eq!(tags(&snapshot), (pushes - capacity..pushes).collect::<Vec<_>>());
            }
        }
    }
}
