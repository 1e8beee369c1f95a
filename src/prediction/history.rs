//! Fixed-capacity history of recent class indices.

/// Circular buffer of the last `capacity` predicted class indices.
///
/// Push is O(1); the oldest entry is overwritten once full.
#[derive(Debug, Clone)]
pub struct ClassHistory {
    slots: Box<[usize]>,
    /// Index of the oldest entry.
    head: usize,
    len: usize,
}

impl ClassHistory {
    /// Creates a history holding at least one entry.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![0; capacity.max(1)].into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }

    pub fn push(&mut self, class_index: usize) {
        let capacity = self.slots.len();
        if self.len < capacity {
            self.slots[(self.head + self.len) % capacity] = class_index;
            self.len += 1;
        } else {
            self.slots[self.head] = class_index;
            self.head = (self.head + 1) % capacity;
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    /// The class every entry agrees on, if the history is full and unanimous.
    pub fn unanimous(&self) -> Option<usize> {
        if !self.is_full() {
            return None;
        }
        let first = self.slots[self.head];
        self.iter().all(|c| c == first).then_some(first)
    }

    /// Entries oldest first.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        let capacity = self.slots.len();
        (0..self.len).map(move |i| self.slots[(self.head + i) % capacity])
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_unanimous_requires_full_history() {
        let mut history = ClassHistory::new(3);
        history.push(2);
        history.push(2);
        assert_eq!(history.unanimous(), None);

        history.push(2);
        assert_eq!(history.unanimous(), Some(2));

        history.push(5);
        assert_eq!(history.unanimous(), None);
        assert_eq!(history.iter().collect::<Vec<_>>(), vec![2, 2, 5]);
    }

    #[test]
    fn test_clear() {
        let mut history = ClassHistory::new(2);
        history.push(1);
        history.push(1);
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.unanimous(), None);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut history = ClassHistory::new(0);
        assert_eq!(history.capacity(), 1);
        history.push(4);
        assert_eq!(history.unanimous(), Some(4));
    }

    proptest! {
        #[test]
        fn prop_keeps_most_recent_entries(
            capacity in 1usize..12,
            entries in proptest::collection::vec(0usize..6, 0..40),
        ) {
            let mut history = ClassHistory::new(capacity);
            for &e in &entries {
                history.push(e);
            }

            let start = entries.len().saturating_sub(capacity);
            prop_assert_eq!(history.iter().collect::<Vec<_>>(), entries[start..].to_vec());
            prop_assert!(history.len() <= capacity);
        }
    }
}
