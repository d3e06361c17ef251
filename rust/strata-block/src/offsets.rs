//! A collection of offsets into a value store.

use std::ops::Range;

/// A collection of offsets for variable-length items.
///
/// Stores a sequence of monotonically non-decreasing offsets, where each pair of
/// adjacent offsets defines the range of a single item. The first offset is
/// always included, so `N` items are described by `N + 1` offsets.
///
/// Used both for the bytes of byte-string values and for the per-position value
/// ranges of multi-valued blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Offsets(Vec<u32>);

impl Offsets {
    /// Creates a new empty `Offsets` collection with a single offset at 0.
    pub fn new() -> Offsets {
        Self::with_capacity(0)
    }

    /// Creates a new empty `Offsets` collection with room for `capacity` items.
    pub fn with_capacity(capacity: usize) -> Offsets {
        let mut buf = Vec::with_capacity(capacity + 1);
        buf.push(0u32);
        Offsets(buf)
    }

    /// Creates a collection of `len` empty items.
    pub fn zeroed(len: usize) -> Offsets {
        Offsets(vec![0; len + 1])
    }

    /// Returns the number of items represented by these offsets.
    #[inline]
    pub fn item_count(&self) -> usize {
        self.0.len() - 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }

    #[inline]
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// Returns the last offset, which marks the end of the last item.
    #[inline]
    pub fn last(&self) -> u32 {
        self.0[self.0.len() - 1]
    }

    /// Returns the range of the item at `index`.
    #[inline]
    pub fn range_at(&self, index: usize) -> Range<usize> {
        self.0[index] as usize..self.0[index + 1] as usize
    }

    /// Returns the length of the item at `index`.
    #[inline]
    pub fn len_at(&self, index: usize) -> usize {
        (self.0[index + 1] - self.0[index]) as usize
    }

    /// Returns an iterator over the ranges of each item.
    #[inline]
    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        self.0.windows(2).map(|w| w[0] as usize..w[1] as usize)
    }

    /// Adds a new offset to the end of the collection.
    ///
    /// # Panics
    ///
    /// Panics if `next_offset` is less than the current last offset.
    #[inline]
    pub fn push_offset(&mut self, next_offset: usize) {
        assert!(next_offset <= u32::MAX as usize, "offset overflow");
        let next_offset = next_offset as u32;
        assert!(next_offset >= self.last());
        self.0.push(next_offset);
    }

    /// Adds a new offset by incrementing the last offset by the given length.
    #[inline]
    pub fn push_length(&mut self, len: usize) {
        let last = self.last() as usize;
        self.push_offset(last + len);
    }
}

impl Default for Offsets {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for Offsets {
    type Target = [u32];

    #[inline]
    fn deref(&self) -> &[u32] {
        self.as_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let offsets = Offsets::new();
        assert_eq!(offsets.item_count(), 0);
        assert_eq!(offsets.as_slice(), &[0]);
        assert!(offsets.is_empty());
    }

    #[test]
    fn test_zeroed() {
        let offsets = Offsets::zeroed(3);
        assert_eq!(offsets.item_count(), 3);
        assert_eq!(offsets.len_at(1), 0);
    }

    #[test]
    fn test_push_length() {
        let mut offsets = Offsets::new();
        offsets.push_length(5);
        offsets.push_length(3);
        offsets.push_length(0);
        assert_eq!(offsets.as_slice(), &[0, 5, 8, 8]);
        assert_eq!(offsets.range_at(1), 5..8);
        assert_eq!(
            offsets.ranges().collect::<Vec<_>>(),
            vec![0..5, 5..8, 8..8]
        );
    }

    #[test]
    #[should_panic]
    fn test_push_offset_panic() {
        let mut offsets = Offsets::new();
        offsets.push_offset(5);
        offsets.push_offset(3);
    }
}
