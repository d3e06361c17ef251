use std::ops::Range;

/// A vector-like container whose elements are addressed by a dense integer key.
///
/// `KeyedVector` stores `(key, value)` entries in a `Vec` and keeps an index that
/// maps each key to its slot, giving constant-time lookup without hashing. Keys
/// are expected to be small and relatively dense, e.g. ordinals assigned to the
/// segments of a shard set.
///
/// The key type `K` must implement `From<usize>`, `Into<usize>`, and `Copy`.
///
/// # Examples
///
/// ```
/// use strata_keyed_vector::KeyedVector;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// struct SegmentKey(u32);
///
/// impl From<usize> for SegmentKey {
///     fn from(value: usize) -> Self {
///         SegmentKey(value as u32)
///     }
/// }
///
/// impl From<SegmentKey> for usize {
///     fn from(value: SegmentKey) -> Self {
///         value.0 as usize
///     }
/// }
///
/// let mut v = KeyedVector::<SegmentKey, &str>::new();
/// v.push_entry(SegmentKey(1), "first");
/// *v.get_or_insert_with(SegmentKey(3), || "third") = "3rd";
///
/// assert_eq!(v.get(SegmentKey(1)), Some(&"first"));
/// assert_eq!(v.get(SegmentKey(3)), Some(&"3rd"));
/// assert!(v.get(SegmentKey(2)).is_none());
/// ```
#[derive(Clone)]
pub struct KeyedVector<K, V> {
    entries: Vec<(K, V)>,
    /// Maps a key to its slot in `entries`; `usize::MAX` marks a vacant key.
    index: Vec<usize>,
}

impl<K, V> KeyedVector<K, V> {
    pub fn new() -> KeyedVector<K, V> {
        KeyedVector {
            entries: Vec::new(),
            index: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> KeyedVector<K, V> {
        KeyedVector {
            entries: Vec::with_capacity(capacity),
            index: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the values in insertion order (disturbed by `swap_remove`).
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.entries.iter_mut().map(|(_, v)| v)
    }

    /// Removes all entries, keeping the allocated capacity.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    /// Removes all entries and returns their values.
    pub fn drain_values(&mut self) -> impl Iterator<Item = V> + '_ {
        self.index.clear();
        self.entries.drain(..).map(|(_, v)| v)
    }
}

impl<K, V> KeyedVector<K, V>
where
    K: From<usize> + Into<usize> + Copy,
{
    pub fn contains_key(&self, key: K) -> bool {
        self.slot_of_key(key).is_some()
    }

    pub fn get(&self, key: K) -> Option<&V> {
        self.slot_of_key(key).map(|i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.slot_of_key(key).map(|i| &mut self.entries[i].1)
    }

    /// Inserts a new value with the given key.
    ///
    /// # Panics
    ///
    /// Panics if the key already exists.
    pub fn push_entry(&mut self, key: K, value: V) {
        assert!(!self.contains_key(key), "duplicate key");
        let slot = self.entries.len();
        self.entries.push((key, value));
        let key = key.into();
        if key >= self.index.len() {
            self.index.resize(key + 1, usize::MAX);
        }
        self.index[key] = slot;
    }

    /// Returns the value for `key`, inserting the result of `create` first when
    /// the key is vacant.
    pub fn get_or_insert_with(&mut self, key: K, create: impl FnOnce() -> V) -> &mut V {
        let slot = match self.slot_of_key(key) {
            Some(slot) => slot,
            None => {
                self.push_entry(key, create());
                self.entries.len() - 1
            }
        };
        &mut self.entries[slot].1
    }

    /// Removes the value for `key` and returns it. The last entry takes the
    /// vacated slot, so the iteration order is not preserved.
    pub fn swap_remove(&mut self, key: K) -> Option<V> {
        let slot = self.slot_of_key(key)?;
        let (_, v) = self.entries.swap_remove(slot);
        self.index[key.into()] = usize::MAX;
        if slot < self.entries.len() {
            let moved = self.entries[slot].0;
            self.index[moved.into()] = slot;
        }
        Some(v)
    }

    /// Iterates over the `(key, value)` entries.
    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    pub fn key_range(&self) -> Range<K> {
        K::from(0)..K::from(self.index.len())
    }

    /// Verifies the internal consistency of the container.
    ///
    /// # Panics
    ///
    /// Panics if the index and the entries disagree.
    pub fn verify(&self) {
        assert_eq!(
            self.index.iter().filter(|&&i| i != usize::MAX).count(),
            self.len()
        );
        for (slot, (key, _)) in self.entries.iter().enumerate() {
            assert_eq!(self.slot_of_key(*key), Some(slot));
        }
    }

    fn slot_of_key(&self, key: K) -> Option<usize> {
        self.index
            .get(key.into())
            .copied()
            .filter(|&i| i != usize::MAX)
    }
}

impl<K, V> Default for KeyedVector<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> std::fmt::Debug for KeyedVector<K, V>
where
    K: std::fmt::Debug,
    V: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    struct TestKey(u32);

    impl From<usize> for TestKey {
        fn from(value: usize) -> Self {
            TestKey(value as u32)
        }
    }

    impl From<TestKey> for usize {
        fn from(value: TestKey) -> Self {
            value.0 as usize
        }
    }

    #[test]
    fn test_push_and_get() {
        let mut v = KeyedVector::<TestKey, u64>::new();
        for k in 0..10u32 {
            v.push_entry(TestKey(k * 5), k as u64 * 1000);
        }
        assert_eq!(v.len(), 10);
        assert!(v.contains_key(TestKey(10)));
        assert!(!v.contains_key(TestKey(11)));
        assert!(!v.contains_key(TestKey(500)));
        assert_eq!(v.get(TestKey(20)), Some(&4000));
        assert_eq!(v.key_range(), TestKey(0)..TestKey(46));
        v.verify();
    }

    #[test]
    #[should_panic]
    fn test_push_duplicate_key() {
        let mut v = KeyedVector::<TestKey, u64>::new();
        v.push_entry(TestKey(1), 1);
        v.push_entry(TestKey(1), 2);
    }

    #[test]
    fn test_get_or_insert_with() {
        let mut v = KeyedVector::<TestKey, Vec<u32>>::new();
        v.get_or_insert_with(TestKey(2), Vec::new).push(1);
        v.get_or_insert_with(TestKey(2), || panic!("already present"))
            .push(2);
        assert_eq!(v.get(TestKey(2)), Some(&vec![1, 2]));
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn test_swap_remove() {
        let mut v = KeyedVector::<TestKey, &str>::new();
        v.push_entry(TestKey(1), "a");
        v.push_entry(TestKey(2), "b");
        v.push_entry(TestKey(3), "c");
        assert_eq!(v.swap_remove(TestKey(1)), Some("a"));
        assert_eq!(v.swap_remove(TestKey(1)), None);
        assert_eq!(v.get(TestKey(3)), Some(&"c"));
        assert_eq!(v.iter().map(|(k, _)| k.0).collect::<Vec<_>>(), vec![3, 2]);
        v.verify();
    }

    #[test]
    fn test_clear_and_drain() {
        let mut v = KeyedVector::<TestKey, u64>::new();
        v.push_entry(TestKey(0), 1);
        v.push_entry(TestKey(4), 2);
        if let Some(x) = v.get_mut(TestKey(4)) {
            *x += 1;
        }
        assert_eq!(v.drain_values().collect::<Vec<_>>(), vec![1, 3]);
        assert!(v.is_empty());
        assert!(!v.contains_key(TestKey(4)));
        v.push_entry(TestKey(4), 5);
        v.clear();
        assert!(v.get(TestKey(4)).is_none());
        v.verify();
    }
}
