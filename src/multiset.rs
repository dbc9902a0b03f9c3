//! An ordered multiset that keeps only the smallest keys.

/// Ordered multiset of `(key, value)` pairs with a size cap.
///
/// After every insertion the elements past position `capacity` (the ones
/// with the largest keys) are discarded. Elements with equal keys keep
/// their insertion order, so the truncation is deterministic.
pub struct TruncatedMultiSet<K, V> {
    items: Vec<(K, V)>,
    capacity: usize,
}

impl<K: PartialOrd + Copy, V> TruncatedMultiSet<K, V> {
    /// Create a multiset holding at most `capacity` elements.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity.saturating_add(1)),
            capacity,
        }
    }

    /// Insert a pair, then drop any elements past the capacity.
    pub fn insert(&mut self, key: K, value: V) {
        let pos = self.items.partition_point(|(k, _)| *k <= key);
        self.items.insert(pos, (key, value));
        self.items.truncate(self.capacity);
    }

    /// Number of retained elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The size cap.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The largest retained key.
    pub fn last_key(&self) -> Option<K> {
        self.items.last().map(|(k, _)| *k)
    }

    /// Remove all elements.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Iterate over the retained pairs in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = &(K, V)> {
        self.items.iter()
    }

    /// Consume the set, yielding the values in ascending key order.
    pub fn into_values(self) -> impl Iterator<Item = V> {
        self.items.into_iter().map(|(_, v)| v)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_truncates_to_capacity() {
        let mut set = TruncatedMultiSet::new(3);
        for key in [5.0, 1.0, 4.0, 2.0, 3.0] {
            set.insert(key, key as i32);
        }
        assert_eq!(set.len(), 3);
        let keys: Vec<f64> = set.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![1.0, 2.0, 3.0]);
        assert_eq!(set.last_key(), Some(3.0));
    }

    #[test]
    fn test_equal_keys_keep_insertion_order() {
        let mut set = TruncatedMultiSet::new(4);
        set.insert(1.0, "a");
        set.insert(1.0, "b");
        set.insert(0.5, "c");
        set.insert(1.0, "d");
        let values: Vec<&str> = set.into_values().collect();
        assert_eq!(values, vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn test_clear() {
        let mut set = TruncatedMultiSet::new(2);
        set.insert(1.0, 1);
        set.clear();
        assert!(set.is_empty());
        assert_eq!(set.last_key(), None);
    }
}
