//! Deduplication of repeated input points.
//!
//! Collocated targets or sources only need to be indexed and matched
//! once. [`UniqueMap`] remembers which input positions were duplicates
//! so that per-point results computed on the unique subset can be
//! expanded back to the original layout.

use std::collections::HashMap;

/// Maps a duplicable input sequence onto its unique representatives.
#[derive(Default)]
pub struct UniqueMap {
    /// One representative input position per distinct value, in first
    /// occurrence order.
    unique_idx: Vec<usize>,
    /// `(duplicate_position, representative_position)` pairs.
    non_unique_map: Vec<(usize, usize)>,
}

impl UniqueMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan `points` in order, recording first occurrences and
    /// duplicates.
    ///
    /// Points are compared bit-exactly, which is the right notion for
    /// duplicated input layouts (the duplicates are copies, not nearby
    /// values).
    pub fn setup<const N: usize>(&mut self, points: &[[f64; N]]) {
        self.unique_idx.clear();
        self.non_unique_map.clear();

        let mut first_seen = HashMap::with_capacity(points.len());
        for (i, point) in points.iter().enumerate() {
            let key: [u64; N] = std::array::from_fn(|d| point[d].to_bits());
            match first_seen.get(&key) {
                None => {
                    first_seen.insert(key, i);
                    self.unique_idx.push(i);
                }
                Some(&representative) => {
                    self.non_unique_map.push((i, representative));
                }
            }
        }
    }

    /// Gather the values at the representative positions.
    pub fn reduce_to_unique<T: Clone>(&self, vin: &[T], vout: &mut Vec<T>) {
        vout.clear();
        vout.reserve(self.unique_idx.len());
        for &index in &self.unique_idx {
            vout.push(vin[index].clone());
        }
    }

    /// Scatter unique values back to the duplicated layout.
    ///
    /// `vin` holds one value per unique representative, in the order
    /// produced by [`reduce_to_unique`](UniqueMap::reduce_to_unique).
    pub fn expand_to_non_unique<T: Clone + Default>(&self, vin: &[T], vout: &mut Vec<T>) {
        vout.clear();
        vout.resize(self.num_total(), T::default());
        for (value, &index) in vin.iter().zip(&self.unique_idx) {
            vout[index] = value.clone();
        }
        for &(duplicate, representative) in &self.non_unique_map {
            vout[duplicate] = vout[representative].clone();
        }
    }

    /// Total number of input positions.
    pub fn num_total(&self) -> usize {
        self.unique_idx.len() + self.non_unique_map.len()
    }

    /// Number of distinct values.
    pub fn num_unique(&self) -> usize {
        self.unique_idx.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_setup_counts() {
        let points = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 0.0]];
        let mut map = UniqueMap::new();
        map.setup(&points);

        assert_eq!(map.num_total(), 3);
        assert_eq!(map.num_unique(), 2);
    }

    #[test]
    fn test_reduce_expand_round_trip() {
        let points: Vec<[f64; 3]> = vec![
            [0.5, 0.5, 0.5],
            [0.1, 0.2, 0.3],
            [0.5, 0.5, 0.5],
            [0.9, 0.9, 0.9],
            [0.1, 0.2, 0.3],
            [0.5, 0.5, 0.5],
        ];
        let mut map = UniqueMap::new();
        map.setup(&points);
        assert_eq!(map.num_unique(), 3);

        let mut unique = Vec::new();
        map.reduce_to_unique(&points, &mut unique);
        assert_eq!(unique.len(), 3);

        let mut expanded = Vec::new();
        map.expand_to_non_unique(&unique, &mut expanded);
        assert_eq!(expanded, points);
    }

    #[test]
    fn test_setup_resets_state() {
        let mut map = UniqueMap::new();
        map.setup(&[[0.0; 3], [0.0; 3]]);
        map.setup(&[[1.0; 3]]);
        assert_eq!(map.num_total(), 1);
        assert_eq!(map.num_unique(), 1);
    }
}
