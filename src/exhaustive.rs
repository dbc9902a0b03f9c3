//! A flat-list index with the same query semantics as the R-tree.
//!
//! Every query sweeps all stored values, so it is O(N) per query and
//! exists to serve small inputs and as the reference the tree is tested
//! against.

use num::Float;

use crate::bound::Bound;
use crate::index::{HasBound, SpatialIndex};
use crate::multiset::TruncatedMultiSet;
use crate::predicate::{DistancePredicate, SpatialPredicate};

/// Exhaustive-scan spatial index.
pub struct Exhaustive<T, const N: usize, V> {
    values: Vec<V>,
    bound: Bound<T, N>,
}

/// The exhaustive index over the pipeline's coordinate type.
pub type Exhaustive3<V> = Exhaustive<f64, 3, V>;

impl<T: Float, const N: usize, V: HasBound<T, N> + Clone + PartialEq> Default
    for Exhaustive<T, N, V>
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Float, const N: usize, V: HasBound<T, N> + Clone + PartialEq> Exhaustive<T, N, V> {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            bound: Bound::empty(),
        }
    }

    fn restretch(&mut self) {
        self.bound.reset();
        for value in &self.values {
            self.bound.stretch(&value.bound());
        }
    }
}

impl<T, const N: usize, V> SpatialIndex<T, N, V> for Exhaustive<T, N, V>
where
    T: Float,
    V: HasBound<T, N> + Clone + PartialEq,
{
    fn insert(&mut self, value: V) {
        self.bound.stretch(&value.bound());
        self.values.push(value);
    }

    fn remove(&mut self, value: &V) {
        self.values.retain(|stored| stored != value);
        self.restretch();
    }

    fn clear(&mut self) {
        self.values.clear();
        self.bound.reset();
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn bounds(&self) -> Bound<T, N> {
        self.bound
    }

    fn query(&self, predicate: &SpatialPredicate<T, N>) -> Vec<V> {
        self.values
            .iter()
            .filter(|value| predicate.evaluate(&value.bound(), true))
            .cloned()
            .collect()
    }

    fn query_nearest(&self, predicate: &DistancePredicate<T, N>) -> Vec<V> {
        let mut min_set = TruncatedMultiSet::new(predicate.count());
        for value in &self.values {
            min_set.insert(predicate.evaluate(&value.bound(), true), value.clone());
        }
        min_set.into_values().collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::predicate;
    use crate::rtree::RTree3;
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    type Box3 = Bound<f64, 3>;
    type Value = (Box3, usize);

    #[test]
    fn test_empty_queries() {
        let index: Exhaustive3<Value> = Exhaustive::new();
        let probe = Box3::new([0.0; 3], [1.0; 3]);
        assert!(index.query(&predicate::intersects(probe)).is_empty());
        assert!(index
            .query_nearest(&predicate::nearest(probe, 5))
            .is_empty());
    }

    #[test]
    fn test_remove_restretches() {
        let mut index: Exhaustive3<Value> = Exhaustive::new();
        let near = (Box3::from_point([0.0; 3]), 0);
        let far = (Box3::from_point([10.0; 3]), 1);
        index.insert(near.clone());
        index.insert(far.clone());
        assert_eq!(index.bounds().max(0), 10.0);

        index.remove(&far);
        assert_eq!(index.len(), 1);
        assert_eq!(index.bounds().max(0), 0.0);
    }

    #[test]
    fn test_tree_and_exhaustive_agree_on_nearest() {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let mut tree: RTree3<Value> = RTree3::new();
        let mut flat: Exhaustive3<Value> = Exhaustive::new();

        for i in 0..200 {
            let p = [rng.gen::<f64>(), rng.gen::<f64>(), rng.gen::<f64>()];
            let value = (Box3::from_point(p), i);
            tree.insert(value.clone());
            flat.insert(value);
        }

        for _ in 0..50 {
            let probe = Box3::from_point([
                rng.gen::<f64>(),
                rng.gen::<f64>(),
                rng.gen::<f64>(),
            ]);
            let pred = predicate::nearest(probe, 7);

            let mut from_tree: Vec<f64> = tree
                .query_nearest(&pred)
                .iter()
                .map(|(b, _)| probe.nearest(b))
                .collect();
            let mut from_flat: Vec<f64> = flat
                .query_nearest(&pred)
                .iter()
                .map(|(b, _)| probe.nearest(b))
                .collect();
            from_tree.sort_by(|a, b| a.partial_cmp(b).unwrap());
            from_flat.sort_by(|a, b| a.partial_cmp(b).unwrap());
            assert_eq!(from_tree, from_flat);
        }
    }

    #[test]
    fn test_tree_and_exhaustive_agree_on_containment() {
        let mut rng = ChaCha8Rng::seed_from_u64(18);
        let mut tree: RTree3<Value> = RTree3::new();
        let mut flat: Exhaustive3<Value> = Exhaustive::new();

        for i in 0..100 {
            let p = [rng.gen::<f64>(), rng.gen::<f64>(), rng.gen::<f64>()];
            let value = (Box3::from_point(p), i);
            tree.insert(value.clone());
            flat.insert(value);
        }

        let probe = Box3::new([0.2; 3], [0.8; 3]);
        let pred = predicate::contained_by_non_inclusive(probe);

        let mut from_tree: Vec<usize> =
            tree.query(&pred).into_iter().map(|(_, i)| i).collect();
        let mut from_flat: Vec<usize> =
            flat.query(&pred).into_iter().map(|(_, i)| i).collect();
        from_tree.sort_unstable();
        from_flat.sort_unstable();
        assert_eq!(from_tree, from_flat);
    }
}
