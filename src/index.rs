//! Traits shared by the spatial index backends.

use num::Float;

use crate::bound::Bound;
use crate::predicate::{DistancePredicate, SpatialPredicate};

/// Extracts the bound of a stored value.
///
/// Indexed values carry their own bound; pair and triple values treat
/// their first element as the bound and the rest as payload.
pub trait HasBound<T, const N: usize> {
    /// The bound of this value.
    fn bound(&self) -> Bound<T, N>;
}

impl<T: Float, const N: usize> HasBound<T, N> for Bound<T, N> {
    fn bound(&self) -> Bound<T, N> {
        *self
    }
}

impl<T: Float, const N: usize, K> HasBound<T, N> for (Bound<T, N>, K) {
    fn bound(&self) -> Bound<T, N> {
        self.0
    }
}

impl<T: Float, const N: usize, K1, K2> HasBound<T, N> for (Bound<T, N>, K1, K2) {
    fn bound(&self) -> Bound<T, N> {
        self.0
    }
}

/// A queryable container of bounded values.
///
/// Both the R-tree and the exhaustive backend implement this interface
/// with identical query semantics, which lets tests compare the two.
pub trait SpatialIndex<T: Float, const N: usize, V: HasBound<T, N>> {
    /// Insert a value.
    fn insert(&mut self, value: V);

    /// Remove every stored value whose bound and payload both match.
    fn remove(&mut self, value: &V);

    /// Remove all values.
    fn clear(&mut self);

    /// Number of stored values.
    fn len(&self) -> usize;

    /// True if nothing is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The bound enclosing every stored value. Empty when the index is
    /// empty.
    fn bounds(&self) -> Bound<T, N>;

    /// All values passing the spatial predicate.
    fn query(&self, predicate: &SpatialPredicate<T, N>) -> Vec<V>;

    /// The values nearest the predicate bound, at most
    /// `predicate.count()` of them, in ascending distance order.
    fn query_nearest(&self, predicate: &DistancePredicate<T, N>) -> Vec<V>;
}
