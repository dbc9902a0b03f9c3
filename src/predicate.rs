//! Predicates steering spatial index traversals.
//!
//! A predicate carries a reference bound and two evaluation rules, one
//! for interior nodes and one for leaves. The interior rule is allowed
//! to be weaker than the leaf rule so that a traversal can descend into
//! any subtree that might still hold a qualifying leaf.

use num::Float;

use crate::bound::Bound;

/// The boolean test a spatial predicate applies to a candidate bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SpatialOp {
    All,
    Disjoint,
    Intersects,
    Overlaps,
    Contains,
    ContainedBy,
    ContainedByNonInclusive,
    Covers,
    CoveredBy,
    Equals,
}

/// Boolean predicate for containment style queries.
#[derive(Clone, Copy, Debug)]
pub struct SpatialPredicate<T, const N: usize> {
    bound: Bound<T, N>,
    node_op: SpatialOp,
    leaf_op: SpatialOp,
}

impl<T: Float, const N: usize> SpatialPredicate<T, N> {
    /// Evaluate the predicate against a candidate bound.
    pub fn evaluate(&self, candidate: &Bound<T, N>, is_leaf: bool) -> bool {
        let op = if is_leaf { self.leaf_op } else { self.node_op };
        match op {
            SpatialOp::All => true,
            SpatialOp::Disjoint => candidate.disjoint(&self.bound),
            SpatialOp::Intersects => candidate.intersects(&self.bound),
            SpatialOp::Overlaps => candidate.overlaps(&self.bound),
            SpatialOp::Contains => candidate.contains(&self.bound),
            SpatialOp::ContainedBy => self.bound.contains(candidate),
            SpatialOp::ContainedByNonInclusive => self.bound.contains_non_inclusive(candidate),
            SpatialOp::Covers => candidate.covers(&self.bound),
            SpatialOp::CoveredBy => self.bound.covers(candidate),
            SpatialOp::Equals => candidate == &self.bound,
        }
    }

    /// The reference bound the predicate was built from.
    pub fn bound(&self) -> &Bound<T, N> {
        &self.bound
    }
}

/// Distance predicate for k-nearest-neighbour queries.
///
/// Evaluates to the squared Euclidean distance between the candidate
/// bound and the reference bound, and carries the number of neighbours
/// requested.
#[derive(Clone, Copy, Debug)]
pub struct DistancePredicate<T, const N: usize> {
    bound: Bound<T, N>,
    count: usize,
}

impl<T: Float, const N: usize> DistancePredicate<T, N> {
    /// Evaluate the distance metric against a candidate bound.
    ///
    /// The leaf flag is accepted for symmetry with the spatial
    /// predicate; the nearest metric does not distinguish the two.
    pub fn evaluate(&self, candidate: &Bound<T, N>, _is_leaf: bool) -> T {
        candidate.nearest(&self.bound)
    }

    /// Number of neighbours requested.
    pub fn count(&self) -> usize {
        self.count
    }

    /// The reference bound the predicate was built from.
    pub fn bound(&self) -> &Bound<T, N> {
        &self.bound
    }
}

/// All bounds disjoint from `bound`.
pub fn disjoint<T: Float, const N: usize>(bound: Bound<T, N>) -> SpatialPredicate<T, N> {
    SpatialPredicate {
        bound,
        node_op: SpatialOp::All,
        leaf_op: SpatialOp::Disjoint,
    }
}

/// All bounds touching `bound` anywhere.
pub fn intersects<T: Float, const N: usize>(bound: Bound<T, N>) -> SpatialPredicate<T, N> {
    SpatialPredicate {
        bound,
        node_op: SpatialOp::Intersects,
        leaf_op: SpatialOp::Intersects,
    }
}

/// All bounds overlapping `bound` with positive extent.
pub fn overlaps<T: Float, const N: usize>(bound: Bound<T, N>) -> SpatialPredicate<T, N> {
    SpatialPredicate {
        bound,
        node_op: SpatialOp::Overlaps,
        leaf_op: SpatialOp::Overlaps,
    }
}

/// All bounds which fully contain `bound`.
pub fn contains<T: Float, const N: usize>(bound: Bound<T, N>) -> SpatialPredicate<T, N> {
    SpatialPredicate {
        bound,
        node_op: SpatialOp::Contains,
        leaf_op: SpatialOp::Contains,
    }
}

/// All bounds contained inside `bound`, faces inclusive.
pub fn contained_by<T: Float, const N: usize>(bound: Bound<T, N>) -> SpatialPredicate<T, N> {
    SpatialPredicate {
        bound,
        node_op: SpatialOp::Intersects,
        leaf_op: SpatialOp::ContainedBy,
    }
}

/// All bounds contained inside `bound` without touching its maximum face.
///
/// With degenerate point bounds this assigns a point on a shared face to
/// exactly one of two adjacent query boxes, which is what the partition
/// ownership test requires.
pub fn contained_by_non_inclusive<T: Float, const N: usize>(
    bound: Bound<T, N>,
) -> SpatialPredicate<T, N> {
    SpatialPredicate {
        bound,
        node_op: SpatialOp::Intersects,
        leaf_op: SpatialOp::ContainedByNonInclusive,
    }
}

/// All bounds which strictly cover `bound`.
pub fn covers<T: Float, const N: usize>(bound: Bound<T, N>) -> SpatialPredicate<T, N> {
    SpatialPredicate {
        bound,
        node_op: SpatialOp::Covers,
        leaf_op: SpatialOp::Covers,
    }
}

/// All bounds strictly covered by `bound`.
pub fn covered_by<T: Float, const N: usize>(bound: Bound<T, N>) -> SpatialPredicate<T, N> {
    SpatialPredicate {
        bound,
        node_op: SpatialOp::Overlaps,
        leaf_op: SpatialOp::CoveredBy,
    }
}

/// All bounds equal to `bound`.
pub fn equals<T: Float, const N: usize>(bound: Bound<T, N>) -> SpatialPredicate<T, N> {
    SpatialPredicate {
        bound,
        node_op: SpatialOp::Intersects,
        leaf_op: SpatialOp::Equals,
    }
}

/// The `count` bounds nearest to `bound` in squared Euclidean distance.
pub fn nearest<T: Float, const N: usize>(
    bound: Bound<T, N>,
    count: usize,
) -> DistancePredicate<T, N> {
    DistancePredicate { bound, count }
}

#[cfg(test)]
mod test {
    use super::*;

    type Box3 = Bound<f64, 3>;

    #[test]
    fn test_contained_by_prunes_with_intersection() {
        let query = Box3::new([0.0; 3], [1.0; 3]);
        let pred = contained_by(query);

        // A page bound poking out of the query box may still hold
        // contained leaves, so the node test passes on intersection.
        let page = Box3::new([0.5; 3], [2.0; 3]);
        assert!(pred.evaluate(&page, false));
        assert!(!pred.evaluate(&page, true));
    }

    #[test]
    fn test_contained_by_non_inclusive_excludes_max_face() {
        let query = Box3::new([0.0; 3], [1.0; 3]);
        let pred = contained_by_non_inclusive(query);

        let on_max = Box3::from_point([1.0, 0.5, 0.5]);
        let on_min = Box3::from_point([0.0, 0.5, 0.5]);
        assert!(!pred.evaluate(&on_max, true));
        assert!(pred.evaluate(&on_min, true));
        // Both still pass the interior pruning test.
        assert!(pred.evaluate(&on_max, false));
    }

    #[test]
    fn test_disjoint_descends_everywhere() {
        let query = Box3::new([0.0; 3], [1.0; 3]);
        let pred = disjoint(query);

        let anywhere = Box3::new([0.2; 3], [0.4; 3]);
        assert!(pred.evaluate(&anywhere, false));
        assert!(!pred.evaluate(&anywhere, true));

        let apart = Box3::new([5.0; 3], [6.0; 3]);
        assert!(pred.evaluate(&apart, true));
    }

    #[test]
    fn test_symmetric_factories() {
        let query = Box3::new([0.0; 3], [1.0; 3]);
        let touching = Box3::new([1.0, 0.0, 0.0], [2.0, 1.0, 1.0]);
        let big = Box3::new([-1.0; 3], [2.0; 3]);
        let small = Box3::new([0.25; 3], [0.75; 3]);

        assert!(intersects(query).evaluate(&touching, true));
        assert!(!overlaps(query).evaluate(&touching, true));

        // `contains` accepts candidates which hold the query bound,
        // `covered_by` candidates strictly inside it.
        assert!(contains(query).evaluate(&big, true));
        assert!(!contains(query).evaluate(&small, true));
        assert!(covers(query).evaluate(&big, true));
        assert!(covered_by(query).evaluate(&small, true));
        assert!(!covered_by(query).evaluate(&big, true));

        assert!(equals(query).evaluate(&query, true));
        assert!(!equals(query).evaluate(&small, true));
    }

    #[test]
    fn test_nearest_metric_and_count() {
        let query = Box3::from_point([0.0; 3]);
        let pred = nearest(query, 7);
        assert_eq!(pred.count(), 7);

        let candidate = Box3::from_point([3.0, 4.0, 0.0]);
        assert_eq!(pred.evaluate(&candidate, true), 25.0);
    }
}
