//! Page split strategies.
//!
//! A strategy chooses two seed children for the new pages and then
//! assigns the remaining children one at a time. Both strategies are
//! parameterised at compile time by the page capacity band.

use num::Float;

use crate::bound::Bound;

/// Which of the two pages under construction receives a child.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    /// The page seeded first.
    A,
    /// The page seeded second.
    B,
}

/// Seed and placement rules used while splitting an oversized page.
pub trait SplitStrategy {
    /// Maximum number of children a page may hold.
    const MAX_CHILDREN: usize;
    /// Minimum number of children a non-root page must hold.
    const MIN_CHILDREN: usize;

    /// Choose two distinct children of the oversized page as seeds.
    ///
    /// Returns indices into `children`.
    fn pick_seeds<T: Float, const N: usize>(
        parent_bound: &Bound<T, N>,
        children: &[Bound<T, N>],
    ) -> (usize, usize);

    /// Choose the next remaining child to place and the page to place it
    /// into.
    ///
    /// Returns an index into `remaining`.
    fn pick_next<T: Float, const N: usize>(
        remaining: &[Bound<T, N>],
        a_bound: &Bound<T, N>,
        b_bound: &Bound<T, N>,
    ) -> (usize, Side);
}

/// Linear split: seed on the largest normalised separation, place in
/// list order.
pub struct Linear<const MAX: usize, const MIN: usize>;

/// Quadratic split: seed on the most wasteful pair, place the child with
/// the largest placement preference first.
pub struct Quadratic<const MAX: usize, const MIN: usize>;

impl<const MAX: usize, const MIN: usize> SplitStrategy for Linear<MAX, MIN> {
    const MAX_CHILDREN: usize = {
        assert!(MIN > 1 && MIN <= MAX / 2);
        MAX
    };
    const MIN_CHILDREN: usize = MIN;

    fn pick_seeds<T: Float, const N: usize>(
        parent_bound: &Bound<T, N>,
        children: &[Bound<T, N>],
    ) -> (usize, usize) {
        debug_assert!(children.len() > 1);

        let mut best = (0, 0);
        let mut max_scaled_length = T::neg_infinity();

        for dim in 0..N {
            // The child whose minimum is greatest and the child whose
            // maximum is least give the widest separation in this
            // dimension.
            let mut maximum_min = T::neg_infinity();
            let mut minimum_max = T::infinity();
            let mut maximum_min_child = 0;
            let mut minimum_max_child = 0;
            for (index, child) in children.iter().enumerate() {
                if child.min(dim) > maximum_min {
                    maximum_min = child.min(dim);
                    maximum_min_child = index;
                }
                if child.max(dim) < minimum_max {
                    minimum_max = child.max(dim);
                    minimum_max_child = index;
                }
            }

            let scaled_length = (minimum_max - maximum_min).abs() / parent_bound.length(dim);

            if scaled_length > max_scaled_length {
                max_scaled_length = scaled_length;
                best = (minimum_max_child, maximum_min_child);
            }
        }

        // Cartesian aligned clouds can select the same child twice.
        // Substitute the other end of the child list in that case.
        if best.0 == best.1 {
            best.1 = if best.0 == 0 { children.len() - 1 } else { 0 };
        }

        debug_assert_ne!(best.0, best.1);
        best
    }

    fn pick_next<T: Float, const N: usize>(
        remaining: &[Bound<T, N>],
        a_bound: &Bound<T, N>,
        b_bound: &Bound<T, N>,
    ) -> (usize, Side) {
        debug_assert!(!remaining.is_empty());

        let next = &remaining[0];
        let a_increase = a_bound.increase_to_hold(next);
        let b_increase = b_bound.increase_to_hold(next);
        let side = if a_increase < b_increase {
            Side::A
        } else {
            Side::B
        };
        (0, side)
    }
}

impl<const MAX: usize, const MIN: usize> SplitStrategy for Quadratic<MAX, MIN> {
    const MAX_CHILDREN: usize = {
        assert!(MIN > 1 && MIN <= MAX / 2);
        MAX
    };
    const MIN_CHILDREN: usize = MIN;

    fn pick_seeds<T: Float, const N: usize>(
        _parent_bound: &Bound<T, N>,
        children: &[Bound<T, N>],
    ) -> (usize, usize) {
        debug_assert!(children.len() > 1);

        let mut best = (0, 1);
        let mut max_wasted_area = T::neg_infinity();

        for i in 0..children.len() {
            let i_area = children[i].area();
            for j in (i + 1)..children.len() {
                let j_area = children[j].area();
                let union_area = children[i].union(&children[j]).area();
                let wasted_area = union_area - i_area - j_area;

                if wasted_area > max_wasted_area {
                    max_wasted_area = wasted_area;
                    best = (i, j);
                }
            }
        }

        best
    }

    fn pick_next<T: Float, const N: usize>(
        remaining: &[Bound<T, N>],
        a_bound: &Bound<T, N>,
        b_bound: &Bound<T, N>,
    ) -> (usize, Side) {
        debug_assert!(!remaining.is_empty());

        let mut next = 0;
        let mut side = Side::A;
        let mut max_difference = T::neg_infinity();

        for (index, child) in remaining.iter().enumerate() {
            let a_increase = a_bound.increase_to_hold(child);
            let b_increase = b_bound.increase_to_hold(child);
            let difference = (a_increase - b_increase).abs();

            if difference > max_difference {
                max_difference = difference;
                next = index;
                side = if a_increase < b_increase {
                    Side::A
                } else {
                    Side::B
                };
            }
        }

        (next, side)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    type Box3 = Bound<f64, 3>;

    fn point_cloud() -> Vec<Box3> {
        vec![
            Box3::from_point([0.0, 0.0, 0.0]),
            Box3::from_point([0.1, 0.1, 0.1]),
            Box3::from_point([0.9, 0.9, 0.9]),
            Box3::from_point([1.0, 1.0, 1.0]),
        ]
    }

    #[test]
    fn test_quadratic_seeds_pick_extremes() {
        let children = point_cloud();
        let parent = children
            .iter()
            .fold(Box3::empty(), |mut acc, b| {
                acc.stretch(b);
                acc
            });
        let (a, b) = Quadratic::<10, 4>::pick_seeds(&parent, &children);
        assert_eq!((a, b), (0, 3));
    }

    #[test]
    fn test_linear_seeds_are_distinct_on_degenerate_cloud() {
        // All children share the same bound, which forces the
        // same-child substitution path.
        let children = vec![Box3::from_point([0.5; 3]); 5];
        let parent = Box3::new([0.0; 3], [1.0; 3]);
        let (a, b) = Linear::<10, 4>::pick_seeds(&parent, &children);
        assert_ne!(a, b);
    }

    #[test]
    fn test_quadratic_pick_next_prefers_decisive_child() {
        let a_bound = Box3::new([0.0; 3], [0.2; 3]);
        let b_bound = Box3::new([0.8; 3], [1.0; 3]);
        let remaining = vec![
            Box3::from_point([0.5; 3]),
            Box3::from_point([0.95; 3]),
        ];
        let (index, side) = Quadratic::<10, 4>::pick_next(&remaining, &a_bound, &b_bound);
        // The point near B needs almost no growth there, so it is the
        // decisive placement.
        assert_eq!(index, 1);
        assert_eq!(side, Side::B);
    }

    #[test]
    fn test_linear_pick_next_takes_first() {
        let a_bound = Box3::new([0.0; 3], [0.2; 3]);
        let b_bound = Box3::new([0.8; 3], [1.0; 3]);
        let remaining = vec![
            Box3::from_point([0.1; 3]),
            Box3::from_point([0.95; 3]),
        ];
        let (index, side) = Linear::<10, 4>::pick_next(&remaining, &a_bound, &b_bound);
        assert_eq!(index, 0);
        assert_eq!(side, Side::A);
    }
}
