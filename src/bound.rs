//! Axis-aligned bounding boxes and their geometric predicates.

use num::Float;

/// One representable floating point step in each direction.
///
/// Used to seal a domain so that no input point coincides exactly with
/// a face of the enclosing box.
pub trait Nudge {
    /// The adjacent representable value toward positive infinity.
    fn step_up(self) -> Self;
    /// The adjacent representable value toward negative infinity.
    fn step_down(self) -> Self;
}

impl Nudge for f64 {
    fn step_up(self) -> Self {
        self.next_up()
    }
    fn step_down(self) -> Self {
        self.next_down()
    }
}

impl Nudge for f32 {
    fn step_up(self) -> Self {
        self.next_up()
    }
    fn step_down(self) -> Self {
        self.next_down()
    }
}

/// An axis-aligned box in `N` dimensions.
///
/// A box is described by its minimum and maximum corner. The default
/// value is the *empty* box (`min = +inf`, `max = -inf`) so that the
/// first [`stretch`](Bound::stretch) absorbs its argument exactly.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bound<T, const N: usize> {
    min: [T; N],
    max: [T; N],
}

impl<T: Float, const N: usize> Default for Bound<T, N> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Float, const N: usize> Bound<T, N> {
    /// Create a new box from its two corners.
    pub fn new(min: [T; N], max: [T; N]) -> Self {
        Self { min, max }
    }

    /// Create the degenerate box holding a single point.
    pub fn from_point(point: [T; N]) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// The empty box which any valid box stretches past.
    pub fn empty() -> Self {
        Self {
            min: [T::infinity(); N],
            max: [T::neg_infinity(); N],
        }
    }

    /// Minimum coordinate in the given dimension.
    pub fn min(&self, dim: usize) -> T {
        self.min[dim]
    }

    /// Maximum coordinate in the given dimension.
    pub fn max(&self, dim: usize) -> T {
        self.max[dim]
    }

    /// Center coordinate in the given dimension.
    pub fn center(&self, dim: usize) -> T {
        let half = T::from(0.5).unwrap();
        half * (self.max[dim] + self.min[dim])
    }

    /// Side length in the given dimension.
    pub fn length(&self, dim: usize) -> T {
        self.max[dim] - self.min[dim]
    }

    /// The minimum corner.
    pub fn min_corner(&self) -> [T; N] {
        self.min
    }

    /// The maximum corner.
    pub fn max_corner(&self) -> [T; N] {
        self.max
    }

    /// Assign both corners.
    pub fn set(&mut self, min: [T; N], max: [T; N]) {
        self.min = min;
        self.max = max;
    }

    /// Reset to the empty box.
    pub fn reset(&mut self) {
        *self = Self::empty();
    }

    /// True if any dimension is inverted, as in the empty box.
    pub fn is_empty(&self) -> bool {
        (0..N).any(|i| self.min[i] > self.max[i])
    }

    /// Product of the side lengths.
    pub fn area(&self) -> T {
        let mut s = self.max[0] - self.min[0];
        for i in 1..N {
            s = s * (self.max[i] - self.min[i]);
        }
        s
    }

    /// Index of the dimension with the largest side length.
    ///
    /// Ties resolve toward the lower index.
    pub fn longest_dimension(&self) -> usize {
        let mut ans = 0;
        let mut cur_max = self.length(0);
        for i in 1..N {
            if self.length(i) > cur_max {
                cur_max = self.length(i);
                ans = i;
            }
        }
        ans
    }

    /// Grow this box in place so that it encloses `other`.
    pub fn stretch(&mut self, other: &Self) {
        for i in 0..N {
            self.min[i] = self.min[i].min(other.min[i]);
            self.max[i] = self.max[i].max(other.max[i]);
        }
    }

    /// Expand uniformly about the center so that every half-extent is
    /// multiplied by `factor`.
    pub fn scale(&mut self, factor: T) {
        let half = T::from(0.5).unwrap();
        for i in 0..N {
            let center = half * (self.max[i] + self.min[i]);
            let half_extent = factor * half * (self.max[i] - self.min[i]);
            self.min[i] = center - half_extent;
            self.max[i] = center + half_extent;
        }
    }

    /// True if the boxes do not touch anywhere.
    pub fn disjoint(&self, other: &Self) -> bool {
        for i in 0..N {
            if self.max[i] < other.min[i] || other.max[i] < self.min[i] {
                return true;
            }
        }
        false
    }

    /// True if the boxes touch or overlap in every dimension.
    pub fn intersects(&self, other: &Self) -> bool {
        for i in 0..N {
            if self.min[i] > other.max[i] || self.max[i] < other.min[i] {
                return false;
            }
        }
        true
    }

    /// True if the boxes overlap with positive extent in every dimension.
    pub fn overlaps(&self, other: &Self) -> bool {
        for i in 0..N {
            if self.min[i] >= other.max[i] || self.max[i] <= other.min[i] {
                return false;
            }
        }
        true
    }

    /// True if this box fully contains `other`, faces inclusive.
    pub fn contains(&self, other: &Self) -> bool {
        for i in 0..N {
            if self.min[i] > other.min[i] || self.max[i] < other.max[i] {
                return false;
            }
        }
        true
    }

    /// True if this box contains `other` without touching on the maximum
    /// face.
    ///
    /// For degenerate point boxes this assigns a point lying on a shared
    /// face to exactly one of two adjacent boxes.
    pub fn contains_non_inclusive(&self, other: &Self) -> bool {
        for i in 0..N {
            if self.min[i] > other.min[i] || self.max[i] <= other.max[i] {
                return false;
            }
        }
        true
    }

    /// True if this box extends strictly past `other` in every direction.
    pub fn covers(&self, other: &Self) -> bool {
        for i in 0..N {
            if self.min[i] >= other.min[i] || self.max[i] <= other.max[i] {
                return false;
            }
        }
        true
    }

    /// Squared Euclidean distance between the closest points of the two
    /// boxes. Zero if they touch or overlap.
    pub fn nearest(&self, other: &Self) -> T {
        let mut dist_sq = T::zero();
        for i in 0..N {
            let below = (other.min[i] - self.max[i]).max(T::zero());
            let above = (self.min[i] - other.max[i]).max(T::zero());
            let d = below.max(above);
            dist_sq = dist_sq + d * d;
        }
        dist_sq
    }

    /// Squared Euclidean distance between the box centers.
    pub fn centroid(&self, other: &Self) -> T {
        let half = T::from(0.5).unwrap();
        let mut dist_sq = T::zero();
        for i in 0..N {
            let d = half * (self.max[i] + self.min[i] - other.max[i] - other.min[i]);
            dist_sq = dist_sq + d * d;
        }
        dist_sq
    }

    /// Squared Euclidean distance between the farthest points of the two
    /// boxes.
    ///
    /// A dimension in which one box lies inside the other contributes
    /// nothing, so nested boxes have a furthest distance of zero.
    pub fn furthest(&self, other: &Self) -> T {
        let mut dist_sq = T::zero();
        for i in 0..N {
            if (self.max[i] < other.max[i]) != (other.min[i] < self.min[i]) {
                let above = (other.max[i] - self.min[i]) * (other.max[i] - self.min[i]);
                let below = (other.min[i] - self.max[i]) * (other.min[i] - self.max[i]);
                dist_sq = dist_sq + above.max(below);
            }
        }
        dist_sq
    }

    /// The smallest box enclosing both boxes.
    pub fn union(&self, other: &Self) -> Self {
        let mut ans = *self;
        ans.stretch(other);
        ans
    }

    /// The area growth this box would undergo to also hold `other`.
    pub fn increase_to_hold(&self, other: &Self) -> T {
        self.union(other).area() - self.area()
    }
}

impl<T: Float + Nudge, const N: usize> Bound<T, N> {
    /// Nudge every face one representable step outward.
    pub fn next_larger(&mut self) {
        for i in 0..N {
            self.min[i] = self.min[i].step_down();
            self.max[i] = self.max[i].step_up();
        }
    }

    /// Nudge every face one representable step inward.
    pub fn next_smaller(&mut self) {
        for i in 0..N {
            self.min[i] = self.min[i].step_up();
            self.max[i] = self.max[i].step_down();
        }
    }
}

/// Ordering used to arrange the final partition boxes.
///
/// Scans the dimensions in order and reports `a` before `b` as soon as a
/// dimension with `a.min < b.min` is found. This is not a total order on
/// arbitrary boxes, but it is consistent on the interior-disjoint boxes
/// a bisection produces, and every rank applies it to the same sequence.
pub fn min_less<T: Float, const N: usize>(a: &Bound<T, N>, b: &Bound<T, N>) -> bool {
    for i in 0..N {
        if a.min(i) < b.min(i) {
            return true;
        }
    }
    false
}

impl<T: Float + std::fmt::Display, const N: usize> std::fmt::Display for Bound<T, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "min(")?;
        for i in 0..N {
            write!(f, " {}", self.min[i])?;
        }
        write!(f, ") max(")?;
        for i in 0..N {
            write!(f, " {}", self.max[i])?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    type Box3 = Bound<f64, 3>;

    fn unit() -> Box3 {
        Box3::new([0.0; 3], [1.0; 3])
    }

    #[test]
    fn test_empty_stretch_absorbs() {
        let mut b = Box3::empty();
        assert!(b.is_empty());
        let other = Box3::new([0.25, 0.5, -1.0], [0.75, 2.0, 0.0]);
        b.stretch(&other);
        assert_eq!(b, other);
        assert!(!b.is_empty());
        assert!(!Box3::from_point([1.0; 3]).is_empty());
    }

    #[test]
    fn test_disjoint_and_intersects() {
        let a = unit();
        let touching = Box3::new([1.0, 0.0, 0.0], [2.0, 1.0, 1.0]);
        let apart = Box3::new([1.5, 0.0, 0.0], [2.0, 1.0, 1.0]);

        assert!(!a.disjoint(&touching));
        assert!(a.intersects(&touching));
        assert!(!a.overlaps(&touching));

        assert!(a.disjoint(&apart));
        assert!(!a.intersects(&apart));
    }

    #[test]
    fn test_containment_flavours() {
        let a = unit();
        let inner = Box3::new([0.25; 3], [0.75; 3]);
        let on_max_face = Box3::from_point([1.0, 0.5, 0.5]);
        let on_min_face = Box3::from_point([0.0, 0.5, 0.5]);

        assert!(a.contains(&inner));
        assert!(a.contains_non_inclusive(&inner));
        assert!(a.covers(&inner));

        assert!(a.contains(&on_max_face));
        assert!(!a.contains_non_inclusive(&on_max_face));
        assert!(a.contains_non_inclusive(&on_min_face));
        assert!(!a.covers(&on_min_face));
    }

    #[test]
    fn test_nearest_distance() {
        let a = unit();
        let b = Box3::new([2.0, 0.0, 0.0], [3.0, 1.0, 1.0]);
        assert_eq!(a.nearest(&b), 1.0);

        let c = Box3::new([2.0, 2.0, 0.0], [3.0, 3.0, 1.0]);
        assert_eq!(a.nearest(&c), 2.0);

        let overlapping = Box3::new([0.5; 3], [1.5; 3]);
        assert_eq!(a.nearest(&overlapping), 0.0);
    }

    #[test]
    fn test_furthest_nested_is_zero() {
        let a = unit();
        let inner = Box3::new([0.25; 3], [0.75; 3]);
        assert_eq!(a.furthest(&inner), 0.0);
    }

    #[test]
    fn test_area_and_longest_dimension() {
        let b = Box3::new([0.0, 0.0, 0.0], [2.0, 4.0, 1.0]);
        assert_eq!(b.area(), 8.0);
        assert_eq!(b.longest_dimension(), 1);

        // Ties go to the lower index.
        let tied = Box3::new([0.0; 3], [2.0, 2.0, 1.0]);
        assert_eq!(tied.longest_dimension(), 0);
    }

    #[test]
    fn test_increase_to_hold() {
        let a = unit();
        let b = Box3::new([0.0, 0.0, 0.0], [2.0, 1.0, 1.0]);
        assert_eq!(a.increase_to_hold(&b), 1.0);
        assert_eq!(a.increase_to_hold(&a), 0.0);
    }

    #[test]
    fn test_next_larger_escapes_faces() {
        let mut b = unit();
        b.next_larger();
        let point = Box3::from_point([1.0, 0.5, 0.5]);
        assert!(b.contains_non_inclusive(&point));
        assert!(b.min(0) < 0.0);
        assert!(b.max(0) > 1.0);

        b.next_smaller();
        assert_eq!(b, unit());
    }

    #[test]
    fn test_centroid_distance() {
        let a = unit();
        let b = Box3::new([1.0, 0.0, 0.0], [2.0, 1.0, 1.0]);
        assert_eq!(a.centroid(&b), 1.0);
        assert_eq!(a.centroid(&a), 0.0);
    }

    #[test]
    fn test_scale_preserves_center() {
        use approx::assert_relative_eq;

        let mut b = Box3::new([0.0, 2.0, -1.0], [1.0, 4.0, 1.0]);
        b.scale(1.10);
        assert_relative_eq!(b.center(0), 0.5, epsilon = 1e-12);
        assert_relative_eq!(b.center(1), 3.0, epsilon = 1e-12);
        assert_relative_eq!(b.length(0), 1.1, epsilon = 1e-12);
        assert_relative_eq!(b.length(2), 2.2, epsilon = 1e-12);
    }

    #[test]
    fn test_min_less_ordering() {
        let a = Box3::new([0.0; 3], [1.0; 3]);
        let b = Box3::new([1.0, 0.0, 0.0], [2.0, 1.0, 1.0]);
        assert!(min_less(&a, &b));
        assert!(!min_less(&b, &a));
    }
}
