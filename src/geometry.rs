//! Point and bound types shared across the distributed pipeline.

use mpi::traits::Equivalence;

use crate::bound::Bound;

/// The box type used by the distributed pipeline.
pub type Box3 = Bound<f64, 3>;

/// Definition of a point.
#[derive(Clone, Copy, Default, Equivalence)]
pub struct Point {
    coords: [f64; 3],
    global_id: usize,
}

impl Point {
    /// Create a new point from coordinates and global id.
    pub fn new(coords: [f64; 3], global_id: usize) -> Self {
        Self { coords, global_id }
    }

    /// Return the coordinates of the point.
    pub fn coords(&self) -> [f64; 3] {
        self.coords
    }

    /// Return the global id of the point.
    pub fn global_id(&self) -> usize {
        self.global_id
    }

    /// The degenerate box holding this point.
    pub fn bound(&self) -> Box3 {
        Box3::from_point(self.coords)
    }
}

/// A bound in wire form.
///
/// [`Bound`] is generic and cannot derive an MPI datatype, so bounds
/// cross rank boundaries as flat min/max corner pairs.
#[derive(Clone, Copy, Equivalence)]
pub struct BoundRecord {
    min: [f64; 3],
    max: [f64; 3],
}

impl From<Box3> for BoundRecord {
    fn from(bound: Box3) -> Self {
        Self {
            min: bound.min_corner(),
            max: bound.max_corner(),
        }
    }
}

impl From<BoundRecord> for Box3 {
    fn from(record: BoundRecord) -> Self {
        Box3::new(record.min, record.max)
    }
}

impl Default for BoundRecord {
    fn default() -> Self {
        Box3::empty().into()
    }
}

/// A strided view over caller owned coordinate and weight storage.
///
/// The caller decides the memory layout; interleaved `xyzxyz...` storage
/// is viewed with offset slices and a stride of three, separate
/// component arrays with a stride of one. Weights are optional and
/// default to one.
#[derive(Clone, Copy)]
pub struct PointsView<'a> {
    len: usize,
    x: &'a [f64],
    xinc: usize,
    y: &'a [f64],
    yinc: usize,
    z: &'a [f64],
    zinc: usize,
    weights: Option<(&'a [f64], usize)>,
}

impl<'a> PointsView<'a> {
    /// Create a view over `len` points.
    ///
    /// Panics if a component slice is too short for the requested
    /// stride.
    pub fn new(
        len: usize,
        x: &'a [f64],
        xinc: usize,
        y: &'a [f64],
        yinc: usize,
        z: &'a [f64],
        zinc: usize,
    ) -> Self {
        if len > 0 {
            assert!((len - 1) * xinc < x.len());
            assert!((len - 1) * yinc < y.len());
            assert!((len - 1) * zinc < z.len());
        }
        Self {
            len,
            x,
            xinc,
            y,
            yinc,
            z,
            zinc,
            weights: None,
        }
    }

    /// View over interleaved `xyzxyz...` storage.
    pub fn interleaved(coords: &'a [f64]) -> Self {
        assert_eq!(coords.len() % 3, 0);
        let len = coords.len() / 3;
        if len == 0 {
            return Self::new(0, coords, 3, coords, 3, coords, 3);
        }
        Self::new(len, coords, 3, &coords[1..], 3, &coords[2..], 3)
    }

    /// Attach a strided weight array.
    pub fn with_weights(mut self, weights: &'a [f64], winc: usize) -> Self {
        if self.len > 0 {
            assert!((self.len - 1) * winc < weights.len());
        }
        self.weights = Some((weights, winc));
        self
    }

    /// Number of points in the view.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the view holds no points.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Coordinates of the i-th point.
    pub fn coords(&self, i: usize) -> [f64; 3] {
        [
            self.x[i * self.xinc],
            self.y[i * self.yinc],
            self.z[i * self.zinc],
        ]
    }

    /// Weight of the i-th point, one if no weights were attached.
    pub fn weight(&self, i: usize) -> f64 {
        match self.weights {
            Some((weights, winc)) => weights[i * winc],
            None => 1.0,
        }
    }

    /// Collect the viewed coordinates into owned points.
    pub fn to_coords(&self) -> Vec<[f64; 3]> {
        (0..self.len).map(|i| self.coords(i)).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_interleaved_view() {
        let coords = vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let view = PointsView::interleaved(&coords);
        assert_eq!(view.len(), 2);
        assert_eq!(view.coords(0), [0.0, 1.0, 2.0]);
        assert_eq!(view.coords(1), [3.0, 4.0, 5.0]);
        assert_eq!(view.weight(1), 1.0);
    }

    #[test]
    fn test_component_view_with_weights() {
        let x = vec![0.0, 1.0];
        let y = vec![10.0, 11.0];
        let z = vec![20.0, 21.0];
        let w = vec![2.0, 3.0];
        let view = PointsView::new(2, &x, 1, &y, 1, &z, 1).with_weights(&w, 1);
        assert_eq!(view.coords(1), [1.0, 11.0, 21.0]);
        assert_eq!(view.weight(0), 2.0);
        assert_eq!(view.weight(1), 3.0);
    }

    #[test]
    fn test_bound_record_round_trip() {
        let bound = Box3::new([0.0, 1.0, 2.0], [3.0, 4.0, 5.0]);
        let record = BoundRecord::from(bound);
        let back: Box3 = record.into();
        assert_eq!(back, bound);
    }
}
