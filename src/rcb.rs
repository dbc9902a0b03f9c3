//! Recursive coordinate bisection across MPI ranks.
//!
//! Every rank contributes its local point cloud; the result is one box
//! per rank whose interiors are disjoint and whose union covers the
//! sealed global domain. Splits happen along the longest dimension of
//! the pending box at the weight-weighted mean of the per-rank median
//! candidates.

use itertools::Itertools;
use mpi::collective::SystemOperation;
use mpi::traits::CommunicatorCollectives;

use crate::bound::min_less;
use crate::geometry::{Box3, BoundRecord, PointsView};
use crate::index::SpatialIndex;
use crate::predicate;
use crate::rtree::RTree3;
use crate::tools::gather_to_all;

/// A bounded point with its position in the local input.
type LocalPoint = (Box3, usize);

/// The spatial partition produced by recursive coordinate bisection.
pub struct Rcb {
    bounds: Vec<Box3>,
}

impl Rcb {
    /// Bisect the union of all ranks' points into one box per rank.
    ///
    /// Weights attached to the view bias the bisection; without them
    /// every point counts as one.
    pub fn new<C: CommunicatorCollectives>(view: &PointsView<'_>, comm: &C) -> Self {
        let total_partitions = comm.size() as usize;

        let rtree = build_point_tree(view);

        // Seal the union of all rank bounds so that no input point lies
        // exactly on the global maximum face.
        let bounds_by_rank = gather_to_all(&[BoundRecord::from(rtree.bounds())], comm);
        let mut global_box = Box3::empty();
        for record in bounds_by_rank {
            global_box.stretch(&record.into());
        }
        global_box.next_larger();

        let mut final_boxes = Vec::with_capacity(total_partitions);
        let mut boxes_to_split: Vec<(Box3, usize)> = Vec::new();
        if total_partitions == 1 {
            final_boxes.push(global_box);
        } else {
            boxes_to_split.push((global_box, total_partitions));
        }

        while !boxes_to_split.is_empty() {
            // For each pending box find the local weighted median along
            // its longest dimension, packed for a summing reduction.
            let mut weighted_splits = Vec::with_capacity(boxes_to_split.len());
            let mut weights = Vec::with_capacity(boxes_to_split.len());
            for &(search_box, rank_count) in &boxes_to_split {
                let (weighted_split, weight) = local_split_candidate(&rtree, view, &search_box, rank_count);
                weighted_splits.push(weighted_split);
                weights.push(weight);
            }

            let mut global_weighted_splits = vec![0.0; weighted_splits.len()];
            let mut global_weights = vec![0.0; weights.len()];
            comm.all_reduce_into(
                &weighted_splits,
                &mut global_weighted_splits,
                SystemOperation::sum(),
            );
            comm.all_reduce_into(&weights, &mut global_weights, SystemOperation::sum());

            // Split every pending box at the weight weighted mean of
            // the rank candidates and hand each half its share of ranks.
            let mut new_boxes_to_split = Vec::new();
            for (index, &(search_box, rank_count)) in boxes_to_split.iter().enumerate() {
                let long_dim = search_box.longest_dimension();
                let split_value = if global_weights[index] > 0.0 {
                    global_weighted_splits[index] / global_weights[index]
                } else {
                    // No rank holds a point in this box. Fall back to a
                    // plain spatial bisection.
                    search_box.center(long_dim)
                };

                let small_partition = rank_count / 2;
                let large_partition = rank_count - small_partition;

                let mut low_bound = search_box;
                let mut new_max_corner = low_bound.max_corner();
                new_max_corner[long_dim] = split_value;
                low_bound.set(low_bound.min_corner(), new_max_corner);

                let mut hgh_bound = search_box;
                let mut new_min_corner = hgh_bound.min_corner();
                new_min_corner[long_dim] = split_value;
                hgh_bound.set(new_min_corner, hgh_bound.max_corner());

                if small_partition == 1 {
                    final_boxes.push(low_bound);
                } else {
                    new_boxes_to_split.push((low_bound, small_partition));
                }
                if large_partition == 1 {
                    final_boxes.push(hgh_bound);
                } else {
                    new_boxes_to_split.push((hgh_bound, large_partition));
                }
            }
            boxes_to_split = new_boxes_to_split;
        }

        // Every rank built the same sequence of final boxes, so the
        // stable sort gives every rank the same rank-to-box assignment.
        final_boxes.sort_by(|a, b| {
            if min_less(a, b) {
                std::cmp::Ordering::Less
            } else if min_less(b, a) {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        });

        assert_eq!(final_boxes.len(), total_partitions);
        Self {
            bounds: final_boxes,
        }
    }

    /// The partition boxes, one per rank in rank order.
    pub fn bounds(&self) -> &[Box3] {
        &self.bounds
    }

    /// The partition box owned by `rank`.
    pub fn rank_bound(&self, rank: usize) -> Box3 {
        self.bounds[rank]
    }

    /// The rank owning `point`, if any.
    ///
    /// Ownership uses the non-inclusive containment test, so a point on
    /// a face shared by two partitions has exactly one owner.
    pub fn owner_of(&self, point: [f64; 3]) -> Option<usize> {
        let probe = Box3::from_point(point);
        self.bounds
            .iter()
            .position(|bound| bound.contains_non_inclusive(&probe))
    }

    /// Gather per-partition weight totals and log the balance figures on
    /// rank zero.
    pub fn report<C: CommunicatorCollectives>(&self, view: &PointsView<'_>, comm: &C) {
        let rtree = build_point_tree(view);

        let mut local_weight_total = vec![0.0; self.bounds.len()];
        for (total, bound) in local_weight_total.iter_mut().zip(&self.bounds) {
            let contained = rtree.query(&predicate::contained_by_non_inclusive(*bound));
            *total = contained.iter().map(|&(_, index)| view.weight(index)).sum();
        }

        let mut global_weight_total = vec![0.0; self.bounds.len()];
        comm.all_reduce_into(
            &local_weight_total,
            &mut global_weight_total,
            SystemOperation::sum(),
        );

        if comm.rank() == 0 {
            let (min_weight, max_weight) = global_weight_total
                .iter()
                .copied()
                .minmax()
                .into_option()
                .expect("at least one partition");
            let sum_weight: f64 = global_weight_total.iter().sum();

            log::info!("total bounds      = {}", self.bounds.len());
            log::info!("minimum weight    = {min_weight}");
            log::info!("maximum weight    = {max_weight}");
            log::info!("weight ratio      = {}", (max_weight - min_weight) / sum_weight);
            log::info!("weight imbalance  = {}", max_weight / min_weight);
        }
        comm.barrier();
    }
}

/// Build the R-tree of local points used for containment queries.
fn build_point_tree(view: &PointsView<'_>) -> RTree3<LocalPoint> {
    let mut rtree = RTree3::new();
    for i in 0..view.len() {
        rtree.insert((Box3::from_point(view.coords(i)), i));
    }
    rtree
}

/// The local weighted median candidate for one pending box.
///
/// Returns `(split * total_weight, total_weight)` so that the summing
/// all-reduce across ranks yields a weight weighted mean split. A box
/// holding no local points contributes `(0, 0)`.
fn local_split_candidate(
    rtree: &RTree3<LocalPoint>,
    view: &PointsView<'_>,
    search_box: &Box3,
    rank_count: usize,
) -> (f64, f64) {
    let mut contained = rtree.query(&predicate::contained_by_non_inclusive(*search_box));
    if contained.is_empty() {
        return (0.0, 0.0);
    }

    let long_dim = search_box.longest_dimension();
    contained.sort_by(|(a, _), (b, _)| {
        a.center(long_dim)
            .partial_cmp(&b.center(long_dim))
            .expect("finite coordinates")
    });

    // Prefix sum the weights, then place the median where the running
    // weight first exceeds the share assigned to the lower half.
    let small_partition = rank_count / 2;
    let ratio = small_partition as f64 / rank_count as f64;

    let mut contained_weights = contained
        .iter()
        .map(|&(_, index)| view.weight(index))
        .collect_vec();
    for i in 1..contained_weights.len() {
        contained_weights[i] += contained_weights[i - 1];
    }

    let total_weight = *contained_weights.last().expect("non-empty");
    let median_index = contained_weights.partition_point(|&w| w <= ratio * total_weight);
    let median_value = contained[median_index].0.center(long_dim);

    (median_value * total_weight, total_weight)
}
