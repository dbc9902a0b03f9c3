//! The full partition-and-locate pipeline.
//!
//! [`Partition::init`] runs the stages in order: deduplicate the local
//! targets, bisect the target cloud into one region per rank, exchange
//! source records with every overlapping rank, and resolve the nearest
//! sources for each unique local target.

use mpi::traits::Communicator;

use crate::constants::DEFAULT_BOUND_SCALE;
use crate::geometry::{Box3, PointsView};
use crate::index::SpatialIndex;
use crate::rcb::Rcb;
use crate::rendezvous::{unique_remote_sources, GlobalSource, Rendezvous, SourceValue};
use crate::rtree::RTree3;
use crate::unique::UniqueMap;

/// The per-rank result of the distributed pipeline.
pub struct Partition {
    rcb: Rcb,
    target_map: UniqueMap,
    source_map: UniqueMap,
    rendezvous: Rendezvous,
    neighborhoods: Vec<Vec<GlobalSource>>,
    unique_remote: Vec<(u32, u64)>,
}

impl Partition {
    /// Partition the targets and collect the `neighbors` nearest global
    /// sources for each unique local target.
    ///
    /// Uses the default bound expansion factor; see
    /// [`init_with_expansion`](Partition::init_with_expansion).
    pub fn init<C: Communicator>(
        targets: &PointsView<'_>,
        sources: &PointsView<'_>,
        neighbors: usize,
        comm: &C,
    ) -> Self {
        Self::init_with_expansion(targets, sources, neighbors, DEFAULT_BOUND_SCALE, comm)
    }

    /// As [`init`](Partition::init) with an explicit expansion factor
    /// for the rendezvous overlap tests.
    pub fn init_with_expansion<C: Communicator>(
        targets: &PointsView<'_>,
        sources: &PointsView<'_>,
        neighbors: usize,
        expansion: f64,
        comm: &C,
    ) -> Self {
        // Collocated points only need to be partitioned and matched
        // once.
        let target_coords = targets.to_coords();
        let mut target_map = UniqueMap::new();
        target_map.setup(&target_coords);
        let mut unique_targets = Vec::new();
        target_map.reduce_to_unique(&target_coords, &mut unique_targets);
        let unique_target_flat: Vec<f64> =
            unique_targets.iter().flatten().copied().collect();
        let unique_target_view = PointsView::interleaved(&unique_target_flat);

        let source_coords = sources.to_coords();
        let mut source_map = UniqueMap::new();
        source_map.setup(&source_coords);
        let mut unique_sources = Vec::new();
        source_map.reduce_to_unique(&source_coords, &mut unique_sources);

        let rcb = Rcb::new(&unique_target_view, comm);

        // The exchange has to solicit sources for the targets that are
        // physically on this rank, which before any redistribution need
        // not sit inside the rank's partition box. The target region is
        // therefore the partition box stretched over the local targets.
        let mut my_region = rcb.rank_bound(comm.rank() as usize);
        for coords in &unique_targets {
            my_region.stretch(&Box3::from_point(*coords));
        }

        let mut source_tree: RTree3<SourceValue> = RTree3::new();
        for (id, coords) in unique_sources.iter().enumerate() {
            source_tree.insert((Box3::from_point(*coords), id as u64));
        }

        let rendezvous = Rendezvous::exchange(&source_tree, my_region, expansion, comm);
        let neighborhoods = rendezvous.nearest_neighborhoods(&unique_target_view, neighbors);
        let unique_remote = unique_remote_sources(&neighborhoods);

        Self {
            rcb,
            target_map,
            source_map,
            rendezvous,
            neighborhoods,
            unique_remote,
        }
    }

    /// The partition boxes, one per rank in rank order.
    pub fn rank_bounds(&self) -> &[Box3] {
        self.rcb.bounds()
    }

    /// The underlying bisection.
    pub fn rcb(&self) -> &Rcb {
        &self.rcb
    }

    /// Duplicate bookkeeping for the target input.
    pub fn target_map(&self) -> &UniqueMap {
        &self.target_map
    }

    /// Duplicate bookkeeping for the source input.
    pub fn source_map(&self) -> &UniqueMap {
        &self.source_map
    }

    /// The completed exchange.
    pub fn rendezvous(&self) -> &Rendezvous {
        &self.rendezvous
    }

    /// Per unique target, its nearest collected sources in ascending
    /// distance order.
    pub fn neighborhoods(&self) -> &[Vec<GlobalSource>] {
        &self.neighborhoods
    }

    /// The distinct remote sources any neighborhood references.
    pub fn unique_remote_sources(&self) -> &[(u32, u64)] {
        &self.unique_remote
    }

    /// Log the partition balance figures on rank zero.
    pub fn report<C: Communicator>(&self, targets: &PointsView<'_>, comm: &C) {
        self.rcb.report(targets, comm);
    }
}
