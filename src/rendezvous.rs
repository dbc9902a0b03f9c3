//! Source and target rendezvous across MPI ranks.
//!
//! After partitioning, each rank owns a target region but the sources a
//! target needs can live anywhere. The rendezvous routes every local
//! source record to the ranks whose expanded target regions overlap it,
//! so that afterwards each rank holds a locally complete picture of the
//! sources near its targets and can answer k-nearest queries without
//! further communication.

use std::collections::{BTreeSet, HashMap};

use mpi::request::WaitGuard;
use mpi::traits::{Communicator, Destination, Equivalence, Source};

use crate::constants::RENDEZVOUS_TAG;
use crate::geometry::{Box3, BoundRecord, PointsView};
use crate::index::SpatialIndex;
use crate::predicate;
use crate::rtree::RTree3;
use crate::tools::gather_to_all;

/// A local source: its bound and its position in the local input.
pub type SourceValue = (Box3, u64);

/// A source collected from the exchange: bound, origin rank, remote id.
pub type GlobalSource = (Box3, u32, u64);

/// Wire form of one source record.
#[derive(Clone, Copy, Equivalence)]
struct SourceRecord {
    min: [f64; 3],
    max: [f64; 3],
    id: u64,
}

impl From<&SourceValue> for SourceRecord {
    fn from(&(bound, id): &SourceValue) -> Self {
        Self {
            min: bound.min_corner(),
            max: bound.max_corner(),
            id,
        }
    }
}

impl From<&SourceRecord> for SourceValue {
    fn from(record: &SourceRecord) -> Self {
        (Box3::new(record.min, record.max), record.id)
    }
}

/// The completed exchange on one rank.
pub struct Rendezvous {
    send_to_ranks: HashMap<i32, Vec<SourceValue>>,
    recv_from_ranks: HashMap<i32, Vec<SourceValue>>,
    global_sources: RTree3<GlobalSource>,
}

impl Rendezvous {
    /// Exchange source records with every rank whose region of interest
    /// overlaps.
    ///
    /// `local_target_bound` is this rank's target region, typically its
    /// partition box. Target bounds are expanded by `expansion` before
    /// the overlap tests; larger factors reduce the chance that a
    /// nearest source goes unsolicited at the cost of more traffic.
    ///
    /// Both sides of every pairing evaluate the same intersection test
    /// on the same gathered bounds, so every posted send has a matching
    /// receive. An empty record list from a rank whose sources narrowly
    /// missed the test is expected and harmless.
    pub fn exchange<C: Communicator>(
        local_sources: &RTree3<SourceValue>,
        local_target_bound: Box3,
        expansion: f64,
        comm: &C,
    ) -> Self {
        let size = comm.size();

        let target_bounds: Vec<Box3> =
            gather_to_all(&[BoundRecord::from(local_target_bound)], comm)
                .into_iter()
                .map(Box3::from)
                .collect();
        let source_bounds: Vec<Box3> =
            gather_to_all(&[BoundRecord::from(local_sources.bounds())], comm)
                .into_iter()
                .map(Box3::from)
                .collect();

        // A pairing exists where the sender's source bound meets the
        // receiver's expanded target bound. Ranks holding no sources or
        // no targets pair with nobody.
        let pairing = |source_rank: i32, target_rank: i32| {
            let source_bound = source_bounds[source_rank as usize];
            let mut expanded_target = target_bounds[target_rank as usize];
            if source_bound.is_empty() || expanded_target.is_empty() {
                return false;
            }
            expanded_target.scale(expansion);
            expanded_target.intersects(&source_bound)
        };

        let recv_ranks: Vec<i32> = (0..size).filter(|&r| pairing(r, comm.rank())).collect();

        let mut send_to_ranks = HashMap::new();
        let mut send_buffers: HashMap<i32, Vec<SourceRecord>> = HashMap::new();
        for rank in (0..size).filter(|&r| pairing(comm.rank(), r)) {
            let mut expanded_target = target_bounds[rank as usize];
            expanded_target.scale(expansion);

            let found = local_sources.query(&predicate::intersects(expanded_target));
            send_buffers.insert(rank, found.iter().map(SourceRecord::from).collect());
            send_to_ranks.insert(rank, found);
        }

        // Post every send non-blocking, then drain the planned receives
        // while the sends are in flight. The scope completes the sends.
        let mut recv_from_ranks = HashMap::new();
        mpi::request::scope(|scope| {
            let _guards = send_buffers
                .iter()
                .map(|(&rank, buffer)| {
                    WaitGuard::from(comm.process_at_rank(rank).immediate_send_with_tag(
                        scope,
                        &buffer[..],
                        RENDEZVOUS_TAG,
                    ))
                })
                .collect::<Vec<_>>();

            for &rank in &recv_ranks {
                let (records, _status) = comm
                    .process_at_rank(rank)
                    .receive_vec_with_tag::<SourceRecord>(RENDEZVOUS_TAG);
                recv_from_ranks.insert(
                    rank,
                    records.iter().map(SourceValue::from).collect::<Vec<_>>(),
                );
            }
        });

        let mut global_sources = RTree3::new();
        let mut received = 0usize;
        for (&rank, records) in &recv_from_ranks {
            received += records.len();
            for &(bound, id) in records {
                global_sources.insert((bound, rank as u32, id));
            }
        }
        log::info!(
            "rendezvous on rank {}: {} peers in, {} peers out, {} source records collected",
            comm.rank(),
            recv_from_ranks.len(),
            send_to_ranks.len(),
            received,
        );

        Self {
            send_to_ranks,
            recv_from_ranks,
            global_sources,
        }
    }

    /// The records sent, keyed by destination rank.
    pub fn send_to_ranks(&self) -> &HashMap<i32, Vec<SourceValue>> {
        &self.send_to_ranks
    }

    /// The records received, keyed by origin rank.
    pub fn recv_from_ranks(&self) -> &HashMap<i32, Vec<SourceValue>> {
        &self.recv_from_ranks
    }

    /// The tree over every source record collected on this rank.
    pub fn global_sources(&self) -> &RTree3<GlobalSource> {
        &self.global_sources
    }

    /// The `neighbors` nearest collected sources for each target point,
    /// in ascending distance order.
    pub fn nearest_neighborhoods(
        &self,
        targets: &PointsView<'_>,
        neighbors: usize,
    ) -> Vec<Vec<GlobalSource>> {
        (0..targets.len())
            .map(|i| {
                let bound = Box3::from_point(targets.coords(i));
                self.global_sources
                    .query_nearest(&predicate::nearest(bound, neighbors))
            })
            .collect()
    }
}

/// The distinct `(origin_rank, remote_id)` pairs referenced by any
/// neighborhood, in ascending order.
///
/// This is the compact set of remote sources a downstream data pull
/// would have to fetch.
pub fn unique_remote_sources(neighborhoods: &[Vec<GlobalSource>]) -> Vec<(u32, u64)> {
    let mut seen = BTreeSet::new();
    for neighborhood in neighborhoods {
        for &(_, rank, id) in neighborhood {
            seen.insert((rank, id));
        }
    }
    seen.into_iter().collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_source_record_round_trip() {
        let value: SourceValue = (Box3::new([0.0, 1.0, 2.0], [3.0, 4.0, 5.0]), 42);
        let record = SourceRecord::from(&value);
        let back = SourceValue::from(&record);
        assert_eq!(back, value);
    }

    #[test]
    fn test_unique_remote_sources_dedups_across_neighborhoods() {
        let b = Box3::from_point([0.0; 3]);
        let neighborhoods = vec![
            vec![(b, 0, 1), (b, 1, 2)],
            vec![(b, 1, 2), (b, 0, 3)],
            vec![],
        ];
        let unique = unique_remote_sources(&neighborhoods);
        assert_eq!(unique, vec![(0, 1), (0, 3), (1, 2)]);
    }
}
