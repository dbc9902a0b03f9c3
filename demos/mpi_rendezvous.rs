//! Test the rendezvous exchange on disjoint slabs of the unit cube.

use mpi::traits::Communicator;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rcb_rendezvous::tools::gather_to_all;
use rcb_rendezvous::{
    predicate, Box3, Point, PointsView, Rendezvous, RTree3, SpatialIndex,
};

pub fn main() {
    env_logger::init();

    // Initialise MPI
    let universe = mpi::initialize().unwrap();

    // Get the world communicator
    let comm = universe.world();
    let rank = comm.rank();
    let size = comm.size();

    let mut rng = ChaCha8Rng::seed_from_u64(rank as u64);
    let npoints = 250;
    let expansion = 1.10;
    let neighbors = 20;

    // Each rank fills its own slab of the unit cube along x.
    let slab_width = 1.0 / size as f64;
    let slab_lo = rank as f64 * slab_width;
    let slab_points: Vec<[f64; 3]> = (0..npoints)
        .map(|_| {
            [
                slab_lo + slab_width * rng.gen::<f64>(),
                rng.gen::<f64>(),
                rng.gen::<f64>(),
            ]
        })
        .collect();

    // Local sources and targets coincide in this scenario; the target
    // bound is the tight bound of the slab cloud.
    let mut source_tree: RTree3<(Box3, u64)> = RTree3::new();
    let mut target_bound = Box3::empty();
    for (id, coords) in slab_points.iter().enumerate() {
        source_tree.insert((Box3::from_point(*coords), id as u64));
        target_bound.stretch(&Box3::from_point(*coords));
    }

    let rendezvous = Rendezvous::exchange(&source_tree, target_bound, expansion, &comm);

    // Gather every source in the world to check completeness against.
    let all_sources = gather_to_all(
        &slab_points
            .iter()
            .enumerate()
            .map(|(id, &coords)| Point::new(coords, id))
            .collect::<Vec<_>>(),
        &comm,
    );

    // Every source inside this rank's expanded target region must have
    // been collected into the global tree.
    let mut expanded = target_bound;
    expanded.scale(expansion);
    let mut missing = 0;
    for (index, source) in all_sources.iter().enumerate() {
        let origin = (index / npoints) as u32;
        let bound = source.bound();
        if expanded.intersects(&bound) {
            let found = rendezvous
                .global_sources()
                .query(&predicate::equals(bound));
            if !found
                .iter()
                .any(|&(_, r, id)| r == origin && id == source.global_id() as u64)
            {
                missing += 1;
            }
        }
    }
    assert_eq!(missing, 0, "rank {rank} is missing solicited sources");

    // Each target resolves a full, distance sorted neighborhood.
    let flat: Vec<f64> = slab_points.iter().flatten().copied().collect();
    let targets = PointsView::interleaved(&flat);
    let neighborhoods = rendezvous.nearest_neighborhoods(&targets, neighbors);
    assert_eq!(neighborhoods.len(), npoints);
    for (i, neighborhood) in neighborhoods.iter().enumerate() {
        assert_eq!(neighborhood.len(), neighbors);
        let probe = Box3::from_point(targets.coords(i));
        let dists: Vec<f64> = neighborhood
            .iter()
            .map(|(bound, _, _)| probe.nearest(bound))
            .collect();
        assert!(dists.windows(2).all(|w| w[0] <= w[1]));
        // The target is its own source, so the nearest distance is zero.
        assert_eq!(dists[0], 0.0);
    }

    // The table bookkeeping matches what the tree absorbed.
    let table_total: usize = rendezvous
        .recv_from_ranks()
        .values()
        .map(|records| records.len())
        .sum();
    assert_eq!(table_total, rendezvous.global_sources().len());
    assert!(rendezvous.send_to_ranks().contains_key(&rank));

    let unique = rcb_rendezvous::rendezvous::unique_remote_sources(&neighborhoods);
    assert!(unique.len() >= npoints);

    if rank == 0 {
        println!("Rendezvous exchange complete on {size} ranks.");
    }
}
