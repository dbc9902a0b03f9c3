//! Test the recursive coordinate bisection across MPI ranks.

use mpi::traits::Communicator;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rcb_rendezvous::tools::global_size;
use rcb_rendezvous::{Box3, PointsView, Rcb};

pub fn main() {
    env_logger::init();

    // Initialise MPI
    let universe = mpi::initialize().unwrap();

    // Get the world communicator
    let comm = universe.world();
    let rank = comm.rank();
    let size = comm.size();

    // Every rank draws the same 100 points, so every rank's local median
    // equals the global one and the bisection balances exactly.
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let npoints = 100;
    let coords: Vec<f64> = (0..3 * npoints).map(|_| rng.gen::<f64>()).collect();
    let view = PointsView::interleaved(&coords);

    let rcb = Rcb::new(&view, &comm);

    // One partition per rank.
    assert_eq!(rcb.bounds().len(), size as usize);

    if size == 1 {
        // A single rank owns the sealed bound of its own cloud.
        let mut expected = Box3::empty();
        for i in 0..view.len() {
            expected.stretch(&Box3::from_point(view.coords(i)));
        }
        expected.next_larger();
        assert_eq!(rcb.bounds()[0], expected);
    }

    // The world sees one copy of the cloud per rank.
    assert_eq!(global_size(&coords, &comm), 3 * npoints * size as usize);

    // Every point has exactly one owner.
    for i in 0..view.len() {
        let probe = Box3::from_point(view.coords(i));
        let owners = rcb
            .bounds()
            .iter()
            .filter(|bound| bound.contains_non_inclusive(&probe))
            .count();
        assert_eq!(owners, 1);
        assert!(rcb.owner_of(view.coords(i)).is_some());
    }

    // With identical clouds on every rank the per-partition counts match
    // the uniform share to within the points sharing a median coordinate.
    let share = npoints / size as usize;
    for bound in rcb.bounds() {
        let count = (0..view.len())
            .filter(|&i| bound.contains_non_inclusive(&Box3::from_point(view.coords(i))))
            .count();
        assert!(
            count.abs_diff(share) <= size as usize,
            "partition holds {count} of {npoints} points, expected about {share}"
        );
    }

    rcb.report(&view, &comm);

    if rank == 0 {
        println!("RCB partition computed and verified.");
    }
}
