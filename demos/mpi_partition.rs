//! Drive the full partition pipeline on synthetic data.

use mpi::traits::Communicator;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rcb_rendezvous::targets::{read_target_file, write_target_file};
use rcb_rendezvous::tools::{abort_world, gather_to_root};
use rcb_rendezvous::{Partition, PointsView};

/// Append `ndup` copies of every point to simulate collocated input.
fn duplicate_points(ndup: usize, coords: &mut Vec<f64>) {
    let original = coords.clone();
    for _ in 0..ndup {
        coords.extend_from_slice(&original);
    }
}

pub fn main() {
    env_logger::init();

    // Initialise MPI
    let universe = mpi::initialize().unwrap();

    // Get the world communicator
    let comm = universe.world();
    let rank = comm.rank();
    let size = comm.size();

    let mut rng = ChaCha8Rng::seed_from_u64(rank as u64);

    let ntargets = 10000 / size as usize;
    let nsources = 1000;
    let ntarget_dup = 3;
    let nsource_dup = 5;
    let neighbors = 50;

    let mut target_xyz: Vec<f64> = (0..3 * ntargets)
        .map(|_| rng.gen_range(-100.0..100.0))
        .collect();
    let mut source_xyz: Vec<f64> = (0..3 * nsources)
        .map(|_| rng.gen_range(-100.0..100.0))
        .collect();

    // Collocated duplicates exercise the unique maps.
    duplicate_points(ntarget_dup, &mut target_xyz);
    duplicate_points(nsource_dup, &mut source_xyz);

    let targets = PointsView::interleaved(&target_xyz);
    let sources = PointsView::interleaved(&source_xyz);

    let partition = Partition::init(&targets, &sources, neighbors, &comm);

    assert_eq!(partition.rank_bounds().len(), size as usize);
    assert_eq!(partition.target_map().num_total(), (1 + ntarget_dup) * ntargets);
    assert_eq!(partition.target_map().num_unique(), ntargets);
    assert_eq!(partition.source_map().num_unique(), nsources);

    // One neighborhood per unique target, none larger than requested.
    assert_eq!(partition.neighborhoods().len(), ntargets);
    assert!(partition
        .neighborhoods()
        .iter()
        .all(|neighborhood| neighborhood.len() <= neighbors));

    // The referenced remote sources are a deduplicated subset of what
    // the neighborhoods name.
    let referenced: usize = partition
        .neighborhoods()
        .iter()
        .map(|neighborhood| neighborhood.len())
        .sum();
    assert!(partition.unique_remote_sources().len() <= referenced);

    partition.rendezvous().global_sources().diagnostics();
    partition.report(&targets, &comm);

    // Dump the local targets with one synthetic variable per point and
    // read them back. A file error is fatal for the whole job.
    let file = std::env::temp_dir().join(format!("targets_rank{rank}.dat"));
    let npoints = target_xyz.len() / 3;
    let var: Vec<f64> = (0..npoints).map(|i| i as f64 + 3.1415).collect();
    if let Err(err) = write_target_file(&file, 3, npoints, &target_xyz, 1, &var) {
        abort_world(&comm, &err.to_string());
    }
    match read_target_file(&file) {
        Ok((ndim, read_points, _)) => {
            assert_eq!(ndim, 3);
            assert_eq!(read_points, npoints);
        }
        Err(err) => abort_world(&comm, &err.to_string()),
    }

    // Summarise the referenced remote sources on root.
    let remote_counts = gather_to_root(&[partition.unique_remote_sources().len()], &comm);
    if let Some(remote_counts) = remote_counts {
        println!(
            "distinct remote sources referenced per rank: {remote_counts:?}"
        );
    }

    println!("P:{rank} -- DONE --");
}
