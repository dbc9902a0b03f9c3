//! Utility routines.

use mpi::{
    collective::SystemOperation,
    datatype::PartitionMut,
    traits::{Communicator, CommunicatorCollectives, Equivalence, Root},
};
use rand::Rng;

use crate::geometry::Point;

/// Abort the whole job with a non-zero exit status.
///
/// Drivers call this when a fatal error such as a failed file open or
/// malformed input leaves a rank unable to participate in further
/// collectives.
pub fn abort_world<C: Communicator>(comm: &C, message: &str) -> ! {
    log::error!("{message}");
    comm.abort(1);
}

/// Gather a distributed array onto every process.
pub fn gather_to_all<T, C>(arr: &[T], comm: &C) -> Vec<T>
where
    T: Equivalence + Default + Clone,
    C: CommunicatorCollectives,
{
    let size = comm.size();

    // Every process first needs the local length of every other process.
    let local_len = arr.len() as i32;
    let mut counts = vec![0_i32; size as usize];
    comm.all_gather_into(&local_len, &mut counts);

    let recv_len = counts.iter().sum::<i32>() as usize;
    let mut recvbuffer = vec![T::default(); recv_len];

    let displs = displacements(&counts);
    let mut partition = PartitionMut::new(&mut recvbuffer[..], counts, &displs[..]);
    comm.all_gather_varcount_into(arr, &mut partition);

    recvbuffer
}

/// Gather a distributed array onto the root rank.
///
/// The result is a `Vec<T>` on root and `None` on all other ranks.
pub fn gather_to_root<T, C>(arr: &[T], comm: &C) -> Option<Vec<T>>
where
    T: Equivalence + Default + Clone,
    C: CommunicatorCollectives,
{
    let n = arr.len() as i32;
    let rank = comm.rank();
    let size = comm.size();
    let root_process = comm.process_at_rank(0);

    if rank == 0 {
        let mut counts = vec![0_i32; size as usize];
        root_process.gather_into_root(&n, &mut counts);

        let recv_len = counts.iter().sum::<i32>() as usize;
        let mut recvbuffer = vec![T::default(); recv_len];

        let displs = displacements(&counts);
        let mut partition = PartitionMut::new(&mut recvbuffer[..], counts, &displs[..]);
        root_process.gather_varcount_into_root(arr, &mut partition);

        Some(recvbuffer)
    } else {
        root_process.gather_into(&n);
        root_process.gather_varcount_into(arr);
        None
    }
}

/// Get the global size of a distributed array.
pub fn global_size<T, C: CommunicatorCollectives>(arr: &[T], comm: &C) -> usize {
    let local_size = arr.len();
    let mut global_size = 0;

    comm.all_reduce_into(&local_size, &mut global_size, SystemOperation::sum());

    global_size
}

/// Compute displacements from a vector of counts.
///
/// This is useful for global MPI varcount operations. Let
/// counts be [3, 4, 5]. Then the corresponding displacements are
/// [0, 3, 7]. Note that the last element `5` is ignored.
pub fn displacements(counts: &[i32]) -> Vec<i32> {
    counts
        .iter()
        .scan(0, |acc, &x| {
            let tmp = *acc;
            *acc += x;
            Some(tmp)
        })
        .collect()
}

/// Generate random points in the given coordinate range on each rank.
///
/// Global ids are contiguous across ranks in rank order.
pub fn generate_random_points<R, C>(
    npoints: usize,
    range: (f64, f64),
    rng: &mut R,
    comm: &C,
) -> Vec<Point>
where
    R: Rng + ?Sized,
    C: CommunicatorCollectives,
{
    let rank = comm.rank() as usize;

    let local_len = npoints as i32;
    let mut counts = vec![0_i32; comm.size() as usize];
    comm.all_gather_into(&local_len, &mut counts);
    let offset: usize = counts[..rank].iter().sum::<i32>() as usize;

    (0..npoints)
        .map(|index| {
            let coords = [
                rng.gen_range(range.0..range.1),
                rng.gen_range(range.0..range.1),
                rng.gen_range(range.0..range.1),
            ];
            Point::new(coords, offset + index)
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_displacements() {
        assert_eq!(displacements(&[3, 4, 5]), vec![0, 3, 7]);
        assert_eq!(displacements(&[]), Vec::<i32>::new());
    }
}
