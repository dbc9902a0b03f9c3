//! A Rust library for distributed point partitioning and nearest
//! neighbour rendezvous.
//!
//! N ranks each hold a local slice of a 3-D point cloud. Downstream
//! computation needs a balanced spatial partition of the cloud plus, for
//! every target point on a rank, the k nearest source points drawn from
//! the union of all ranks' data. This library provides the three pieces
//! that make that possible:
//!
//! * an [R-tree](crate::rtree::RTree) spatial index with containment,
//!   intersection, and k-nearest-neighbour queries and pluggable
//!   [split strategies](crate::rtree::split),
//! * a distributed [recursive coordinate bisection](crate::rcb::Rcb)
//!   partitioner that exchanges weighted medians across ranks to assign
//!   every rank a contiguous spatial region,
//! * a [rendezvous exchange](crate::rendezvous::Rendezvous) that routes
//!   each rank's source records to the ranks whose expanded target
//!   regions overlap them, so every rank can resolve its neighbourhoods
//!   locally.
//!
//! Communication goes through MPI; every distributed entry point takes
//! the communicator as an explicit argument and there is no global
//! state. Within a rank everything is single threaded.
//!
//! ## Using the library.
//!
//! The [`Partition`](crate::partition::Partition) facade runs the whole
//! pipeline:
//! ```no_run
//! use rcb_rendezvous::{Partition, PointsView};
//! use mpi::traits::Communicator;
//!
//! let universe = mpi::initialize().unwrap();
//! let comm = universe.world();
//!
//! // Interleaved xyz coordinates, synthesized here.
//! let targets: Vec<f64> = (0..3000).map(|i| (i % 97) as f64).collect();
//! let sources: Vec<f64> = (0..3000).map(|i| (i % 89) as f64).collect();
//!
//! let partition = Partition::init(
//!     &PointsView::interleaved(&targets),
//!     &PointsView::interleaved(&sources),
//!     50,
//!     &comm,
//! );
//! assert_eq!(partition.rank_bounds().len(), comm.size() as usize);
//! ```
//! The individual stages are available on their own: build an
//! [`RTree3`](crate::rtree::RTree3) and query it with the
//! [`predicate`] factories, run [`Rcb`](crate::rcb::Rcb) over a strided
//! [`PointsView`](crate::geometry::PointsView), or drive a
//! [`Rendezvous`](crate::rendezvous::Rendezvous) from partition bounds
//! of your own.
#![cfg_attr(feature = "strict", deny(warnings), deny(unused_crate_dependencies))]
#![warn(missing_docs)]

pub mod bound;
pub mod constants;
pub mod exhaustive;
pub mod geometry;
pub mod index;
pub mod multiset;
pub mod partition;
pub mod predicate;
pub mod rcb;
pub mod rendezvous;
pub mod rtree;
pub mod targets;
pub mod tools;
pub mod unique;

pub use crate::bound::Bound;
pub use crate::exhaustive::{Exhaustive, Exhaustive3};
pub use crate::geometry::{Box3, Point, PointsView};
pub use crate::index::{HasBound, SpatialIndex};
pub use crate::partition::Partition;
pub use crate::rcb::Rcb;
pub use crate::rendezvous::Rendezvous;
pub use crate::rtree::{RTree, RTree3};
pub use crate::unique::UniqueMap;
