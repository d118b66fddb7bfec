//! Core identifiers, errors, and traits for the lineage engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the pool, graph, and spatial crates:
//! slot identifiers and generation-checked handles, error types, and the
//! traits collaborators program against ([`RefPool`], [`ObjectPositions`],
//! [`NearestNeighborSearch`], [`ClipConvexPolytope`]).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod geometry;
pub mod id;
pub mod traits;

pub use error::{PoolError, SpatialError};
pub use geometry::{ConvexPolytope, HyperPlane};
pub use id::{Handle, NodeId, Point, SlotId};
pub use traits::{ClipConvexPolytope, Neighbor, NearestNeighborSearch, ObjectPositions, RefPool};
