//! Incrementally maintained spatial index over pooled objects.
//!
//! A [`SpatialIndex`] pairs an immutable [`lineage_kdtree::KdTree`]
//! snapshot with an overlay of objects added or moved since. Queries
//! compose a valid-only tree query with a linear scan of the overlay,
//! so results are exhaustive and duplicate-free whatever the add/remove
//! history. A [`RebuildPolicy`] tells callers when the overlay has grown
//! expensive enough to rebuild.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod index;
pub mod policy;
pub mod query;

pub use index::SpatialIndex;
pub use policy::RebuildPolicy;
pub use query::{IndexClip, IndexNearestNeighborSearch, IndexValues};
