//! Pool-backed KD-trees with soft deletion and convex range queries.
//!
//! A [`KdTree`] snapshots object positions into node records of its own
//! [`lineage_pool::Pool`] and is balanced once, at build time. Nodes can
//! be invalidated afterwards; queries either see every node or only the
//! valid ones.
//!
//! # Queries
//!
//! - [`NearestNeighborSearchOnKdTree`]: branch-and-bound nearest neighbour.
//! - [`ClipConvexPolytopeKdTree`]: inside/outside partition by an
//!   intersection of half-spaces.
//! - [`SplitHyperPlaneKdTree`]: above/below partition by one plane.
//!
//! The range queries return whole subtrees lazily through [`TreeNodes`]
//! and [`TreeValues`] instead of collecting every node.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod clip;
pub mod iter;
pub mod nearest;
pub mod node;
pub mod split;
pub mod tree;

pub use clip::ClipConvexPolytopeKdTree;
pub use iter::{TreeNodes, TreeValues};
pub use nearest::NearestNeighborSearchOnKdTree;
pub use node::NodeLayout;
pub use split::SplitHyperPlaneKdTree;
pub use tree::KdTree;
