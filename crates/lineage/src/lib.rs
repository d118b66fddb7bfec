//! Lineage: pooled graph storage with fast proximity queries.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all lineage sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use lineage::prelude::*;
//!
//! // Each vertex carries a 2D position after the adjacency header.
//! const POS: PositionLayout = PositionLayout::new(VERTEX_HEADER_SIZE, 2);
//!
//! let mut g = Graph::new(16, 0, &PoolConfig::default()).unwrap();
//! let a = g.add_vertex().unwrap();
//! let b = g.add_vertex().unwrap();
//! g.set_vertex_field(b, POS.coordinate(0), 3.0).unwrap();
//! g.set_vertex_field(b, POS.coordinate(1), 4.0).unwrap();
//! g.add_edge(a, b).unwrap();
//!
//! let positions = PoolPositions::new(g.vertex_pool(), POS);
//! let index = SpatialIndex::build(g.vertices().map(|v| v.handle()), &positions).unwrap();
//! let mut search = index.nearest_neighbor_search(&positions).unwrap();
//! let hit = search.search(&[2.5, 4.0]).unwrap().unwrap();
//! assert_eq!(hit.object, b.handle());
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `lineage-core` | IDs, handles, errors, geometry, core traits |
//! | [`pool`] | `lineage-pool` | Storage array, pools, proxies, raw I/O |
//! | [`graph`] | `lineage-graph` | Directed graphs with intrusive adjacency |
//! | [`kdtree`] | `lineage-kdtree` | KD-tree build and queries |
//! | [`spatial`] | `lineage-spatial` | Incremental spatial index |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core identifiers, errors, geometry and traits (`lineage-core`).
pub use lineage_core as types;

/// Record pools and raw I/O (`lineage-pool`).
///
/// [`pool::Pool`] is the record allocator; [`pool::raw`] reads and writes
/// whole pools.
pub use lineage_pool as pool;

/// Pooled directed graphs (`lineage-graph`).
pub use lineage_graph as graph;

/// KD-trees with soft deletion (`lineage-kdtree`).
///
/// Most users want [`spatial::SpatialIndex`] instead; use the tree
/// directly for static point sets.
pub use lineage_kdtree as kdtree;

/// Incrementally maintained spatial index (`lineage-spatial`).
pub use lineage_spatial as spatial;

/// Common imports for typical lineage usage.
///
/// ```rust
/// use lineage::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use lineage_core::{
        ClipConvexPolytope, ConvexPolytope, Handle, HyperPlane, NearestNeighborSearch, Neighbor,
        ObjectPositions, RefPool, SlotId,
    };

    // Errors
    pub use lineage_core::{PoolError, SpatialError};
    pub use lineage_pool::RawError;

    // Pools
    pub use lineage_pool::{Field, ObjRef, Pool, PoolConfig, PoolPositions, PositionLayout};

    // Graphs
    pub use lineage_graph::{Edge, Graph, Vertex, EDGE_HEADER_SIZE, VERTEX_HEADER_SIZE};

    // Spatial
    pub use lineage_kdtree::KdTree;
    pub use lineage_spatial::{RebuildPolicy, SpatialIndex};
}
