//! Pooled directed graphs with intrusive adjacency lists.
//!
//! A [`Graph`] stores vertices and edges as records in two
//! [`lineage_pool::Pool`]s. Adjacency is intrusive: each vertex record
//! heads its incoming and outgoing lists, and each edge record links to
//! the next edge in both lists it belongs to. Traversal rebinds handles
//! rather than allocating, and [`raw`] persists a graph with its exact
//! adjacency order.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod graph;
pub mod iter;
pub mod raw;

pub use graph::{Edge, Graph, Vertex, EDGE_HEADER_SIZE, VERTEX_HEADER_SIZE};
pub use iter::{EdgeIter, EdgeList, Edges, Vertices};
pub use raw::{read_graph, write_graph, ReadGraph};
