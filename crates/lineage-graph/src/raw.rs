//! Raw binary layout of a graph.
//!
//! ```text
//! i32 vertex count
//! vertex payload records (adjacency header omitted)
//! i32 edge count
//! per edge: i32 source file index, i32 target file index,
//!           i32 position in source's outgoing list,
//!           i32 position in target's incoming list,
//!           edge payload record
//! ```
//!
//! All integers are big-endian. The list positions let a reader restore
//! every adjacency list in its original order.

use std::io::{Read, Write};

use lineage_core::SlotId;
use lineage_pool::raw::{read_count, read_file_index, read_i32_be, write_count, write_i32_be};
use lineage_pool::RawError;

use crate::graph::{Edge, Graph, Vertex, EDGE_HEADER_SIZE, VERTEX_HEADER_SIZE};
use crate::iter::EdgeList;

/// Elements created by [`read_graph`], indexed by file index.
#[derive(Clone, Debug, Default)]
pub struct ReadGraph {
    /// Vertices in file order.
    pub vertices: Vec<Vertex>,
    /// Edges in file order.
    pub edges: Vec<Edge>,
}

/// Write every live vertex and edge of `graph`.
pub fn write_graph(w: &mut dyn Write, graph: &Graph) -> Result<(), RawError> {
    let vertex_pool = graph.vertex_pool();
    let edge_pool = graph.edge_pool();

    write_count(w, graph.vertex_count())?;
    let mut file_index = vec![-1i32; vertex_pool.allocated()];
    for (i, v) in graph.vertices().enumerate() {
        w.write_all(&vertex_pool.record(v.handle())?[VERTEX_HEADER_SIZE..])?;
        file_index[v.slot().index()] = i as i32;
    }

    let mut out_pos = vec![0i32; edge_pool.allocated()];
    let mut in_pos = vec![0i32; edge_pool.allocated()];
    for v in graph.vertices() {
        for (p, e) in graph.outgoing(v)?.enumerate() {
            out_pos[e.slot().index()] = p as i32;
        }
        for (p, e) in graph.incoming(v)?.enumerate() {
            in_pos[e.slot().index()] = p as i32;
        }
    }

    write_count(w, graph.edge_count())?;
    for e in graph.edges() {
        let s = graph.source(e)?.slot().index();
        let t = graph.target(e)?.slot().index();
        write_i32_be(w, file_index[s])?;
        write_i32_be(w, file_index[t])?;
        write_i32_be(w, out_pos[e.slot().index()])?;
        write_i32_be(w, in_pos[e.slot().index()])?;
        w.write_all(&edge_pool.record(e.handle())?[EDGE_HEADER_SIZE..])?;
    }

    tracing::debug!(
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        "graph written"
    );
    Ok(())
}

/// Read a graph written by [`write_graph`] into `graph`.
///
/// The new vertices and edges are added alongside whatever `graph`
/// already holds. On error, elements read so far remain in the graph.
pub fn read_graph(r: &mut dyn Read, graph: &mut Graph) -> Result<ReadGraph, RawError> {
    let vertex_count = read_count(r)?;
    let mut vertices = Vec::with_capacity(vertex_count.min(1 << 16));
    for _ in 0..vertex_count {
        let v = graph.add_vertex()?;
        r.read_exact(&mut graph.vertex_pool_mut().record_mut(v.handle())?[VERTEX_HEADER_SIZE..])?;
        vertices.push(v);
    }

    let edge_count = read_count(r)?;
    let mut edges = Vec::with_capacity(edge_count.min(1 << 16));
    let mut outgoing: Vec<Vec<(usize, SlotId)>> = vec![Vec::new(); vertex_count];
    let mut incoming: Vec<Vec<(usize, SlotId)>> = vec![Vec::new(); vertex_count];
    for _ in 0..edge_count {
        let s = read_file_index(r, vertex_count)?;
        let t = read_file_index(r, vertex_count)?;
        let out_pos = read_position(r)?;
        let in_pos = read_position(r)?;
        let e = graph.create_unlinked_edge(vertices[s].slot(), vertices[t].slot())?;
        r.read_exact(&mut graph.edge_pool_mut().record_mut(e.handle())?[EDGE_HEADER_SIZE..])?;
        outgoing[s].push((out_pos, e.slot()));
        incoming[t].push((in_pos, e.slot()));
        edges.push(e);
    }

    link_lists(graph, &vertices, outgoing, EdgeList::Outgoing)?;
    link_lists(graph, &vertices, incoming, EdgeList::Incoming)?;

    tracing::debug!(vertices = vertex_count, edges = edge_count, "graph read");
    Ok(ReadGraph { vertices, edges })
}

fn read_position(r: &mut dyn Read) -> Result<usize, RawError> {
    let pos = read_i32_be(r)?;
    usize::try_from(pos).map_err(|_| RawError::Malformed {
        detail: format!("negative list position {pos}"),
    })
}

fn link_lists(
    graph: &mut Graph,
    vertices: &[Vertex],
    lists: Vec<Vec<(usize, SlotId)>>,
    list: EdgeList,
) -> Result<(), RawError> {
    let mut ordered = Vec::new();
    for (v, mut entries) in vertices.iter().zip(lists) {
        entries.sort_unstable_by_key(|&(pos, _)| pos);
        if entries.iter().enumerate().any(|(i, &(pos, _))| pos != i) {
            return Err(RawError::Malformed {
                detail: format!(
                    "{list:?} list positions of vertex {v} are not 0..{}",
                    entries.len()
                ),
            });
        }
        ordered.clear();
        ordered.extend(entries.iter().map(|&(_, e)| e));
        graph.set_list(v.slot(), list, &ordered);
    }
    Ok(())
}
