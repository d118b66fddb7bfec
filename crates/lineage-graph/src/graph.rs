//! Directed graph over two record pools with intrusive adjacency.
//!
//! Each vertex record starts with the heads of its incoming and outgoing
//! edge lists; each edge record starts with its endpoints and the next
//! edge in each of those two lists. Adding an edge is an O(1) head
//! insertion, removing one walks to its predecessor (lists are singly
//! linked), and iterating a vertex's edges allocates nothing.

use std::fmt;

use lineage_core::{Handle, PoolError, SlotId};
use lineage_pool::{Field, Pool, PoolConfig, Primitive};

use crate::iter::{EdgeIter, EdgeList, Edges, Vertices};

/// Head of the incoming-edge list (`-1` = empty).
pub(crate) const FIRST_IN: Field<i32> = Field::new(0);
/// Head of the outgoing-edge list (`-1` = empty).
pub(crate) const FIRST_OUT: Field<i32> = Field::new(FIRST_IN.end());
/// Bytes of adjacency header at the start of every vertex record.
pub const VERTEX_HEADER_SIZE: usize = FIRST_OUT.end();

pub(crate) const SOURCE: Field<i32> = Field::new(0);
pub(crate) const TARGET: Field<i32> = Field::new(SOURCE.end());
/// Next edge in the source vertex's outgoing list.
pub(crate) const NEXT_SOURCE_EDGE: Field<i32> = Field::new(TARGET.end());
/// Next edge in the target vertex's incoming list.
pub(crate) const NEXT_TARGET_EDGE: Field<i32> = Field::new(NEXT_SOURCE_EDGE.end());
/// Bytes of adjacency header at the start of every edge record.
pub const EDGE_HEADER_SIZE: usize = NEXT_TARGET_EDGE.end();

/// A vertex of a [`Graph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Vertex(pub(crate) Handle);

/// An edge of a [`Graph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge(pub(crate) Handle);

impl Vertex {
    /// The generation-checked handle into the vertex pool.
    pub fn handle(self) -> Handle {
        self.0
    }

    /// The vertex's slot in the vertex pool.
    pub fn slot(self) -> SlotId {
        self.0.slot()
    }
}

impl Edge {
    /// The generation-checked handle into the edge pool.
    pub fn handle(self) -> Handle {
        self.0
    }

    /// The edge's slot in the edge pool.
    pub fn slot(self) -> SlotId {
        self.0.slot()
    }
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// A directed multigraph stored in two record pools.
///
/// Vertex and edge records carry a caller-sized payload after the
/// adjacency header. Payload fields are declared with offsets starting at
/// [`VERTEX_HEADER_SIZE`] / [`EDGE_HEADER_SIZE`].
pub struct Graph {
    vertices: Pool,
    edges: Pool,
}

impl Graph {
    /// Create an empty graph with the given payload sizes in bytes.
    pub fn new(
        vertex_payload: usize,
        edge_payload: usize,
        config: &PoolConfig,
    ) -> Result<Self, PoolError> {
        Ok(Self {
            vertices: Pool::new(VERTEX_HEADER_SIZE + vertex_payload, config)?,
            edges: Pool::new(EDGE_HEADER_SIZE + edge_payload, config)?,
        })
    }

    /// Create an empty graph with payloads and the default configuration.
    pub fn with_payloads(vertex_payload: usize, edge_payload: usize) -> Result<Self, PoolError> {
        Self::new(vertex_payload, edge_payload, &PoolConfig::default())
    }

    /// The vertex pool, for proxy-based payload reads.
    pub fn vertex_pool(&self) -> &Pool {
        &self.vertices
    }

    /// The edge pool, for proxy-based payload reads.
    pub fn edge_pool(&self) -> &Pool {
        &self.edges
    }

    /// Payload bytes per vertex.
    pub fn vertex_payload_size(&self) -> usize {
        self.vertices.record_size() - VERTEX_HEADER_SIZE
    }

    /// Payload bytes per edge.
    pub fn edge_payload_size(&self) -> usize {
        self.edges.record_size() - EDGE_HEADER_SIZE
    }

    // ── Vertices ────────────────────────────────────────────────

    /// Add an isolated vertex.
    pub fn add_vertex(&mut self) -> Result<Vertex, PoolError> {
        let handle = self.vertices.create_handle()?;
        let slot = handle.slot();
        set_link(&mut self.vertices, slot, FIRST_IN, None);
        set_link(&mut self.vertices, slot, FIRST_OUT, None);
        Ok(Vertex(handle))
    }

    /// Remove a vertex together with every edge incident to it.
    pub fn remove_vertex(&mut self, v: Vertex) -> Result<(), PoolError> {
        let slot = self.vertex_slot(v)?;
        let mut removed = 0usize;
        while let Some(e) = get_link(&self.vertices, slot, FIRST_OUT) {
            self.unlink_and_free(e)?;
            removed += 1;
        }
        while let Some(e) = get_link(&self.vertices, slot, FIRST_IN) {
            self.unlink_and_free(e)?;
            removed += 1;
        }
        self.vertices.delete(slot)?;
        tracing::trace!(vertex = %v, edges = removed, "vertex removed");
        Ok(())
    }

    /// Whether `v` is a live vertex of this graph.
    pub fn contains_vertex(&self, v: Vertex) -> bool {
        self.vertices.is_live(v.0)
    }

    /// The vertex currently in `slot`.
    pub fn vertex_at(&self, slot: SlotId) -> Result<Vertex, PoolError> {
        self.vertices.handle(slot).map(Vertex)
    }

    /// Number of live vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Iterate over all live vertices in slot order.
    pub fn vertices(&self) -> Vertices<'_> {
        Vertices::new(self.vertices.iter())
    }

    // ── Edges ───────────────────────────────────────────────────

    /// Add an edge from `source` to `target`.
    ///
    /// The edge becomes the head of both the source's outgoing list and
    /// the target's incoming list.
    pub fn add_edge(&mut self, source: Vertex, target: Vertex) -> Result<Edge, PoolError> {
        self.insert_edge(source, 0, target, 0)
    }

    /// Add an edge at explicit positions in the two adjacency lists.
    ///
    /// Positions past the end of a list append to it.
    pub fn insert_edge(
        &mut self,
        source: Vertex,
        source_out_pos: usize,
        target: Vertex,
        target_in_pos: usize,
    ) -> Result<Edge, PoolError> {
        let s = self.vertex_slot(source)?;
        let t = self.vertex_slot(target)?;
        let handle = self.edges.create_handle()?;
        let e = handle.slot();
        set_link(&mut self.edges, e, SOURCE, Some(s));
        set_link(&mut self.edges, e, TARGET, Some(t));
        self.link_at(s, FIRST_OUT, NEXT_SOURCE_EDGE, e, source_out_pos);
        self.link_at(t, FIRST_IN, NEXT_TARGET_EDGE, e, target_in_pos);
        Ok(Edge(handle))
    }

    /// Remove an edge, splicing it out of both adjacency lists.
    pub fn remove_edge(&mut self, e: Edge) -> Result<(), PoolError> {
        let slot = self.edge_slot(e)?;
        self.unlink_and_free(slot)
    }

    /// Whether `e` is a live edge of this graph.
    pub fn contains_edge(&self, e: Edge) -> bool {
        self.edges.is_live(e.0)
    }

    /// The first edge from `source` to `target`, in outgoing-list order.
    pub fn get_edge(&self, source: Vertex, target: Vertex) -> Result<Option<Edge>, PoolError> {
        let t = self.vertex_slot(target)?;
        Ok(self
            .outgoing(source)?
            .find(|e| get_link(&self.edges, e.slot(), TARGET) == Some(t)))
    }

    /// The edge's source vertex.
    pub fn source(&self, e: Edge) -> Result<Vertex, PoolError> {
        self.endpoint(e, SOURCE)
    }

    /// The edge's target vertex.
    pub fn target(&self, e: Edge) -> Result<Vertex, PoolError> {
        self.endpoint(e, TARGET)
    }

    /// Number of live edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Iterate over all live edges in slot order.
    pub fn edges(&self) -> Edges<'_> {
        Edges::new(self.edges.iter())
    }

    // ── Adjacency ───────────────────────────────────────────────

    /// Edges whose target is `v`, most recently added first.
    pub fn incoming(&self, v: Vertex) -> Result<EdgeIter<'_>, PoolError> {
        let slot = self.vertex_slot(v)?;
        Ok(EdgeIter::new(
            &self.edges,
            get_link(&self.vertices, slot, FIRST_IN),
            EdgeList::Incoming,
        ))
    }

    /// Edges whose source is `v`, most recently added first.
    pub fn outgoing(&self, v: Vertex) -> Result<EdgeIter<'_>, PoolError> {
        let slot = self.vertex_slot(v)?;
        Ok(EdgeIter::new(
            &self.edges,
            get_link(&self.vertices, slot, FIRST_OUT),
            EdgeList::Outgoing,
        ))
    }

    /// All edges incident to `v`: incoming, then outgoing.
    ///
    /// A self-loop is reported twice, once from each list.
    pub fn edges_of(
        &self,
        v: Vertex,
    ) -> Result<std::iter::Chain<EdgeIter<'_>, EdgeIter<'_>>, PoolError> {
        Ok(self.incoming(v)?.chain(self.outgoing(v)?))
    }

    /// Number of incoming edges.
    pub fn in_degree(&self, v: Vertex) -> Result<usize, PoolError> {
        Ok(self.incoming(v)?.count())
    }

    /// Number of outgoing edges.
    pub fn out_degree(&self, v: Vertex) -> Result<usize, PoolError> {
        Ok(self.outgoing(v)?.count())
    }

    /// Number of incident edges, counting a self-loop twice.
    pub fn degree(&self, v: Vertex) -> Result<usize, PoolError> {
        Ok(self.in_degree(v)? + self.out_degree(v)?)
    }

    // ── Payload access ──────────────────────────────────────────

    /// Read a vertex payload field.
    pub fn vertex_field<T: Primitive>(&self, v: Vertex, field: Field<T>) -> Result<T, PoolError> {
        check_payload(&self.vertices, field, VERTEX_HEADER_SIZE)?;
        self.vertices.read(v.0, field)
    }

    /// Write a vertex payload field.
    pub fn set_vertex_field<T: Primitive>(
        &mut self,
        v: Vertex,
        field: Field<T>,
        value: T,
    ) -> Result<(), PoolError> {
        check_payload(&self.vertices, field, VERTEX_HEADER_SIZE)?;
        self.vertices.write(v.0, field, value)
    }

    /// Read an edge payload field.
    pub fn edge_field<T: Primitive>(&self, e: Edge, field: Field<T>) -> Result<T, PoolError> {
        check_payload(&self.edges, field, EDGE_HEADER_SIZE)?;
        self.edges.read(e.0, field)
    }

    /// Write an edge payload field.
    pub fn set_edge_field<T: Primitive>(
        &mut self,
        e: Edge,
        field: Field<T>,
        value: T,
    ) -> Result<(), PoolError> {
        check_payload(&self.edges, field, EDGE_HEADER_SIZE)?;
        self.edges.write(e.0, field, value)
    }

    // ── Internals ───────────────────────────────────────────────

    pub(crate) fn vertex_slot(&self, v: Vertex) -> Result<SlotId, PoolError> {
        self.vertices.mem().check(v.0)
    }

    pub(crate) fn edge_slot(&self, e: Edge) -> Result<SlotId, PoolError> {
        self.edges.mem().check(e.0)
    }

    pub(crate) fn vertex_pool_mut(&mut self) -> &mut Pool {
        &mut self.vertices
    }

    pub(crate) fn edge_pool_mut(&mut self) -> &mut Pool {
        &mut self.edges
    }

    /// Create an edge record with endpoints set but not yet in any list.
    pub(crate) fn create_unlinked_edge(&mut self, s: SlotId, t: SlotId) -> Result<Edge, PoolError> {
        let handle = self.edges.create_handle()?;
        let e = handle.slot();
        set_link(&mut self.edges, e, SOURCE, Some(s));
        set_link(&mut self.edges, e, TARGET, Some(t));
        set_link(&mut self.edges, e, NEXT_SOURCE_EDGE, None);
        set_link(&mut self.edges, e, NEXT_TARGET_EDGE, None);
        Ok(Edge(handle))
    }

    /// Replace a vertex's adjacency list with exactly `edges`, in order.
    ///
    /// The previous list contents are not unlinked.
    pub(crate) fn set_list(&mut self, vertex: SlotId, list: EdgeList, edges: &[SlotId]) {
        let (head, next) = match list {
            EdgeList::Incoming => (FIRST_IN, NEXT_TARGET_EDGE),
            EdgeList::Outgoing => (FIRST_OUT, NEXT_SOURCE_EDGE),
        };
        set_link(&mut self.vertices, vertex, head, edges.first().copied());
        for pair in edges.windows(2) {
            set_link(&mut self.edges, pair[0], next, Some(pair[1]));
        }
        if let Some(&last) = edges.last() {
            set_link(&mut self.edges, last, next, None);
        }
    }

    fn endpoint(&self, e: Edge, field: Field<i32>) -> Result<Vertex, PoolError> {
        let slot = self.edge_slot(e)?;
        let v = get_link(&self.edges, slot, field).ok_or(PoolError::InvalidState {
            reason: "edge has no endpoint",
        })?;
        self.vertex_at(v)
    }

    /// Insert edge `e` at `pos` in the list headed by `head` of `vertex`.
    fn link_at(
        &mut self,
        vertex: SlotId,
        head: Field<i32>,
        next: Field<i32>,
        e: SlotId,
        pos: usize,
    ) {
        let first = get_link(&self.vertices, vertex, head);
        let mut prev = match first {
            Some(first) if pos > 0 => first,
            _ => {
                set_link(&mut self.edges, e, next, first);
                set_link(&mut self.vertices, vertex, head, Some(e));
                return;
            }
        };
        for _ in 1..pos {
            match get_link(&self.edges, prev, next) {
                Some(n) => prev = n,
                None => break,
            }
        }
        let after = get_link(&self.edges, prev, next);
        set_link(&mut self.edges, e, next, after);
        set_link(&mut self.edges, prev, next, Some(e));
    }

    /// Remove edge `e` from the list headed by `head` of `vertex`.
    fn unlink(&mut self, vertex: SlotId, head: Field<i32>, next: Field<i32>, e: SlotId) {
        let after = get_link(&self.edges, e, next);
        let mut cur = get_link(&self.vertices, vertex, head);
        if cur == Some(e) {
            set_link(&mut self.vertices, vertex, head, after);
            return;
        }
        while let Some(c) = cur {
            let n = get_link(&self.edges, c, next);
            if n == Some(e) {
                set_link(&mut self.edges, c, next, after);
                return;
            }
            cur = n;
        }
    }

    fn unlink_and_free(&mut self, e: SlotId) -> Result<(), PoolError> {
        let invalid = PoolError::InvalidState {
            reason: "edge has no endpoint",
        };
        let s = get_link(&self.edges, e, SOURCE).ok_or(invalid.clone())?;
        let t = get_link(&self.edges, e, TARGET).ok_or(invalid)?;
        self.unlink(s, FIRST_OUT, NEXT_SOURCE_EDGE, e);
        self.unlink(t, FIRST_IN, NEXT_TARGET_EDGE, e);
        self.edges.delete(e)
    }
}

pub(crate) fn get_link(pool: &Pool, slot: SlotId, field: Field<i32>) -> Option<SlotId> {
    SlotId::from_link(pool.read_unchecked(slot, field))
}

fn set_link(pool: &mut Pool, slot: SlotId, field: Field<i32>, link: Option<SlotId>) {
    pool.write_unchecked(slot, field, SlotId::to_link(link));
}

/// A payload field must start after the header and end within the record.
fn check_payload<T: Primitive>(
    pool: &Pool,
    field: Field<T>,
    header: usize,
) -> Result<(), PoolError> {
    if field.offset() < header {
        return Err(PoolError::InvalidState {
            reason: "payload field overlaps the adjacency header",
        });
    }
    pool.check_field(field)
}
