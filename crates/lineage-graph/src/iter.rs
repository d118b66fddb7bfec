//! Allocation-free iterators over graph elements.

use lineage_core::SlotId;
use lineage_pool::{LiveSlots, Pool};

use crate::graph::{get_link, Edge, Vertex, NEXT_SOURCE_EDGE, NEXT_TARGET_EDGE};

/// Which intrusive list an [`EdgeIter`] follows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeList {
    /// A vertex's incoming edges, chained through each edge's
    /// next-target link.
    Incoming,
    /// A vertex's outgoing edges, chained through each edge's
    /// next-source link.
    Outgoing,
}

/// Walks one adjacency list of a vertex.
#[derive(Clone)]
pub struct EdgeIter<'g> {
    edges: &'g Pool,
    next: Option<SlotId>,
    list: EdgeList,
}

impl<'g> EdgeIter<'g> {
    pub(crate) fn new(edges: &'g Pool, first: Option<SlotId>, list: EdgeList) -> Self {
        Self {
            edges,
            next: first,
            list,
        }
    }

    /// The list being walked.
    pub fn list(&self) -> EdgeList {
        self.list
    }
}

impl Iterator for EdgeIter<'_> {
    type Item = Edge;

    fn next(&mut self) -> Option<Edge> {
        let slot = self.next?;
        let link = match self.list {
            EdgeList::Incoming => NEXT_TARGET_EDGE,
            EdgeList::Outgoing => NEXT_SOURCE_EDGE,
        };
        self.next = get_link(self.edges, slot, link);
        // Lists only ever hold live edges.
        match self.edges.handle(slot) {
            Ok(handle) => Some(Edge(handle)),
            Err(_) => {
                self.next = None;
                None
            }
        }
    }
}

/// All live vertices of a graph, in slot order.
#[derive(Clone)]
pub struct Vertices<'g> {
    slots: LiveSlots<'g>,
}

impl<'g> Vertices<'g> {
    pub(crate) fn new(slots: LiveSlots<'g>) -> Self {
        Self { slots }
    }
}

impl Iterator for Vertices<'_> {
    type Item = Vertex;

    fn next(&mut self) -> Option<Vertex> {
        self.slots.next().map(Vertex)
    }
}

/// All live edges of a graph, in slot order.
#[derive(Clone)]
pub struct Edges<'g> {
    slots: LiveSlots<'g>,
}

impl<'g> Edges<'g> {
    pub(crate) fn new(slots: LiveSlots<'g>) -> Self {
        Self { slots }
    }
}

impl Iterator for Edges<'_> {
    type Item = Edge;

    fn next(&mut self) -> Option<Edge> {
        self.slots.next().map(Edge)
    }
}
