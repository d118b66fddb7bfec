//! Lazy iteration over node lists and whole subtrees.
//!
//! Range queries record their result as a list of individual nodes plus a
//! list of subtree roots whose every node shares the classification.
//! [`TreeNodes`] expands that pair without materialising the subtrees.

use lineage_core::{Handle, NodeId};
use smallvec::SmallVec;

use crate::tree::KdTree;

/// Nodes from a node list followed by every node of each listed subtree.
#[derive(Clone)]
pub struct TreeNodes<'a> {
    tree: &'a KdTree,
    nodes: std::slice::Iter<'a, NodeId>,
    subtrees: std::slice::Iter<'a, NodeId>,
    stack: SmallVec<[NodeId; 32]>,
}

impl<'a> TreeNodes<'a> {
    pub(crate) fn new(tree: &'a KdTree, nodes: &'a [NodeId], subtrees: &'a [NodeId]) -> Self {
        Self {
            tree,
            nodes: nodes.iter(),
            subtrees: subtrees.iter(),
            stack: SmallVec::new(),
        }
    }

    pub(crate) fn from_root(tree: &'a KdTree, root: NodeId) -> Self {
        let empty: &'a [NodeId] = &[];
        let mut stack = SmallVec::new();
        stack.push(root);
        Self {
            tree,
            nodes: empty.iter(),
            subtrees: empty.iter(),
            stack,
        }
    }
}

impl Iterator for TreeNodes<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if let Some(&node) = self.nodes.next() {
            return Some(node);
        }
        let node = match self.stack.pop() {
            Some(node) => node,
            None => *self.subtrees.next()?,
        };
        if let Some(right) = self.tree.right(node) {
            self.stack.push(right);
        }
        if let Some(left) = self.tree.left(node) {
            self.stack.push(left);
        }
        Some(node)
    }
}

/// The objects of a [`TreeNodes`] sequence, optionally skipping invalid
/// nodes.
#[derive(Clone)]
pub struct TreeValues<'a> {
    nodes: TreeNodes<'a>,
    valid_only: bool,
}

impl<'a> TreeValues<'a> {
    pub(crate) fn new(nodes: TreeNodes<'a>, valid_only: bool) -> Self {
        Self { nodes, valid_only }
    }
}

impl Iterator for TreeValues<'_> {
    type Item = Handle;

    fn next(&mut self) -> Option<Handle> {
        let tree = self.nodes.tree;
        if self.valid_only {
            self.nodes
                .by_ref()
                .find(|&n| tree.is_valid(n))
                .map(|n| tree.object(n))
        } else {
            self.nodes.next().map(|n| tree.object(n))
        }
    }
}
