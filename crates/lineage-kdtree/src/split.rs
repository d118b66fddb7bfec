//! Partition a KD-tree by a single hyperplane.
//!
//! Same pruning as the polytope clip restricted to one plane: a subtree
//! whose bounding box lies wholly on one side is recorded without being
//! visited.

use lineage_core::{HyperPlane, NodeId, SpatialError};

use crate::iter::{TreeNodes, TreeValues};
use crate::tree::KdTree;

/// Reusable hyperplane split over a [`KdTree`].
///
/// A node is *above* the plane when `normal · position >= distance`.
pub struct SplitHyperPlaneKdTree<'t> {
    tree: &'t KdTree,
    normal: Vec<f64>,
    m: f64,
    xmin: Vec<f64>,
    xmax: Vec<f64>,
    above_nodes: Vec<NodeId>,
    above_subtrees: Vec<NodeId>,
    below_nodes: Vec<NodeId>,
    below_subtrees: Vec<NodeId>,
}

impl<'t> SplitHyperPlaneKdTree<'t> {
    /// Create a split query over `tree`.
    pub fn new(tree: &'t KdTree) -> Self {
        let n = tree.num_dimensions();
        Self {
            tree,
            normal: vec![0.0; n],
            m: 0.0,
            xmin: vec![0.0; n],
            xmax: vec![0.0; n],
            above_nodes: Vec::new(),
            above_subtrees: Vec::new(),
            below_nodes: Vec::new(),
            below_subtrees: Vec::new(),
        }
    }

    /// The tree being split.
    pub fn tree(&self) -> &'t KdTree {
        self.tree
    }

    /// Split the tree by `plane`, replacing the previous result.
    pub fn split(&mut self, plane: &HyperPlane) -> Result<(), SpatialError> {
        let n = self.tree.num_dimensions();
        if plane.num_dimensions() != n {
            return Err(SpatialError::DimensionMismatch {
                expected: n,
                found: plane.num_dimensions(),
            });
        }
        self.normal.copy_from_slice(plane.normal());
        self.m = plane.distance();
        self.above_nodes.clear();
        self.above_subtrees.clear();
        self.below_nodes.clear();
        self.below_subtrees.clear();
        self.xmin.copy_from_slice(self.tree.min());
        self.xmax.copy_from_slice(self.tree.max());
        if let Some(root) = self.tree.root() {
            self.split_node(root, 0);
        }
        tracing::trace!(
            above_nodes = self.above_nodes.len(),
            above_subtrees = self.above_subtrees.len(),
            below_nodes = self.below_nodes.len(),
            below_subtrees = self.below_subtrees.len(),
            "kd-tree split"
        );
        Ok(())
    }

    /// Nodes above the last plane.
    pub fn above_nodes(&self) -> TreeNodes<'_> {
        TreeNodes::new(self.tree, &self.above_nodes, &self.above_subtrees)
    }

    /// Nodes below the last plane.
    pub fn below_nodes(&self) -> TreeNodes<'_> {
        TreeNodes::new(self.tree, &self.below_nodes, &self.below_subtrees)
    }

    /// Objects above the last plane.
    pub fn above_values(&self) -> TreeValues<'_> {
        TreeValues::new(self.above_nodes(), false)
    }

    /// Objects below the last plane.
    pub fn below_values(&self) -> TreeValues<'_> {
        TreeValues::new(self.below_nodes(), false)
    }

    /// Objects of valid nodes above the last plane.
    pub fn valid_above_values(&self) -> TreeValues<'_> {
        TreeValues::new(self.above_nodes(), true)
    }

    /// Objects of valid nodes below the last plane.
    pub fn valid_below_values(&self) -> TreeValues<'_> {
        TreeValues::new(self.below_nodes(), true)
    }

    fn all_above(&self) -> bool {
        let dot: f64 = self
            .normal
            .iter()
            .enumerate()
            .map(|(d, &nd)| nd * if nd >= 0.0 { self.xmin[d] } else { self.xmax[d] })
            .sum();
        dot >= self.m
    }

    fn all_below(&self) -> bool {
        let dot: f64 = self
            .normal
            .iter()
            .enumerate()
            .map(|(d, &nd)| nd * if nd < 0.0 { self.xmin[d] } else { self.xmax[d] })
            .sum();
        dot < self.m
    }

    /// `p`: the parent is above. `q`: the normal points into this child's
    /// half of the parent box.
    fn split_subtree(&mut self, node: NodeId, sd: usize, p: bool, q: bool) {
        if p && q && self.all_above() {
            self.above_subtrees.push(node);
        } else if !p && !q && self.all_below() {
            self.below_subtrees.push(node);
        } else {
            let next = if sd + 1 == self.tree.num_dimensions() { 0 } else { sd + 1 };
            self.split_node(node, next);
        }
    }

    fn split_node(&mut self, node: NodeId, sd: usize) {
        let tree = self.tree;
        let sc = tree.position(node, sd);
        let dot: f64 = self
            .normal
            .iter()
            .enumerate()
            .map(|(d, &nd)| tree.position(node, d) * nd)
            .sum();
        let p = dot >= self.m;
        if p {
            self.above_nodes.push(node);
        } else {
            self.below_nodes.push(node);
        }

        let nd = self.normal[sd];
        if let Some(left) = tree.left(node) {
            let max = self.xmax[sd];
            self.xmax[sd] = sc;
            self.split_subtree(left, sd, p, nd < 0.0);
            self.xmax[sd] = max;
        }
        if let Some(right) = tree.right(node) {
            let min = self.xmin[sd];
            self.xmin[sd] = sc;
            self.split_subtree(right, sd, p, nd >= 0.0);
            self.xmin[sd] = min;
        }
    }
}
