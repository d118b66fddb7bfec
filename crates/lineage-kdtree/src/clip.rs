//! Partition a KD-tree by a convex polytope.
//!
//! The traversal narrows a bounding box at every splitting plane it
//! passes. Per recursion depth it keeps which half-spaces are still
//! *active*, i.e. not yet known to contain the whole box. A subtree whose
//! box lies above every active half-space is recorded as entirely inside;
//! one whose box lies below any half-space is recorded as entirely
//! outside. Only ambiguous subtrees are visited node by node.

use lineage_core::{ClipConvexPolytope, ConvexPolytope, NodeId, SpatialError};

use crate::iter::{TreeNodes, TreeValues};
use crate::tree::KdTree;

/// Reusable convex-polytope range query over a [`KdTree`].
pub struct ClipConvexPolytopeKdTree<'t> {
    tree: &'t KdTree,
    n: usize,
    n_planes: usize,
    /// Plane normals, `n` values per plane.
    normals: Vec<f64>,
    /// Plane offsets.
    ms: Vec<f64>,
    /// `q_left[d * n_planes + i]`: plane `i` points toward lower `d`.
    q_left: Vec<bool>,
    /// `q_right[d * n_planes + i]`: plane `i` points toward higher `d`.
    q_right: Vec<bool>,
    xmin: Vec<f64>,
    xmax: Vec<f64>,
    /// Active flags, `n_planes` per recursion depth.
    active: Vec<bool>,
    /// Whether the node at each depth is above each active plane.
    ps: Vec<bool>,
    in_nodes: Vec<NodeId>,
    in_subtrees: Vec<NodeId>,
    out_nodes: Vec<NodeId>,
    out_subtrees: Vec<NodeId>,
}

impl<'t> ClipConvexPolytopeKdTree<'t> {
    /// Create a clip query over `tree`.
    pub fn new(tree: &'t KdTree) -> Self {
        let n = tree.num_dimensions();
        Self {
            tree,
            n,
            n_planes: 0,
            normals: Vec::new(),
            ms: Vec::new(),
            q_left: Vec::new(),
            q_right: Vec::new(),
            xmin: vec![0.0; n],
            xmax: vec![0.0; n],
            active: Vec::new(),
            ps: Vec::new(),
            in_nodes: Vec::new(),
            in_subtrees: Vec::new(),
            out_nodes: Vec::new(),
            out_subtrees: Vec::new(),
        }
    }

    /// The tree being clipped.
    pub fn tree(&self) -> &'t KdTree {
        self.tree
    }

    /// Clip with planes given as rows `[n_0, ..., n_{d-1}, offset]`.
    pub fn clip_rows<R: AsRef<[f64]>>(&mut self, rows: &[R]) -> Result<(), SpatialError> {
        self.clip(&ConvexPolytope::from_rows(rows)?)
    }

    /// Nodes inside the last clipped polytope.
    pub fn inside_nodes(&self) -> TreeNodes<'_> {
        TreeNodes::new(self.tree, &self.in_nodes, &self.in_subtrees)
    }

    /// Nodes outside the last clipped polytope.
    pub fn outside_nodes(&self) -> TreeNodes<'_> {
        TreeNodes::new(self.tree, &self.out_nodes, &self.out_subtrees)
    }

    /// Objects of valid nodes inside the last clipped polytope.
    pub fn valid_inside_values(&self) -> TreeValues<'_> {
        TreeValues::new(self.inside_nodes(), true)
    }

    /// Objects of valid nodes outside the last clipped polytope.
    pub fn valid_outside_values(&self) -> TreeValues<'_> {
        TreeValues::new(self.outside_nodes(), true)
    }

    fn init_new_search(&mut self, polytope: &ConvexPolytope) {
        let n = self.n;
        let planes = polytope.planes();
        self.n_planes = planes.len();
        self.normals.clear();
        self.ms.clear();
        self.q_left.clear();
        self.q_left.resize(n * planes.len(), false);
        self.q_right.clear();
        self.q_right.resize(n * planes.len(), false);
        for (i, plane) in planes.iter().enumerate() {
            self.normals.extend_from_slice(plane.normal());
            self.ms.push(plane.distance());
            for (d, &nd) in plane.normal().iter().enumerate() {
                self.q_left[d * planes.len() + i] = nd < 0.0;
                self.q_right[d * planes.len() + i] = nd >= 0.0;
            }
        }
        self.in_nodes.clear();
        self.in_subtrees.clear();
        self.out_nodes.clear();
        self.out_subtrees.clear();
        self.xmin.copy_from_slice(self.tree.min());
        self.xmax.copy_from_slice(self.tree.max());
        self.active.clear();
        self.active.resize(self.n_planes, true);
        self.ps.clear();
        self.ps.resize(self.n_planes, false);
    }

    /// Make sure flag storage exists for `depth`.
    fn reserve_depth(&mut self, depth: usize) {
        let needed = (depth + 1) * self.n_planes;
        if self.active.len() < needed {
            self.active.resize(needed, false);
            self.ps.resize(needed, false);
        }
    }

    fn normal(&self, i: usize) -> &[f64] {
        &self.normals[i * self.n..(i + 1) * self.n]
    }

    /// Whether the whole box is above plane `i`.
    fn all_above(&self, i: usize) -> bool {
        let dot: f64 = self
            .normal(i)
            .iter()
            .enumerate()
            .map(|(d, &nd)| nd * if nd >= 0.0 { self.xmin[d] } else { self.xmax[d] })
            .sum();
        dot >= self.ms[i]
    }

    /// Whether the whole box is below plane `i`.
    fn all_below(&self, i: usize) -> bool {
        let dot: f64 = self
            .normal(i)
            .iter()
            .enumerate()
            .map(|(d, &nd)| nd * if nd < 0.0 { self.xmin[d] } else { self.xmax[d] })
            .sum();
        dot < self.ms[i]
    }

    /// Classify the subtree under `node`, whose parent is at `depth`.
    fn clip_subtree(&mut self, node: NodeId, depth: usize, toward_right: bool, qoff: usize) {
        self.reserve_depth(depth + 1);
        let np = self.n_planes;
        let here = depth * np;
        let next = here + np;
        self.active.copy_within(here..next, next);

        let mut none_active = true;
        for i in 0..np {
            if !self.active[here + i] {
                continue;
            }
            let p = self.ps[here + i];
            let q = if toward_right {
                self.q_right[qoff + i]
            } else {
                self.q_left[qoff + i]
            };
            if p && q && self.all_above(i) {
                self.active[next + i] = false;
            } else {
                none_active = false;
                if !p && !q && self.all_below(i) {
                    self.out_subtrees.push(node);
                    return;
                }
            }
        }
        if none_active {
            self.in_subtrees.push(node);
        } else {
            self.clip_node(node, depth + 1);
        }
    }

    fn clip_node(&mut self, node: NodeId, depth: usize) {
        let tree = self.tree;
        let np = self.n_planes;
        let here = depth * np;
        let sd = depth % self.n;
        let sc = tree.position(node, sd);

        let mut inside = true;
        for i in 0..np {
            if self.active[here + i] {
                let dot: f64 = self
                    .normal(i)
                    .iter()
                    .enumerate()
                    .map(|(d, &nd)| tree.position(node, d) * nd)
                    .sum();
                let above = dot >= self.ms[i];
                self.ps[here + i] = above;
                inside &= above;
            }
        }
        if inside {
            self.in_nodes.push(node);
        } else {
            self.out_nodes.push(node);
        }

        let qoff = sd * np;
        if let Some(left) = tree.left(node) {
            let max = self.xmax[sd];
            self.xmax[sd] = sc;
            self.clip_subtree(left, depth, false, qoff);
            self.xmax[sd] = max;
        }
        if let Some(right) = tree.right(node) {
            let min = self.xmin[sd];
            self.xmin[sd] = sc;
            self.clip_subtree(right, depth, true, qoff);
            self.xmin[sd] = min;
        }
    }
}

impl ClipConvexPolytope for ClipConvexPolytopeKdTree<'_> {
    type Values<'a>
        = TreeValues<'a>
    where
        Self: 'a;

    fn num_dimensions(&self) -> usize {
        self.n
    }

    fn clip(&mut self, polytope: &ConvexPolytope) -> Result<(), SpatialError> {
        polytope.check_dimensions(self.n)?;
        self.init_new_search(polytope);
        if let Some(root) = self.tree.root() {
            self.clip_node(root, 0);
        }
        tracing::trace!(
            planes = self.n_planes,
            in_nodes = self.in_nodes.len(),
            in_subtrees = self.in_subtrees.len(),
            out_nodes = self.out_nodes.len(),
            out_subtrees = self.out_subtrees.len(),
            "kd-tree clipped"
        );
        Ok(())
    }

    fn inside_values(&self) -> TreeValues<'_> {
        TreeValues::new(self.inside_nodes(), false)
    }

    fn outside_values(&self) -> TreeValues<'_> {
        TreeValues::new(self.outside_nodes(), false)
    }
}
