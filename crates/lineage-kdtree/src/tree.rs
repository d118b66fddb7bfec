//! Static KD-tree over a snapshot of object positions.
//!
//! Nodes live in a [`Pool`] of their own, one node per object, created
//! consecutively so that node `i` is slot `i`. Construction reorders the
//! node records in place: the sublist `[i, j]` is partitioned around its
//! median along dimension `depth mod n` by quickselect, the median becomes
//! the subtree root, and both halves are built recursively. Selection is
//! linear even on repeated coordinates, so a build is `O(N log N)`.

use indexmap::IndexMap;
use lineage_core::{Handle, NodeId, ObjectPositions, Point, SlotId, SpatialError};
use lineage_pool::{Pool, PoolConfig};

use crate::iter::TreeNodes;
use crate::node::NodeLayout;

/// A balanced KD-tree of object handles.
///
/// The tree is immutable once built except for per-node validity flags,
/// which support soft deletion.
pub struct KdTree {
    nodes: Pool,
    layout: NodeLayout,
    root: Option<NodeId>,
    min: Point,
    max: Point,
    /// Coordinate reads made during construction.
    #[cfg(test)]
    reads: std::cell::Cell<usize>,
}

impl KdTree {
    /// Build a tree over `objects`, copying each position from `positions`.
    ///
    /// Every node starts valid. Fails with [`SpatialError::StaleObject`]
    /// if an object is not live.
    pub fn build<P, I>(objects: I, positions: &P) -> Result<Self, SpatialError>
    where
        P: ObjectPositions + ?Sized,
        I: IntoIterator<Item = Handle>,
    {
        let n = positions.num_dimensions();
        let objects = objects.into_iter();
        let layout = NodeLayout::new(n);
        let config = PoolConfig::new(objects.size_hint().0.min(i32::MAX as usize) as u32);
        let mut tree = Self {
            nodes: Pool::new(layout.size_in_bytes(), &config)?,
            layout,
            root: None,
            min: Point::from_elem(f64::INFINITY, n),
            max: Point::from_elem(f64::NEG_INFINITY, n),
            #[cfg(test)]
            reads: std::cell::Cell::new(0),
        };

        for object in objects {
            if !positions.is_live(object) {
                return Err(SpatialError::StaleObject { handle: object });
            }
            let node = tree.nodes.create_handle()?.slot();
            for d in 0..n {
                let x = positions.position(object, d);
                tree.nodes.write_unchecked(node, layout.position().coordinate(d), x);
                if x < tree.min[d] {
                    tree.min[d] = x;
                }
                if x > tree.max[d] {
                    tree.max[d] = x;
                }
            }
            tree.nodes.write_unchecked(node, layout.object_slot(), object.slot().0);
            tree.nodes.write_unchecked(node, layout.object_generation(), object.generation());
            tree.nodes.write_unchecked(node, layout.valid(), true);
        }

        let count = tree.nodes.len() as isize;
        let root = tree.make_node(0, count - 1, 0);
        tree.root = node_from_link(root);
        tracing::debug!(
            nodes = tree.len(),
            dims = n,
            depth = tree.depth(),
            "kd-tree built"
        );
        Ok(tree)
    }

    /// Number of nodes (and indexed objects).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Dimensionality of node positions.
    pub fn num_dimensions(&self) -> usize {
        self.layout.num_dimensions()
    }

    /// The root node, or `None` for an empty tree.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Number of levels, `floor(log2(len)) + 1`, or 0 when empty.
    pub fn depth(&self) -> usize {
        match self.len() {
            0 => 0,
            len => (usize::BITS - len.leading_zeros()) as usize,
        }
    }

    /// Per-dimension minimum of all node positions.
    ///
    /// `+inf` in every dimension for an empty tree.
    pub fn min(&self) -> &[f64] {
        &self.min
    }

    /// Per-dimension maximum of all node positions.
    ///
    /// `-inf` in every dimension for an empty tree.
    pub fn max(&self) -> &[f64] {
        &self.max
    }

    /// Coordinate `d` of a node's position.
    ///
    /// # Panics
    ///
    /// Panics if `node` is not a node of this tree.
    pub fn position(&self, node: NodeId, d: usize) -> f64 {
        self.nodes
            .read_unchecked(slot(node), self.layout.position().coordinate(d))
    }

    /// Copy a node's position into `out`.
    pub fn localize(&self, node: NodeId, out: &mut [f64]) {
        for (d, x) in out.iter_mut().enumerate() {
            *x = self.position(node, d);
        }
    }

    /// Squared Euclidean distance from a node's position to `point`.
    pub fn square_distance(&self, node: NodeId, point: &[f64]) -> f64 {
        point
            .iter()
            .enumerate()
            .map(|(d, &x)| {
                let diff = self.position(node, d) - x;
                diff * diff
            })
            .sum()
    }

    /// Left child.
    pub fn left(&self, node: NodeId) -> Option<NodeId> {
        node_from_link(self.nodes.read_unchecked(slot(node), self.layout.left()) as isize)
    }

    /// Right child.
    pub fn right(&self, node: NodeId) -> Option<NodeId> {
        node_from_link(self.nodes.read_unchecked(slot(node), self.layout.right()) as isize)
    }

    /// The object a node indexes.
    pub fn object(&self, node: NodeId) -> Handle {
        let s = self.nodes.read_unchecked(slot(node), self.layout.object_slot());
        let g = self
            .nodes
            .read_unchecked(slot(node), self.layout.object_generation());
        Handle::new(SlotId(s), g)
    }

    /// Whether a node is valid (not soft-deleted).
    pub fn is_valid(&self, node: NodeId) -> bool {
        self.nodes.read_unchecked(slot(node), self.layout.valid())
    }

    /// Set a node's validity, returning the previous value.
    pub fn set_valid(&mut self, node: NodeId, valid: bool) -> bool {
        let was = self.is_valid(node);
        self.nodes
            .write_unchecked(slot(node), self.layout.valid(), valid);
        was
    }

    /// All nodes in storage order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.len() as u32).map(NodeId)
    }

    /// All nodes of the subtree rooted at `node`, in depth-first order.
    pub fn subtree(&self, node: NodeId) -> TreeNodes<'_> {
        TreeNodes::from_root(self, node)
    }

    /// Map every indexed object to its node.
    pub fn object_to_node_map(&self) -> IndexMap<Handle, NodeId> {
        self.nodes().map(|node| (self.object(node), node)).collect()
    }

    /// Memory used by node storage in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.nodes.memory_bytes()
    }

    // ── Construction ────────────────────────────────────────────

    fn coordinate(&self, i: isize, d: usize) -> f64 {
        #[cfg(test)]
        self.reads.set(self.reads.get() + 1);
        self.nodes
            .read_unchecked(SlotId(i as u32), self.layout.position().coordinate(d))
    }

    fn swap(&mut self, a: isize, b: isize) {
        self.nodes
            .mem_mut()
            .storage_mut()
            .swap(a as usize, b as usize);
    }

    fn set_children(&mut self, k: isize, left: isize, right: isize) {
        let node = SlotId(k as u32);
        self.nodes.write_unchecked(node, self.layout.left(), left as i32);
        self.nodes.write_unchecked(node, self.layout.right(), right as i32);
    }

    /// Build the subtree over `[i, j]` split along `d`; returns its root
    /// or -1 for an empty range.
    fn make_node(&mut self, i: isize, j: isize, d: usize) -> isize {
        if j > i {
            let k = i + (j - i) / 2;
            self.kth_element(i, j, k, d);
            let d_child = if d + 1 == self.num_dimensions() { 0 } else { d + 1 };
            let left = self.make_node(i, k - 1, d_child);
            let right = self.make_node(k + 1, j, d_child);
            self.set_children(k, left, right);
            k
        } else if j == i {
            self.set_children(i, -1, -1);
            i
        } else {
            -1
        }
    }

    /// Reorder `[i, j]` so that position `k` holds the k-th smallest
    /// coordinate along `d`, smaller-or-equal before and larger-or-equal
    /// after.
    ///
    /// Quickselect over a median-of-three pivot with a three-way
    /// partition, so a run of equal coordinates settles in one pass. Once
    /// the round budget is spent the pivot becomes the exact k-th value,
    /// which ends the selection in the next partition.
    fn kth_element(&mut self, mut i: isize, mut j: isize, k: isize, d: usize) {
        let len = (j - i + 1) as usize;
        let mut budget = 2 * (usize::BITS - len.leading_zeros());
        while i < j {
            let pivot = if budget == 0 {
                self.exact_kth(i, j, k, d)
            } else {
                budget -= 1;
                self.median_of_three(i, j, d)
            };
            let (lt, gt) = self.partition(i, j, pivot, d);
            if k < lt {
                j = lt - 1;
            } else if k > gt {
                i = gt + 1;
            } else {
                break;
            }
        }
    }

    fn median_of_three(&self, i: isize, j: isize, d: usize) -> f64 {
        let a = self.coordinate(i, d);
        let b = self.coordinate(i + (j - i) / 2, d);
        let c = self.coordinate(j, d);
        a.min(b).max(a.max(b).min(c))
    }

    /// The k-th smallest coordinate of `[i, j]`, found on a scratch copy.
    fn exact_kth(&self, i: isize, j: isize, k: isize, d: usize) -> f64 {
        let mut values: Vec<f64> = (i..=j).map(|m| self.coordinate(m, d)).collect();
        let (_, kth, _) = values.select_nth_unstable_by((k - i) as usize, f64::total_cmp);
        *kth
    }

    /// Three-way partition of `[i, j]` around `pivot`: below `lt` are
    /// smaller, above `gt` are larger, and `[lt, gt]` are equal. `pivot`
    /// must be the coordinate of some element in the range, which keeps
    /// `[lt, gt]` non-empty.
    fn partition(&mut self, i: isize, j: isize, pivot: f64, d: usize) -> (isize, isize) {
        let (mut lt, mut m, mut gt) = (i, i, j);
        while m <= gt {
            let x = self.coordinate(m, d);
            if x < pivot {
                self.swap(lt, m);
                lt += 1;
                m += 1;
            } else if x > pivot {
                self.swap(m, gt);
                gt -= 1;
            } else {
                m += 1;
            }
        }
        (lt, gt)
    }
}

fn slot(node: NodeId) -> SlotId {
    SlotId(node.0)
}

/// Decode a child link; negative means "no child".
fn node_from_link(link: isize) -> Option<NodeId> {
    u32::try_from(link).ok().map(NodeId)
}
