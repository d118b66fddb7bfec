//! Branch-and-bound nearest-neighbour search.
//!
//! Each visited node is compared against the current best, then the
//! search descends toward the query's side of the splitting plane and
//! visits the far side only if the plane is closer than the best so far.
//! Comparison is strict, so among equidistant nodes the first one visited
//! wins.

use lineage_core::{NearestNeighborSearch, Neighbor, NodeId, Point, SpatialError};

use crate::tree::KdTree;

/// Reusable nearest-neighbour query over a [`KdTree`].
///
/// Built with [`new`](Self::new) the search considers every node; built
/// with [`valid_only`](Self::valid_only) it never accepts an invalid node
/// but still descends beneath one.
pub struct NearestNeighborSearchOnKdTree<'t> {
    tree: &'t KdTree,
    valid_only: bool,
    query: Point,
    best: Option<NodeId>,
    best_square_distance: f64,
}

impl<'t> NearestNeighborSearchOnKdTree<'t> {
    /// Exact search over all nodes.
    pub fn new(tree: &'t KdTree) -> Self {
        Self::with_validity(tree, false)
    }

    /// Search over valid nodes only.
    pub fn valid_only(tree: &'t KdTree) -> Self {
        Self::with_validity(tree, true)
    }

    fn with_validity(tree: &'t KdTree, valid_only: bool) -> Self {
        Self {
            tree,
            valid_only,
            query: Point::from_elem(0.0, tree.num_dimensions()),
            best: None,
            best_square_distance: f64::INFINITY,
        }
    }

    /// The tree being searched.
    pub fn tree(&self) -> &'t KdTree {
        self.tree
    }

    /// The node found by the most recent search.
    pub fn best_node(&self) -> Option<NodeId> {
        self.best
    }

    /// Search with an extra acceptance test on candidate nodes.
    ///
    /// Nodes rejected by `accept` (or invalid nodes, for a valid-only
    /// search) are never returned, but their subtrees are still searched.
    pub fn search_filtered<F>(
        &mut self,
        point: &[f64],
        mut accept: F,
    ) -> Result<Option<Neighbor>, SpatialError>
    where
        F: FnMut(NodeId) -> bool,
    {
        let n = self.tree.num_dimensions();
        if point.len() != n {
            return Err(SpatialError::DimensionMismatch {
                expected: n,
                found: point.len(),
            });
        }
        self.query.clear();
        self.query.extend_from_slice(point);
        self.best = None;
        self.best_square_distance = f64::INFINITY;
        if let Some(root) = self.tree.root() {
            self.search_node(root, 0, &mut accept);
        }
        Ok(self.nearest())
    }

    fn search_node<F>(&mut self, node: NodeId, d: usize, accept: &mut F)
    where
        F: FnMut(NodeId) -> bool,
    {
        let tree = self.tree;
        if !self.valid_only || tree.is_valid(node) {
            let distance = tree.square_distance(node, &self.query);
            if distance < self.best_square_distance && accept(node) {
                self.best_square_distance = distance;
                self.best = Some(node);
            }
        }

        let axis_diff = self.query[d] - tree.position(node, d);
        let axis_square_distance = axis_diff * axis_diff;
        let (near, far) = if axis_diff < 0.0 {
            (tree.left(node), tree.right(node))
        } else {
            (tree.right(node), tree.left(node))
        };
        let d_child = if d + 1 == tree.num_dimensions() { 0 } else { d + 1 };

        if let Some(near) = near {
            self.search_node(near, d_child, accept);
        }
        if let Some(far) = far {
            if axis_square_distance <= self.best_square_distance {
                self.search_node(far, d_child, accept);
            }
        }
    }
}

impl NearestNeighborSearch for NearestNeighborSearchOnKdTree<'_> {
    fn num_dimensions(&self) -> usize {
        self.tree.num_dimensions()
    }

    fn search(&mut self, point: &[f64]) -> Result<Option<Neighbor>, SpatialError> {
        self.search_filtered(point, |_| true)
    }

    fn nearest(&self) -> Option<Neighbor> {
        self.best.map(|node| Neighbor {
            object: self.tree.object(node),
            square_distance: self.best_square_distance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineage_core::Handle;
    use lineage_pool::{Pool, PoolConfig, PoolPositions, PositionLayout};

    const LAYOUT: PositionLayout = PositionLayout::new(0, 2);

    fn grid() -> (Pool, Vec<Handle>) {
        let mut pool = Pool::new(LAYOUT.end(), &PoolConfig::new(25)).unwrap();
        let mut handles = Vec::new();
        for x in 0..5 {
            for y in 0..5 {
                let h = pool.create_handle().unwrap();
                pool.write(h, LAYOUT.coordinate(0), x as f64).unwrap();
                pool.write(h, LAYOUT.coordinate(1), y as f64).unwrap();
                handles.push(h);
            }
        }
        (pool, handles)
    }

    #[test]
    fn finds_exact_grid_point() {
        let (pool, handles) = grid();
        let positions = PoolPositions::new(&pool, LAYOUT);
        let tree = KdTree::build(handles.clone(), &positions).unwrap();
        let mut search = NearestNeighborSearchOnKdTree::new(&tree);
        let found = search.search(&[3.1, 1.2]).unwrap().unwrap();
        assert_eq!(found.object, handles[3 * 5 + 1]);
        assert!((found.square_distance - 0.05).abs() < 1e-12);
        assert!((found.distance() - 0.05f64.sqrt()).abs() < 1e-12);
        assert_eq!(search.nearest(), Some(found));
    }

    #[test]
    fn empty_tree_finds_nothing() {
        let (pool, _) = grid();
        let positions = PoolPositions::new(&pool, LAYOUT);
        let tree = KdTree::build(Vec::new(), &positions).unwrap();
        let mut search = NearestNeighborSearchOnKdTree::new(&tree);
        assert_eq!(search.search(&[0.0, 0.0]).unwrap(), None);
    }

    #[test]
    fn wrong_dimensionality_is_rejected() {
        let (pool, handles) = grid();
        let positions = PoolPositions::new(&pool, LAYOUT);
        let tree = KdTree::build(handles, &positions).unwrap();
        let mut search = NearestNeighborSearchOnKdTree::new(&tree);
        assert!(matches!(
            search.search(&[0.0, 0.0, 0.0]),
            Err(SpatialError::DimensionMismatch {
                expected: 2,
                found: 3
            })
        ));
    }

    #[test]
    fn valid_only_skips_invalid_nodes_but_not_their_subtrees() {
        let (pool, handles) = grid();
        let positions = PoolPositions::new(&pool, LAYOUT);
        let mut tree = KdTree::build(handles.clone(), &positions).unwrap();
        let map = tree.object_to_node_map();

        // Invalidate the root and the exact match.
        let root = tree.root().unwrap();
        tree.set_valid(root, false);
        tree.set_valid(map[&handles[12]], false);

        let mut search = NearestNeighborSearchOnKdTree::valid_only(&tree);
        let found = search.search(&[2.0, 2.0]).unwrap().unwrap();
        assert_ne!(found.object, handles[12]);
        assert!(tree.is_valid(search.best_node().unwrap()));
        assert_eq!(found.square_distance, 1.0);

        let mut exact = NearestNeighborSearchOnKdTree::new(&tree);
        assert_eq!(exact.search(&[2.0, 2.0]).unwrap().unwrap().object, handles[12]);
    }

    #[test]
    fn valid_only_with_no_valid_nodes_finds_nothing() {
        let (pool, handles) = grid();
        let positions = PoolPositions::new(&pool, LAYOUT);
        let mut tree = KdTree::build(handles, &positions).unwrap();
        let nodes: Vec<NodeId> = tree.nodes().collect();
        for node in nodes {
            tree.set_valid(node, false);
        }
        let mut search = NearestNeighborSearchOnKdTree::valid_only(&tree);
        assert_eq!(search.search(&[1.0, 1.0]).unwrap(), None);
    }

    #[test]
    fn filter_rejects_candidates() {
        let (pool, handles) = grid();
        let positions = PoolPositions::new(&pool, LAYOUT);
        let tree = KdTree::build(handles.clone(), &positions).unwrap();
        let mut search = NearestNeighborSearchOnKdTree::new(&tree);
        let exclude = handles[0];
        let found = search
            .search_filtered(&[0.0, 0.0], |node| tree.object(node) != exclude)
            .unwrap()
            .unwrap();
        assert_eq!(found.square_distance, 1.0);
    }
}
