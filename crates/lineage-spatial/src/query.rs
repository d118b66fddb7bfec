//! Queries over a [`SpatialIndex`](crate::SpatialIndex).
//!
//! Each query runs the valid-only tree query, then scans the overlay by
//! brute force. Objects no longer live in the position source are skipped
//! on both paths.

use indexmap::IndexSet;
use lineage_core::{
    ClipConvexPolytope, ConvexPolytope, Handle, NearestNeighborSearch, Neighbor, ObjectPositions,
    Point, SpatialError,
};
use lineage_kdtree::{ClipConvexPolytopeKdTree, KdTree, NearestNeighborSearchOnKdTree, TreeValues};

// ── Nearest neighbour ───────────────────────────────────────────

/// Nearest-neighbour search over the tree and the overlay.
pub struct IndexNearestNeighborSearch<'a, P: ?Sized> {
    search: NearestNeighborSearchOnKdTree<'a>,
    added: &'a IndexSet<Handle>,
    positions: &'a P,
    best: Option<Neighbor>,
}

impl<'a, P> IndexNearestNeighborSearch<'a, P>
where
    P: ObjectPositions + ?Sized,
{
    pub(crate) fn new(tree: &'a KdTree, added: &'a IndexSet<Handle>, positions: &'a P) -> Self {
        Self {
            search: NearestNeighborSearchOnKdTree::valid_only(tree),
            added,
            positions,
            best: None,
        }
    }
}

impl<P> NearestNeighborSearch for IndexNearestNeighborSearch<'_, P>
where
    P: ObjectPositions + ?Sized,
{
    fn num_dimensions(&self) -> usize {
        self.search.tree().num_dimensions()
    }

    fn search(&mut self, point: &[f64]) -> Result<Option<Neighbor>, SpatialError> {
        let positions = self.positions;
        let tree = self.search.tree();
        let mut best = self
            .search
            .search_filtered(point, |node| positions.is_live(tree.object(node)))?;

        for &object in self.added {
            if !positions.is_live(object) {
                continue;
            }
            let square_distance: f64 = point
                .iter()
                .enumerate()
                .map(|(d, &x)| {
                    let diff = positions.position(object, d) - x;
                    diff * diff
                })
                .sum();
            if best.is_none_or(|b| square_distance < b.square_distance) {
                best = Some(Neighbor {
                    object,
                    square_distance,
                });
            }
        }

        self.best = best;
        Ok(best)
    }

    fn nearest(&self) -> Option<Neighbor> {
        self.best
    }
}

// ── Convex polytope clip ────────────────────────────────────────

/// Convex-polytope clip over the tree and the overlay.
pub struct IndexClip<'a, P: ?Sized> {
    clip: ClipConvexPolytopeKdTree<'a>,
    added: &'a IndexSet<Handle>,
    positions: &'a P,
    inside: Vec<Handle>,
    outside: Vec<Handle>,
    point: Point,
}

impl<'a, P> IndexClip<'a, P>
where
    P: ObjectPositions + ?Sized,
{
    pub(crate) fn new(tree: &'a KdTree, added: &'a IndexSet<Handle>, positions: &'a P) -> Self {
        Self {
            clip: ClipConvexPolytopeKdTree::new(tree),
            added,
            positions,
            inside: Vec::new(),
            outside: Vec::new(),
            point: Point::from_elem(0.0, tree.num_dimensions()),
        }
    }
}

impl<P> ClipConvexPolytope for IndexClip<'_, P>
where
    P: ObjectPositions + ?Sized,
{
    type Values<'b>
        = IndexValues<'b, P>
    where
        Self: 'b;

    fn num_dimensions(&self) -> usize {
        self.clip.num_dimensions()
    }

    fn clip(&mut self, polytope: &ConvexPolytope) -> Result<(), SpatialError> {
        self.clip.clip(polytope)?;
        self.inside.clear();
        self.outside.clear();
        for &object in self.added {
            if !self.positions.is_live(object) {
                continue;
            }
            self.positions.localize(object, &mut self.point);
            if polytope.contains(&self.point) {
                self.inside.push(object);
            } else {
                self.outside.push(object);
            }
        }
        Ok(())
    }

    fn inside_values(&self) -> IndexValues<'_, P> {
        IndexValues {
            tree: self.clip.valid_inside_values(),
            added: self.inside.iter(),
            positions: self.positions,
        }
    }

    fn outside_values(&self) -> IndexValues<'_, P> {
        IndexValues {
            tree: self.clip.valid_outside_values(),
            added: self.outside.iter(),
            positions: self.positions,
        }
    }
}

/// Live objects on one side of a clip: tree hits first, then the overlay.
pub struct IndexValues<'a, P: ?Sized> {
    tree: TreeValues<'a>,
    added: std::slice::Iter<'a, Handle>,
    positions: &'a P,
}

impl<P> Iterator for IndexValues<'_, P>
where
    P: ObjectPositions + ?Sized,
{
    type Item = Handle;

    fn next(&mut self) -> Option<Handle> {
        let positions = self.positions;
        if let Some(object) = self.tree.by_ref().find(|&h| positions.is_live(h)) {
            return Some(object);
        }
        self.added.next().copied()
    }
}
