//! Two-tier spatial index: a KD-tree snapshot plus a mutable overlay.

use indexmap::{IndexMap, IndexSet};
use lineage_core::{Handle, NodeId, ObjectPositions, SpatialError};
use lineage_kdtree::KdTree;

use crate::query::{IndexClip, IndexNearestNeighborSearch};

/// An incrementally maintained spatial index.
///
/// Built objects live in an immutable [`KdTree`]. Later changes never
/// restructure it: removing (or moving) a built object invalidates its
/// tree node, and added or moved objects go to an unstructured overlay
/// that queries scan linearly. A moved object keeps its (now invalid)
/// tree node, so a later `remove` leaves it in the overlay and reports
/// `false`. [`mod_count`](Self::mod_count) measures
/// how much work the overlay costs, so callers can decide when to
/// [`rebuild`](Self::rebuild).
///
/// The index stores only handles. Positions are read through an
/// [`ObjectPositions`] source at query time, and handles that are no
/// longer live there are skipped.
pub struct SpatialIndex {
    tree: KdTree,
    /// Objects with a tree node, valid or invalidated by a move.
    node_map: IndexMap<Handle, NodeId>,
    /// Objects added since the tree was built.
    added: IndexSet<Handle>,
    size: usize,
    /// Tree nodes invalidated since the build.
    invalid: usize,
    /// Overlay entries removed since the build.
    retired: usize,
}

impl SpatialIndex {
    /// Index `objects`, reading positions from `positions`.
    pub fn build<P, I>(objects: I, positions: &P) -> Result<Self, SpatialError>
    where
        P: ObjectPositions + ?Sized,
        I: IntoIterator<Item = Handle>,
    {
        let tree = KdTree::build(objects, positions)?;
        let node_map = tree.object_to_node_map();
        Ok(Self {
            size: node_map.len(),
            tree,
            node_map,
            added: IndexSet::new(),
            invalid: 0,
            retired: 0,
        })
    }

    /// An empty index for positions of `positions`' dimensionality.
    pub fn empty<P>(positions: &P) -> Result<Self, SpatialError>
    where
        P: ObjectPositions + ?Sized,
    {
        Self::build(std::iter::empty(), positions)
    }

    /// Build a fresh index over the current contents.
    ///
    /// Objects no longer live in `positions` are dropped. The new index
    /// has an empty overlay and a `mod_count` of zero.
    pub fn rebuild<P>(&self, positions: &P) -> Result<Self, SpatialError>
    where
        P: ObjectPositions + ?Sized,
    {
        let live = self.iter().filter(|&h| positions.is_live(h));
        let rebuilt = Self::build(live, positions)?;
        tracing::debug!(
            before = self.size,
            after = rebuilt.size,
            mod_count = self.mod_count(),
            "spatial index rebuilt"
        );
        Ok(rebuilt)
    }

    /// Add `object`, or record that its position changed.
    ///
    /// A valid tree node for `object` is invalidated and the object moves
    /// to the overlay. Returns `true` if the object was not indexed before.
    pub fn add(&mut self, object: Handle) -> bool {
        let was_indexed = match self.node_map.get(&object) {
            Some(&node) => self.invalidate(object, node),
            None => false,
        };
        if self.added.insert(object) {
            self.size += 1;
            !was_indexed
        } else {
            false
        }
    }

    /// Remove `object`. Returns `false` if it was not indexed.
    ///
    /// An object with a valid tree node is invalidated and forgotten. An
    /// object whose tree node was invalidated by [`add`](Self::add) stays
    /// in the overlay and `false` is returned, so `add` followed by
    /// `remove` leaves [`size`](Self::size) unchanged. Only objects that
    /// never had a tree node are removed from the overlay.
    pub fn remove(&mut self, object: Handle) -> bool {
        match self.node_map.get(&object) {
            Some(&node) => {
                if !self.invalidate(object, node) {
                    return false;
                }
                self.node_map.swap_remove(&object);
                true
            }
            None => {
                if !self.added.swap_remove(&object) {
                    return false;
                }
                self.size -= 1;
                self.retired += 1;
                true
            }
        }
    }

    /// Number of indexed objects.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Dimensionality of indexed positions.
    pub fn num_dimensions(&self) -> usize {
        self.tree.num_dimensions()
    }

    /// Staleness of the index: invalidated tree nodes plus overlay
    /// insertions, including ones removed since. Never decreases until
    /// the index is rebuilt.
    pub fn mod_count(&self) -> usize {
        self.invalid + self.added.len() + self.retired
    }

    /// Whether `object` is indexed.
    pub fn contains(&self, object: Handle) -> bool {
        let in_tree = self
            .node_map
            .get(&object)
            .is_some_and(|&node| self.tree.is_valid(node));
        in_tree || self.added.contains(&object)
    }

    /// Indexed objects: those with a valid tree node, then the overlay.
    pub fn iter(&self) -> impl Iterator<Item = Handle> + '_ {
        self.node_map
            .iter()
            .filter(|(_, node)| self.tree.is_valid(**node))
            .map(|(&object, _)| object)
            .chain(self.added.iter().copied())
    }

    /// The tree snapshot.
    pub fn tree(&self) -> &KdTree {
        &self.tree
    }

    /// Number of objects in the overlay.
    pub fn added_len(&self) -> usize {
        self.added.len()
    }

    /// A nearest-neighbour search reading positions from `positions`.
    pub fn nearest_neighbor_search<'a, P>(
        &'a self,
        positions: &'a P,
    ) -> Result<IndexNearestNeighborSearch<'a, P>, SpatialError>
    where
        P: ObjectPositions + ?Sized,
    {
        self.check_dimensions(positions)?;
        Ok(IndexNearestNeighborSearch::new(
            &self.tree,
            &self.added,
            positions,
        ))
    }

    /// A convex-polytope clip reading positions from `positions`.
    pub fn clip_convex_polytope<'a, P>(
        &'a self,
        positions: &'a P,
    ) -> Result<IndexClip<'a, P>, SpatialError>
    where
        P: ObjectPositions + ?Sized,
    {
        self.check_dimensions(positions)?;
        Ok(IndexClip::new(&self.tree, &self.added, positions))
    }

    /// Invalidate `node`, the tree node of `object`, unless it already is.
    fn invalidate(&mut self, object: Handle, node: NodeId) -> bool {
        if !self.tree.is_valid(node) {
            return false;
        }
        self.tree.set_valid(node, false);
        self.invalid += 1;
        self.size -= 1;
        tracing::trace!(object = %object, node = node.0, "tree node invalidated");
        true
    }

    fn check_dimensions<P>(&self, positions: &P) -> Result<(), SpatialError>
    where
        P: ObjectPositions + ?Sized,
    {
        let expected = self.num_dimensions();
        let found = positions.num_dimensions();
        if expected == found {
            Ok(())
        } else {
            Err(SpatialError::DimensionMismatch { expected, found })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineage_test_utils::PointCloud;

    fn indexed(count: usize) -> (PointCloud, SpatialIndex) {
        let cloud = PointCloud::uniform(count, 3, 5.0, 9);
        let index =
            SpatialIndex::build(cloud.handles.iter().copied(), &cloud.positions()).unwrap();
        (cloud, index)
    }

    #[test]
    fn build_indexes_every_object() {
        let (cloud, index) = indexed(50);
        assert_eq!(index.size(), 50);
        assert_eq!(index.mod_count(), 0);
        assert!(cloud.handles.iter().all(|&h| index.contains(h)));
        assert_eq!(index.iter().count(), 50);
    }

    #[test]
    fn adding_an_indexed_object_moves_it_to_the_overlay() {
        let (cloud, mut index) = indexed(10);
        let h = cloud.handles[3];
        assert!(!index.add(h));
        assert_eq!(index.size(), 10);
        assert_eq!(index.added_len(), 1);
        assert_eq!(index.mod_count(), 2);
        assert!(index.contains(h));

        // Adding again changes nothing.
        assert!(!index.add(h));
        assert_eq!(index.mod_count(), 2);
    }

    #[test]
    fn remove_covers_tree_and_overlay() {
        let (mut cloud, mut index) = indexed(10);
        let fresh = cloud.insert(&[0.0, 0.0, 0.0]);
        assert!(index.add(fresh));
        assert_eq!(index.size(), 11);

        assert!(index.remove(cloud.handles[0]));
        assert!(index.remove(fresh));
        assert_eq!(index.size(), 9);
        assert!(!index.remove(fresh));
        assert!(!index.contains(fresh));
        assert_eq!(index.iter().count(), 9);
    }

    #[test]
    fn removing_a_moved_object_keeps_it_in_the_overlay() {
        let (cloud, mut index) = indexed(10);
        let h = cloud.handles[4];
        assert!(!index.add(h));
        assert!(!index.remove(h));
        assert_eq!(index.size(), 10);
        assert_eq!(index.added_len(), 1);
        assert!(index.contains(h));
        assert_eq!(index.iter().filter(|&o| o == h).count(), 1);
        // Further moves and removes are no-ops.
        assert!(!index.add(h));
        assert!(!index.remove(h));
        assert_eq!(index.size(), 10);
        assert_eq!(index.mod_count(), 2);
    }

    #[test]
    fn removing_an_unmoved_object_forgets_it() {
        let (cloud, mut index) = indexed(10);
        let h = cloud.handles[4];
        assert!(index.remove(h));
        assert!(!index.contains(h));
        assert!(!index.remove(h));
        // Re-adding puts it in the overlay.
        assert!(index.add(h));
        assert_eq!(index.size(), 10);
        assert!(index.remove(h));
        assert_eq!(index.size(), 9);
    }

    #[test]
    fn rebuild_resets_staleness_and_drops_dead_objects() {
        let (mut cloud, mut index) = indexed(20);
        let fresh = cloud.insert(&[1.0, 1.0, 1.0]);
        index.add(fresh);
        index.add(cloud.handles[1]);
        let dead = cloud.handles[2];
        cloud.remove(dead);

        let rebuilt = index.rebuild(&cloud.positions()).unwrap();
        assert_eq!(rebuilt.mod_count(), 0);
        assert_eq!(rebuilt.size(), 20);
        assert_eq!(rebuilt.added_len(), 0);
        assert!(rebuilt.contains(fresh));
        assert!(!rebuilt.contains(dead));
    }

    #[test]
    fn empty_index_accepts_additions() {
        let cloud = PointCloud::uniform(3, 2, 1.0, 1);
        let mut index = SpatialIndex::empty(&cloud.positions()).unwrap();
        assert!(index.is_empty());
        for &h in &cloud.handles {
            assert!(index.add(h));
        }
        assert_eq!(index.size(), 3);
        assert_eq!(index.mod_count(), 3);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Clone, Debug)]
        enum Op {
            Add(usize),
            Remove(usize),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0..40usize).prop_map(Op::Add),
                (0..40usize).prop_map(Op::Remove),
            ]
        }

        proptest! {
            #[test]
            fn mod_count_never_decreases(ops in prop::collection::vec(op(), 0..100)) {
                // 30 built objects, 10 more that start unindexed.
                let mut cloud = PointCloud::uniform(30, 2, 1.0, 4);
                let index_handles: Vec<Handle> = cloud.handles.clone();
                let mut index = SpatialIndex::build(index_handles, &cloud.positions()).unwrap();
                for _ in 0..10 {
                    let _ = cloud.insert(&[0.5, 0.5]);
                }

                let mut last = index.mod_count();
                for op in ops {
                    match op {
                        Op::Add(i) => { index.add(cloud.handles[i]); }
                        Op::Remove(i) => { index.remove(cloud.handles[i]); }
                    }
                    prop_assert!(index.mod_count() >= last);
                    last = index.mod_count();
                    prop_assert_eq!(index.iter().count(), index.size());
                }
            }

            #[test]
            fn add_then_remove_of_an_indexed_object_keeps_size(i in 0..30usize) {
                let cloud = PointCloud::uniform(30, 2, 1.0, 6);
                let mut index =
                    SpatialIndex::build(cloud.handles.iter().copied(), &cloud.positions())
                        .unwrap();
                let before = index.size();
                let h = cloud.handles[i];
                index.add(h);
                index.remove(h);
                prop_assert_eq!(index.size(), before);
                prop_assert!(index.contains(h));
                prop_assert_eq!(index.iter().count(), before);
            }
        }
    }
}
