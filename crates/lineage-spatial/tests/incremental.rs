//! Incremental index consistency against brute-force scans.

use std::collections::HashSet;

use lineage_core::{ClipConvexPolytope, Handle, NearestNeighborSearch, ObjectPositions};
use lineage_spatial::{RebuildPolicy, SpatialIndex};
use lineage_test_utils::{
    brute_force_clip, brute_force_nearest, random_point, random_polytope, random_queries, rng,
    PointCloud,
};

fn build(cloud: &PointCloud) -> SpatialIndex {
    SpatialIndex::build(cloud.handles.iter().copied(), &cloud.positions()).unwrap()
}

/// Churn the cloud: move, add, delete (with and without telling the
/// index) and remove objects.
fn churn(cloud: &mut PointCloud, index: &mut SpatialIndex, seed: u64) {
    let mut rng = rng(seed);
    for i in 0..300 {
        let h = cloud.handles[(i * 7) % cloud.handles.len()];
        let p = random_point(&mut rng, cloud.dims(), cloud.extent());
        cloud.move_to(h, &p);
        index.add(h);
    }
    for _ in 0..200 {
        let p = random_point(&mut rng, cloud.dims(), cloud.extent());
        let h = cloud.insert(&p);
        index.add(h);
    }
    for i in 0..100 {
        let h = cloud.handles[(i * 13) % cloud.handles.len()];
        if i % 2 == 0 {
            index.remove(h);
        }
        cloud.remove(h);
    }
}

#[test]
fn add_then_remove_keeps_size_for_indexed_objects() {
    let cloud = PointCloud::uniform(10_000, 3, 5.0, 41);
    let mut index = build(&cloud);
    for &o in cloud.handles.iter().step_by(97) {
        let before = index.size();
        index.add(o);
        index.remove(o);
        assert_eq!(index.size(), before);
        assert!(index.contains(o));
    }
    assert_eq!(index.size(), 10_000);
    assert_eq!(index.iter().count(), 10_000);

    // Moved objects are still found by queries.
    let positions = cloud.positions();
    let mut search = index.nearest_neighbor_search(&positions).unwrap();
    let target = cloud.handles[42 * 97];
    let mut p = vec![0.0; 3];
    positions.localize(target, &mut p);
    let found = search.search(&p).unwrap().unwrap();
    assert_eq!(found.square_distance, 0.0);
}

#[test]
fn nearest_matches_brute_force_after_churn() {
    let mut cloud = PointCloud::uniform(3_000, 3, 5.0, 51);
    let mut index = build(&cloud);
    churn(&mut cloud, &mut index, 52);

    let positions = cloud.positions();
    let mut search = index.nearest_neighbor_search(&positions).unwrap();
    for query in random_queries(100, 3, 5.0, 53) {
        let found = search.search(&query).unwrap().unwrap();
        let expected =
            brute_force_nearest(&positions, cloud.handles.iter().copied(), &query).unwrap();
        assert_eq!(found.object, expected.object);
        assert_eq!(found.square_distance, expected.square_distance);
    }
}

#[test]
fn clip_partitions_all_live_objects_after_churn() {
    let mut cloud = PointCloud::uniform(3_000, 3, 5.0, 61);
    let mut index = build(&cloud);
    churn(&mut cloud, &mut index, 62);

    let positions = cloud.positions();
    let mut clip = index.clip_convex_polytope(&positions).unwrap();
    let mut rng = rng(63);
    for _ in 0..10 {
        let polytope = random_polytope(&mut rng, 3, 5, 5.0);
        clip.clip(&polytope).unwrap();
        let inside: Vec<Handle> = clip.inside_values().collect();
        let outside: Vec<Handle> = clip.outside_values().collect();
        assert_eq!(inside.len() + outside.len(), cloud.handles.len());

        let inside: HashSet<Handle> = inside.into_iter().collect();
        let outside: HashSet<Handle> = outside.into_iter().collect();
        let (expected_in, expected_out) =
            brute_force_clip(&positions, cloud.handles.iter().copied(), &polytope);
        assert_eq!(inside, expected_in);
        assert_eq!(outside, expected_out);
    }
}

#[test]
fn policy_driven_rebuild_keeps_contents() {
    let mut cloud = PointCloud::uniform(2_000, 3, 5.0, 71);
    let mut index = build(&cloud);
    let policy = RebuildPolicy {
        min_mod_count: 500,
        ..RebuildPolicy::default()
    };
    assert!(policy.validate().is_ok());
    assert!(!policy.should_rebuild(&index));

    churn(&mut cloud, &mut index, 72);
    // 300 moves and 200 additions, plus tree-side removals.
    assert!(index.mod_count() >= 800);
    assert!(policy.should_rebuild(&index));

    let rebuilt = index.rebuild(&cloud.positions()).unwrap();
    assert_eq!(rebuilt.mod_count(), 0);
    assert_eq!(rebuilt.size(), cloud.handles.len());
    let expected: HashSet<Handle> = cloud.handles.iter().copied().collect();
    let actual: HashSet<Handle> = rebuilt.iter().collect();
    assert_eq!(actual, expected);
}
