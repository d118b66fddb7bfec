//! Criterion micro-benchmarks for KD-tree build and queries.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use lineage_core::{ClipConvexPolytope, NearestNeighborSearch, NodeId};
use lineage_kdtree::{ClipConvexPolytopeKdTree, KdTree, NearestNeighborSearchOnKdTree};
use lineage_test_utils::{random_polytope, random_queries, rng, PointCloud};

/// Benchmark: build a tree over 100K points in [-5, 5]^3.
fn bench_kdtree_build_100k(c: &mut Criterion) {
    let cloud = PointCloud::uniform(100_000, 3, 5.0, 1);
    let positions = cloud.positions();
    c.bench_function("kdtree_build_100k", |b| {
        b.iter(|| {
            let tree = KdTree::build(cloud.handles.iter().copied(), &positions).unwrap();
            black_box(tree.len());
        });
    });
}

/// Benchmark: 1K exact and valid-only nearest-neighbour queries.
fn bench_kdtree_nearest(c: &mut Criterion) {
    let cloud = PointCloud::uniform(100_000, 3, 5.0, 2);
    let positions = cloud.positions();
    let mut tree = KdTree::build(cloud.handles.iter().copied(), &positions).unwrap();
    let queries = random_queries(1_000, 3, 5.0, 3);

    c.bench_function("kdtree_nearest_1k", |b| {
        let mut search = NearestNeighborSearchOnKdTree::new(&tree);
        b.iter(|| {
            for q in &queries {
                black_box(search.search(q).unwrap());
            }
        });
    });

    for node in (0..tree.len() as u32).step_by(10).map(NodeId) {
        tree.set_valid(node, false);
    }
    c.bench_function("kdtree_valid_nearest_1k", |b| {
        let mut search = NearestNeighborSearchOnKdTree::valid_only(&tree);
        b.iter(|| {
            for q in &queries {
                black_box(search.search(q).unwrap());
            }
        });
    });
}

/// Benchmark: clip 100K points by a random 6-plane polytope.
fn bench_kdtree_clip(c: &mut Criterion) {
    let cloud = PointCloud::uniform(100_000, 3, 5.0, 4);
    let positions = cloud.positions();
    let tree = KdTree::build(cloud.handles.iter().copied(), &positions).unwrap();
    let polytope = random_polytope(&mut rng(5), 3, 6, 5.0);
    let mut clip = ClipConvexPolytopeKdTree::new(&tree);
    c.bench_function("kdtree_clip_100k", |b| {
        b.iter(|| {
            clip.clip(&polytope).unwrap();
            black_box(clip.inside_values().count());
        });
    });
}

criterion_group!(
    benches,
    bench_kdtree_build_100k,
    bench_kdtree_nearest,
    bench_kdtree_clip
);
criterion_main!(benches);
