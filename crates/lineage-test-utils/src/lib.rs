//! Seeded point clouds and brute-force oracles for lineage development.
//!
//! [`PointCloud`] fills a [`Pool`] with uniformly random positions from a
//! deterministic [`ChaCha8Rng`]. The oracle functions answer the same
//! queries as the spatial structures by linear scan, for comparison in
//! tests and benchmarks.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::collections::HashSet;

use lineage_core::{ConvexPolytope, Handle, HyperPlane, Neighbor, ObjectPositions, Point};
use lineage_pool::{Pool, PoolConfig, PoolPositions, PositionLayout};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Deterministic RNG for a test seed.
pub fn rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// A pool of random points with their handles.
///
/// Records hold only the position, laid out as `dims` consecutive `f64`s
/// from offset 0.
pub struct PointCloud {
    pub pool: Pool,
    pub layout: PositionLayout,
    pub handles: Vec<Handle>,
    extent: f64,
}

impl PointCloud {
    /// `count` points uniform in `[-extent, extent]^dims`.
    pub fn uniform(count: usize, dims: usize, extent: f64, seed: u64) -> Self {
        let layout = PositionLayout::new(0, dims);
        let config = PoolConfig::new(count as u32);
        let pool = Pool::new(layout.end(), &config).expect("valid point pool config");
        let mut cloud = Self {
            pool,
            layout,
            handles: Vec::with_capacity(count),
            extent,
        };
        let mut rng = rng(seed);
        for _ in 0..count {
            let p = random_point(&mut rng, dims, extent);
            let _ = cloud.insert(&p);
        }
        cloud
    }

    /// Add one point and return its handle.
    pub fn insert(&mut self, point: &[f64]) -> Handle {
        let h = self.pool.create_handle().expect("pool has room");
        self.move_to(h, point);
        self.handles.push(h);
        h
    }

    /// Overwrite a point's position.
    pub fn move_to(&mut self, h: Handle, point: &[f64]) {
        for (d, &x) in point.iter().enumerate() {
            self.pool
                .write(h, self.layout.coordinate(d), x)
                .expect("live point");
        }
    }

    /// Delete a point from the pool and the handle list.
    pub fn remove(&mut self, h: Handle) {
        self.pool.delete_handle(h).expect("live point");
        self.handles.retain(|&x| x != h);
    }

    pub fn dims(&self) -> usize {
        self.layout.num_dimensions()
    }

    pub fn extent(&self) -> f64 {
        self.extent
    }

    pub fn positions(&self) -> PoolPositions<'_> {
        PoolPositions::new(&self.pool, self.layout)
    }
}

/// A point uniform in `[-extent, extent]^dims`.
pub fn random_point<R: Rng>(rng: &mut R, dims: usize, extent: f64) -> Point {
    (0..dims).map(|_| rng.random_range(-extent..extent)).collect()
}

/// `count` query points uniform in `[-extent, extent]^dims`.
pub fn random_queries(count: usize, dims: usize, extent: f64, seed: u64) -> Vec<Point> {
    let mut rng = rng(seed);
    (0..count).map(|_| random_point(&mut rng, dims, extent)).collect()
}

/// `amount` distinct indices drawn from `0..count`.
pub fn random_subset(count: usize, amount: usize, seed: u64) -> HashSet<usize> {
    let mut rng = rng(seed);
    rand::seq::index::sample(&mut rng, count, amount)
        .into_iter()
        .collect()
}

/// A random unit normal in `dims` dimensions.
pub fn random_normal<R: Rng>(rng: &mut R, dims: usize) -> Point {
    loop {
        let v: Point = (0..dims).map(|_| rng.random_range(-1.0..1.0)).collect();
        let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 1e-3 {
            return v.iter().map(|x| x / norm).collect();
        }
    }
}

/// A polytope of `planes` random half-spaces, each passing within
/// `extent / 2` of the origin and facing it.
pub fn random_polytope<R: Rng>(
    rng: &mut R,
    dims: usize,
    planes: usize,
    extent: f64,
) -> ConvexPolytope {
    let planes = (0..planes)
        .map(|_| {
            let normal = random_normal(rng, dims);
            let offset = -rng.random_range(0.0..extent / 2.0);
            HyperPlane::new(&normal, offset)
        })
        .collect();
    ConvexPolytope::new(planes).expect("planes share a dimension")
}

/// Linear-scan nearest neighbour among `objects`, skipping non-live ones.
///
/// Ties keep the first object in iteration order.
pub fn brute_force_nearest<P, I>(positions: &P, objects: I, query: &[f64]) -> Option<Neighbor>
where
    P: ObjectPositions + ?Sized,
    I: IntoIterator<Item = Handle>,
{
    let mut best: Option<Neighbor> = None;
    for h in objects {
        if !positions.is_live(h) {
            continue;
        }
        let square_distance = square_distance(positions, h, query);
        if best.as_ref().is_none_or(|b| square_distance < b.square_distance) {
            best = Some(Neighbor {
                object: h,
                square_distance,
            });
        }
    }
    best
}

/// Squared distance from an object's position to `query`.
pub fn square_distance<P>(positions: &P, h: Handle, query: &[f64]) -> f64
where
    P: ObjectPositions + ?Sized,
{
    query
        .iter()
        .enumerate()
        .map(|(d, &x)| {
            let diff = positions.position(h, d) - x;
            diff * diff
        })
        .sum()
}

/// Linear-scan clip: the live objects inside and outside `polytope`.
pub fn brute_force_clip<P, I>(
    positions: &P,
    objects: I,
    polytope: &ConvexPolytope,
) -> (HashSet<Handle>, HashSet<Handle>)
where
    P: ObjectPositions + ?Sized,
    I: IntoIterator<Item = Handle>,
{
    let mut inside = HashSet::new();
    let mut outside = HashSet::new();
    let mut p: Point = Point::from_elem(0.0, positions.num_dimensions());
    for h in objects {
        if !positions.is_live(h) {
            continue;
        }
        positions.localize(h, &mut p);
        if polytope.contains(&p) {
            inside.insert(h);
        } else {
            outside.insert(h);
        }
    }
    (inside, outside)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subsets_are_distinct_and_seeded() {
        let a = random_subset(1000, 100, 3);
        assert_eq!(a.len(), 100);
        assert!(a.iter().all(|&i| i < 1000));
        assert_eq!(a, random_subset(1000, 100, 3));
    }

    #[test]
    fn clouds_are_deterministic() {
        let a = PointCloud::uniform(50, 3, 5.0, 7);
        let b = PointCloud::uniform(50, 3, 5.0, 7);
        let pa = a.positions();
        let pb = b.positions();
        for (&ha, &hb) in a.handles.iter().zip(&b.handles) {
            for d in 0..3 {
                assert_eq!(pa.position(ha, d), pb.position(hb, d));
                assert!(pa.position(ha, d).abs() <= 5.0);
            }
        }
    }

    #[test]
    fn brute_force_nearest_skips_removed_points() {
        let mut cloud = PointCloud::uniform(0, 2, 1.0, 0);
        let near = cloud.insert(&[0.1, 0.0]);
        let far = cloud.insert(&[0.5, 0.5]);
        let handles = cloud.handles.clone();
        let found =
            brute_force_nearest(&cloud.positions(), handles.iter().copied(), &[0.0, 0.0]).unwrap();
        assert_eq!(found.object, near);
        cloud.remove(near);
        let found = brute_force_nearest(&cloud.positions(), handles, &[0.0, 0.0]).unwrap();
        assert_eq!(found.object, far);
    }

    #[test]
    fn random_polytope_contains_origin() {
        let mut rng = rng(3);
        for _ in 0..20 {
            let polytope = random_polytope(&mut rng, 3, 4, 5.0);
            assert!(polytope.contains(&[0.0, 0.0, 0.0]));
        }
    }
}
