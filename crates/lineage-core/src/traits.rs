//! Core abstraction traits for pooled access and spatial queries.

use crate::error::{PoolError, SpatialError};
use crate::geometry::ConvexPolytope;
use crate::id::{Handle, SlotId};

/// The flyweight proxy contract shared by every pooled type.
///
/// A pool hands out reusable proxy objects (`Ref`) that can be rebound to
/// any live slot without allocating. Proxies are borrowed from and
/// returned to a recycling queue; `create_ref` and `release_ref` take
/// `&self` so several readers can borrow proxies while no structural
/// mutation is in flight.
pub trait RefPool {
    /// The proxy type handed out by this pool.
    type Ref;

    /// Obtain an unbound proxy, reusing a released one when available.
    fn create_ref(&self) -> Self::Ref;

    /// Return a proxy to the recycling queue. The proxy is unbound first.
    fn release_ref(&self, r: Self::Ref);

    /// Rebind `r` to the record in `slot`.
    ///
    /// Fails if the slot is out of range or not live.
    fn get_object<'r>(
        &self,
        slot: SlotId,
        r: &'r mut Self::Ref,
    ) -> Result<&'r mut Self::Ref, PoolError>;

    /// The slot currently bound to `r`.
    ///
    /// Fails with [`PoolError::InvalidState`] for an unbound proxy and
    /// [`PoolError::StaleHandle`] if the record was deleted since binding.
    fn get_id(&self, r: &Self::Ref) -> Result<SlotId, PoolError>;
}

/// Read access to the positions of indexed objects.
///
/// This is the only interface the spatial layer consumes from the object
/// pool. Objects are named by generation-checked [`Handle`]s so the index
/// can recognise objects that were deleted behind its back.
pub trait ObjectPositions {
    /// Dimensionality of every position.
    fn num_dimensions(&self) -> usize;

    /// Whether `object` still refers to a live record.
    fn is_live(&self, object: Handle) -> bool;

    /// Coordinate `d` of a live object's position.
    ///
    /// Callers must check [`is_live`](Self::is_live) first; the result for
    /// a dead object is whatever the slot currently holds.
    fn position(&self, object: Handle, d: usize) -> f64;

    /// Copy a live object's position into `out`.
    fn localize(&self, object: Handle, out: &mut [f64]) {
        for (d, x) in out.iter_mut().enumerate() {
            *x = self.position(object, d);
        }
    }
}

impl<T: ObjectPositions + ?Sized> ObjectPositions for &T {
    fn num_dimensions(&self) -> usize {
        (**self).num_dimensions()
    }

    fn is_live(&self, object: Handle) -> bool {
        (**self).is_live(object)
    }

    fn position(&self, object: Handle, d: usize) -> f64 {
        (**self).position(object, d)
    }
}

/// The result of a nearest-neighbour query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbor {
    /// The nearest object.
    pub object: Handle,
    /// Squared Euclidean distance from the query point.
    pub square_distance: f64,
}

impl Neighbor {
    /// Euclidean distance from the query point.
    pub fn distance(&self) -> f64 {
        self.square_distance.sqrt()
    }
}

/// A reusable nearest-neighbour query object.
pub trait NearestNeighborSearch {
    /// Dimensionality of query points.
    fn num_dimensions(&self) -> usize;

    /// Find the object nearest to `point`.
    ///
    /// Returns `Ok(None)` when nothing is indexed, and
    /// [`SpatialError::DimensionMismatch`] if `point` has the wrong length.
    fn search(&mut self, point: &[f64]) -> Result<Option<Neighbor>, SpatialError>;

    /// The result of the most recent [`search`](Self::search).
    fn nearest(&self) -> Option<Neighbor>;
}

/// A reusable convex-region range query.
///
/// After [`clip`](Self::clip), every indexed object appears in exactly one
/// of [`inside_values`](Self::inside_values) and
/// [`outside_values`](Self::outside_values).
pub trait ClipConvexPolytope {
    /// Lazy iterator over the objects of one side of the partition.
    type Values<'a>: Iterator<Item = Handle>
    where
        Self: 'a;

    /// Dimensionality of the polytope's half-spaces.
    fn num_dimensions(&self) -> usize;

    /// Partition all indexed objects by `polytope`.
    fn clip(&mut self, polytope: &ConvexPolytope) -> Result<(), SpatialError>;

    /// Objects inside every half-space of the last clipped polytope.
    fn inside_values(&self) -> Self::Values<'_>;

    /// Objects outside at least one half-space of the last clipped polytope.
    fn outside_values(&self) -> Self::Values<'_>;
}
