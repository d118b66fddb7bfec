//! Pool-backed object positions for spatial indexing.

use lineage_core::{Handle, ObjectPositions};

use crate::layout::PositionLayout;
use crate::pool::Pool;

/// Exposes the position embedded in each record of a [`Pool`].
#[derive(Clone, Copy)]
pub struct PoolPositions<'p> {
    pool: &'p Pool,
    layout: PositionLayout,
}

impl<'p> PoolPositions<'p> {
    /// View `pool` as a position source, reading coordinates at `layout`.
    pub fn new(pool: &'p Pool, layout: PositionLayout) -> Self {
        Self { pool, layout }
    }

    /// The pool being viewed.
    pub fn pool(&self) -> &'p Pool {
        self.pool
    }
}

impl ObjectPositions for PoolPositions<'_> {
    fn num_dimensions(&self) -> usize {
        self.layout.num_dimensions()
    }

    fn is_live(&self, object: Handle) -> bool {
        self.pool.is_live(object)
    }

    fn position(&self, object: Handle, d: usize) -> f64 {
        self.pool.read_unchecked(object.slot(), self.layout.coordinate(d))
    }
}
