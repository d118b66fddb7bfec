//! Record layout of a KD-tree node.

use lineage_pool::{Field, PositionLayout, Primitive};

/// Byte layout of a node record for an `n`-dimensional tree.
///
/// ```text
/// f64 × n   position (copied from the object at build time)
/// i32       left child node (-1 = none)
/// i32       right child node (-1 = none)
/// u32       object slot
/// u32       object generation
/// bool      valid
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeLayout {
    dims: usize,
}

impl NodeLayout {
    /// Layout for nodes of an `dims`-dimensional tree.
    pub const fn new(dims: usize) -> Self {
        Self { dims }
    }

    /// Number of coordinates per node.
    pub const fn num_dimensions(&self) -> usize {
        self.dims
    }

    /// The copied object position.
    pub const fn position(&self) -> PositionLayout {
        PositionLayout::new(0, self.dims)
    }

    /// Left child link.
    pub const fn left(&self) -> Field<i32> {
        Field::new(self.position().end())
    }

    /// Right child link.
    pub const fn right(&self) -> Field<i32> {
        Field::new(self.left().end())
    }

    /// Slot of the indexed object.
    pub const fn object_slot(&self) -> Field<u32> {
        Field::new(self.right().end())
    }

    /// Generation of the indexed object at build time.
    pub const fn object_generation(&self) -> Field<u32> {
        Field::new(self.object_slot().end())
    }

    /// Soft-deletion flag.
    pub const fn valid(&self) -> Field<bool> {
        Field::new(self.object_generation().end())
    }

    /// Size of one node record in bytes.
    pub const fn size_in_bytes(&self) -> usize {
        self.valid().offset() + bool::SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_dimensional_layout() {
        let layout = NodeLayout::new(3);
        assert_eq!(layout.left().offset(), 24);
        assert_eq!(layout.right().offset(), 28);
        assert_eq!(layout.object_slot().offset(), 32);
        assert_eq!(layout.object_generation().offset(), 36);
        assert_eq!(layout.valid().offset(), 40);
        assert_eq!(layout.size_in_bytes(), 41);
    }
}
