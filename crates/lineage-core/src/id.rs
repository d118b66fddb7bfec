//! Strongly-typed identifiers and the [`Point`] type alias.

use smallvec::SmallVec;
use std::fmt;

/// Index of a record slot within a pool.
///
/// A slot index is the sole stable identity of a record: it is assigned
/// on creation and stays the same until the record is deleted. Pools never
/// compact, so deleting one record never moves another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub u32);

impl SlotId {
    /// The slot index as a `usize`, for indexing into storage.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Encode an optional slot as the `i32` link stored inside records,
    /// where `-1` means "none".
    pub fn to_link(slot: Option<SlotId>) -> i32 {
        match slot {
            Some(s) => s.0 as i32,
            None => -1,
        }
    }

    /// Decode an `i32` record link; negative values mean "none".
    pub fn from_link(link: i32) -> Option<SlotId> {
        if link < 0 {
            None
        } else {
            Some(SlotId(link as u32))
        }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SlotId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// A generation-checked reference to a pooled record.
///
/// Every slot carries a generation counter that is bumped when the slot is
/// freed. A handle captures the generation at the time it was issued, so a
/// handle that outlives its record is detected in O(1) instead of silently
/// aliasing whatever record reuses the slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[must_use]
pub struct Handle {
    slot: SlotId,
    generation: u32,
}

impl Handle {
    /// Create a handle for `slot` at `generation`.
    pub fn new(slot: SlotId, generation: u32) -> Self {
        Self { slot, generation }
    }

    /// The slot this handle points at.
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// The slot generation this handle was issued for.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.slot, self.generation)
    }
}

/// Index of a node within a KD-tree's node pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The node index as a `usize`.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// A position in n-dimensional space.
///
/// Uses `SmallVec<[f64; 4]>` so points of up to four dimensions (the usual
/// 2D/3D plus time) stay on the stack. Higher-dimensional points spill to
/// the heap transparently.
pub type Point = SmallVec<[f64; 4]>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_encoding_round_trips() {
        assert_eq!(SlotId::to_link(None), -1);
        assert_eq!(SlotId::to_link(Some(SlotId(7))), 7);
        assert_eq!(SlotId::from_link(-1), None);
        assert_eq!(SlotId::from_link(7), Some(SlotId(7)));
    }

    #[test]
    fn handles_with_different_generations_differ() {
        let a = Handle::new(SlotId(3), 0);
        let b = Handle::new(SlotId(3), 1);
        assert_ne!(a, b);
        assert_eq!(a.slot(), b.slot());
    }

    #[test]
    fn handle_display_shows_slot_and_generation() {
        let h = Handle::new(SlotId(12), 4);
        assert_eq!(h.to_string(), "12@4");
    }
}
