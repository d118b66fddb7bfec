//! Slot allocator over a [`StorageArray`].
//!
//! [`MemPool`] hands out record slots, tracks which are live, and reuses
//! freed slots in LIFO order. Slot indices are stable for a record's whole
//! lifetime; there is no compaction. Every slot carries a generation that
//! is bumped when the slot is freed, so a [`Handle`] taken before a delete
//! can be recognised as stale afterwards.

use lineage_core::{Handle, PoolError, SlotId};

use crate::config::PoolConfig;
use crate::layout::{Field, Primitive};
use crate::storage::StorageArray;

#[derive(Clone, Copy, Debug)]
struct SlotState {
    generation: u32,
    live: bool,
}

/// A free-list slot allocator over fixed-width records.
pub struct MemPool {
    storage: StorageArray,
    /// Per-slot liveness and generation, one entry per slot ever allocated.
    slots: Vec<SlotState>,
    /// Freed slot indices; the most recently freed is reused first.
    free_list: Vec<u32>,
    live: usize,
}

impl MemPool {
    /// Create an empty pool of `record_size`-byte records.
    pub fn new(record_size: usize, config: &PoolConfig) -> Result<Self, PoolError> {
        config.validate()?;
        Ok(Self {
            storage: StorageArray::new(
                record_size,
                config.initial_capacity as usize,
                config.max_capacity as usize,
            )?,
            slots: Vec::new(),
            free_list: Vec::new(),
            live: 0,
        })
    }

    /// Allocate a slot, zeroing its record.
    ///
    /// Reuses the most recently freed slot if there is one, otherwise
    /// appends a new slot, growing storage if needed.
    pub fn create(&mut self) -> Result<SlotId, PoolError> {
        let index = if let Some(index) = self.free_list.pop() {
            self.slots[index as usize].live = true;
            index as usize
        } else {
            let index = self.slots.len();
            self.storage.ensure_capacity(index + 1)?;
            self.slots.push(SlotState {
                generation: 0,
                live: true,
            });
            index
        };
        self.storage.zero(index);
        self.live += 1;
        Ok(SlotId(index as u32))
    }

    /// Free a live slot, bumping its generation.
    pub fn free(&mut self, slot: SlotId) -> Result<(), PoolError> {
        self.check_live(slot)?;
        let state = &mut self.slots[slot.index()];
        state.live = false;
        state.generation = state.generation.wrapping_add(1);
        self.free_list.push(slot.0);
        self.live -= 1;
        Ok(())
    }

    /// Whether `slot` holds a live record.
    pub fn is_live(&self, slot: SlotId) -> bool {
        self.slots.get(slot.index()).is_some_and(|s| s.live)
    }

    /// Whether `handle` names the record currently in its slot.
    pub fn is_current(&self, handle: Handle) -> bool {
        self.slots
            .get(handle.slot().index())
            .is_some_and(|s| s.live && s.generation == handle.generation())
    }

    /// Current generation of `slot`, or `None` if it was never allocated.
    pub fn generation(&self, slot: SlotId) -> Option<u32> {
        self.slots.get(slot.index()).map(|s| s.generation)
    }

    /// Fail unless `slot` is in range and live.
    pub fn check_live(&self, slot: SlotId) -> Result<(), PoolError> {
        match self.slots.get(slot.index()) {
            None => Err(PoolError::SlotOutOfRange {
                slot,
                len: self.slots.len(),
            }),
            Some(s) if !s.live => Err(PoolError::InvalidState {
                reason: "slot is not live",
            }),
            Some(_) => Ok(()),
        }
    }

    /// Resolve a handle to its slot, rejecting stale handles.
    pub fn check(&self, handle: Handle) -> Result<SlotId, PoolError> {
        let slot = handle.slot();
        let state = self.slots.get(slot.index()).ok_or(PoolError::SlotOutOfRange {
            slot,
            len: self.slots.len(),
        })?;
        if state.generation != handle.generation() || !state.live {
            return Err(PoolError::StaleHandle {
                slot,
                handle_generation: handle.generation(),
                current_generation: state.generation,
            });
        }
        Ok(slot)
    }

    /// A handle to the live record in `slot`.
    pub fn handle(&self, slot: SlotId) -> Result<Handle, PoolError> {
        self.check_live(slot)?;
        Ok(Handle::new(slot, self.slots[slot.index()].generation))
    }

    /// Read a field without liveness checks.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is beyond the storage capacity.
    pub fn get<T: Primitive>(&self, slot: SlotId, field: Field<T>) -> T {
        self.storage.get(slot.index(), field)
    }

    /// Write a field without liveness checks.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is beyond the storage capacity.
    pub fn put<T: Primitive>(&mut self, slot: SlotId, field: Field<T>, value: T) {
        self.storage.put(slot.index(), field, value);
    }

    /// Exchange the record contents of two live slots.
    ///
    /// Slot identities and generations stay put; handles to `a` afterwards
    /// read what used to be in `b` and vice versa.
    pub fn swap(&mut self, a: SlotId, b: SlotId) -> Result<(), PoolError> {
        self.check_live(a)?;
        self.check_live(b)?;
        self.storage.swap(a.index(), b.index());
        Ok(())
    }

    /// Free every live slot.
    ///
    /// Storage is retained. Subsequent allocations reuse slots from index
    /// 0 upward.
    pub fn clear(&mut self) {
        for state in self.slots.iter_mut().filter(|s| s.live) {
            state.live = false;
            state.generation = state.generation.wrapping_add(1);
        }
        self.free_list.clear();
        self.free_list.extend((0..self.slots.len() as u32).rev());
        self.live = 0;
    }

    /// Iterate over handles of live records in slot order.
    pub fn iter(&self) -> LiveSlots<'_> {
        LiveSlots {
            slots: self.slots.iter(),
            index: 0,
        }
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether there are no live records.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of slots ever allocated (live and free).
    pub fn allocated(&self) -> usize {
        self.slots.len()
    }

    /// Number of records storage can hold without growing.
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// The underlying storage.
    pub fn storage(&self) -> &StorageArray {
        &self.storage
    }

    /// The underlying storage, mutably.
    pub fn storage_mut(&mut self) -> &mut StorageArray {
        &mut self.storage
    }

    /// Memory used by storage and slot bookkeeping in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.storage.memory_bytes()
            + self.slots.capacity() * std::mem::size_of::<SlotState>()
            + self.free_list.capacity() * std::mem::size_of::<u32>()
    }
}

/// Iterator over the live slots of a [`MemPool`], yielding handles.
#[derive(Clone)]
pub struct LiveSlots<'a> {
    slots: std::slice::Iter<'a, SlotState>,
    index: u32,
}

impl Iterator for LiveSlots<'_> {
    type Item = Handle;

    fn next(&mut self) -> Option<Handle> {
        for state in self.slots.by_ref() {
            let slot = SlotId(self.index);
            self.index += 1;
            if state.live {
                return Some(Handle::new(slot, state.generation));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.slots.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALUE: Field<u64> = Field::new(0);

    fn pool() -> MemPool {
        MemPool::new(8, &PoolConfig::new(4)).unwrap()
    }

    #[test]
    fn create_assigns_sequential_slots() {
        let mut p = pool();
        assert_eq!(p.create().unwrap(), SlotId(0));
        assert_eq!(p.create().unwrap(), SlotId(1));
        assert_eq!(p.len(), 2);
        assert_eq!(p.allocated(), 2);
    }

    #[test]
    fn freed_slots_are_reused_lifo() {
        let mut p = pool();
        for _ in 0..4 {
            p.create().unwrap();
        }
        p.free(SlotId(1)).unwrap();
        p.free(SlotId(3)).unwrap();
        assert_eq!(p.create().unwrap(), SlotId(3));
        assert_eq!(p.create().unwrap(), SlotId(1));
        assert_eq!(p.create().unwrap(), SlotId(4));
    }

    #[test]
    fn reused_slot_is_zeroed() {
        let mut p = pool();
        let s = p.create().unwrap();
        p.put(s, VALUE, 99);
        p.free(s).unwrap();
        let s2 = p.create().unwrap();
        assert_eq!(s, s2);
        assert_eq!(p.get(s2, VALUE), 0);
    }

    #[test]
    fn double_free_is_rejected() {
        let mut p = pool();
        let s = p.create().unwrap();
        p.free(s).unwrap();
        assert!(matches!(p.free(s), Err(PoolError::InvalidState { .. })));
        assert!(matches!(
            p.free(SlotId(10)),
            Err(PoolError::SlotOutOfRange { .. })
        ));
    }

    #[test]
    fn free_invalidates_old_handles() {
        let mut p = pool();
        let s = p.create().unwrap();
        let h = p.handle(s).unwrap();
        assert!(p.is_current(h));
        p.free(s).unwrap();
        p.create().unwrap();
        assert!(!p.is_current(h));
        assert!(matches!(
            p.check(h),
            Err(PoolError::StaleHandle {
                handle_generation: 0,
                current_generation: 1,
                ..
            })
        ));
    }

    #[test]
    fn iter_skips_free_slots() {
        let mut p = pool();
        for _ in 0..5 {
            p.create().unwrap();
        }
        p.free(SlotId(0)).unwrap();
        p.free(SlotId(3)).unwrap();
        let slots: Vec<u32> = p.iter().map(|h| h.slot().0).collect();
        assert_eq!(slots, vec![1, 2, 4]);
    }

    #[test]
    fn grows_past_initial_capacity() {
        let mut p = pool();
        for _ in 0..10 {
            p.create().unwrap();
        }
        assert!(p.capacity() >= 10);
    }

    #[test]
    fn capacity_exceeded_at_max() {
        let mut p = MemPool::new(8, &PoolConfig::new(1).with_max_capacity(2)).unwrap();
        p.create().unwrap();
        p.create().unwrap();
        assert!(matches!(
            p.create(),
            Err(PoolError::CapacityExceeded {
                requested: 3,
                capacity: 2
            })
        ));
    }

    #[test]
    fn swap_moves_contents_not_identity() {
        let mut p = pool();
        let a = p.create().unwrap();
        let b = p.create().unwrap();
        p.put(a, VALUE, 1);
        p.put(b, VALUE, 2);
        p.swap(a, b).unwrap();
        assert_eq!(p.get(a, VALUE), 2);
        assert_eq!(p.get(b, VALUE), 1);
        assert_eq!(p.generation(a), Some(0));
    }

    #[test]
    fn clear_restarts_from_slot_zero() {
        let mut p = pool();
        for _ in 0..3 {
            p.create().unwrap();
        }
        p.free(SlotId(1)).unwrap();
        p.clear();
        assert!(p.is_empty());
        assert_eq!(p.iter().count(), 0);
        assert_eq!(p.create().unwrap(), SlotId(0));
        assert_eq!(p.create().unwrap(), SlotId(1));
        assert_eq!(p.generation(SlotId(0)), Some(1));
        assert_eq!(p.generation(SlotId(1)), Some(1));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn live_count_matches_iteration(
                ops in prop::collection::vec(any::<(bool, u8)>(), 1..200),
            ) {
                let mut p = MemPool::new(8, &PoolConfig::new(0)).unwrap();
                let mut live: Vec<SlotId> = Vec::new();
                for (create, pick) in ops {
                    if create || live.is_empty() {
                        let s = p.create().unwrap();
                        prop_assert!(!live.contains(&s));
                        live.push(s);
                    } else {
                        let s = live.swap_remove(pick as usize % live.len());
                        p.free(s).unwrap();
                    }
                }
                prop_assert_eq!(p.len(), live.len());
                let mut iterated: Vec<SlotId> = p.iter().map(|h| h.slot()).collect();
                live.sort_by_key(|s| s.0);
                iterated.sort_by_key(|s| s.0);
                prop_assert_eq!(iterated, live);
            }
        }
    }
}
