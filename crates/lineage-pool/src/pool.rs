//! The proxy pool: records, slots, and recyclable references together.

use lineage_core::{Handle, PoolError, RefPool, SlotId};

use crate::config::PoolConfig;
use crate::layout::{Field, Primitive};
use crate::mempool::{LiveSlots, MemPool};
use crate::proxy::{ObjRef, RefRecycler};

/// A pool of fixed-width records accessed through [`ObjRef`] proxies.
///
/// Structural changes (`create`, `delete`, field writes) need `&mut self`.
/// Proxies are borrowed and returned through `&self`, so a shared pool can
/// serve several readers at once.
pub struct Pool {
    mem: MemPool,
    refs: RefRecycler,
}

impl Pool {
    /// Create an empty pool of `record_size`-byte records.
    pub fn new(record_size: usize, config: &PoolConfig) -> Result<Self, PoolError> {
        Ok(Self {
            mem: MemPool::new(record_size, config)?,
            refs: RefRecycler::new(),
        })
    }

    /// Create an empty pool with the default configuration.
    pub fn with_record_size(record_size: usize) -> Result<Self, PoolError> {
        Self::new(record_size, &PoolConfig::default())
    }

    /// Width of one record in bytes.
    pub fn record_size(&self) -> usize {
        self.mem.storage().record_size()
    }

    /// Allocate a zeroed record and bind `r` to it.
    pub fn create<'r>(&mut self, r: &'r mut ObjRef) -> Result<&'r mut ObjRef, PoolError> {
        let handle = self.create_handle()?;
        r.bind(handle);
        Ok(r)
    }

    /// Allocate a zeroed record and return its handle.
    pub fn create_handle(&mut self) -> Result<Handle, PoolError> {
        let slot = self.mem.create()?;
        self.mem.handle(slot)
    }

    /// Delete the record in `slot`.
    ///
    /// Proxies and handles still naming the slot become stale.
    pub fn delete(&mut self, slot: SlotId) -> Result<(), PoolError> {
        self.mem.free(slot)
    }

    /// Delete the record named by `handle`, rejecting stale handles.
    pub fn delete_handle(&mut self, handle: Handle) -> Result<(), PoolError> {
        let slot = self.mem.check(handle)?;
        self.mem.free(slot)
    }

    /// Rebind `r` to `slot` without checking that the slot is live.
    ///
    /// Field access through `r` then reads whatever record occupies the
    /// slot. Out-of-range slots are bound as-is and fail on first access.
    pub fn get_object_unchecked<'r>(&self, slot: SlotId, r: &'r mut ObjRef) -> &'r mut ObjRef {
        r.bind(Handle::new(slot, self.mem.generation(slot).unwrap_or(0)));
        r
    }

    /// Whether `handle` names a live record.
    pub fn is_live(&self, handle: Handle) -> bool {
        self.mem.is_current(handle)
    }

    /// The current handle of the live record in `slot`.
    pub fn handle(&self, slot: SlotId) -> Result<Handle, PoolError> {
        self.mem.handle(slot)
    }

    /// Read a field through a bound proxy.
    pub fn get<T: Primitive>(&self, r: &ObjRef, field: Field<T>) -> Result<T, PoolError> {
        self.read(r.handle()?, field)
    }

    /// Write a field through a bound proxy.
    pub fn set<T: Primitive>(
        &mut self,
        r: &ObjRef,
        field: Field<T>,
        value: T,
    ) -> Result<(), PoolError> {
        self.write(r.handle()?, field, value)
    }

    /// Read a field of the record named by `handle`.
    ///
    /// Fails with [`PoolError::FieldOutOfRange`] if the field runs past
    /// the record.
    pub fn read<T: Primitive>(&self, handle: Handle, field: Field<T>) -> Result<T, PoolError> {
        self.check_field(field)?;
        let slot = self.mem.check(handle)?;
        Ok(self.mem.get(slot, field))
    }

    /// Write a field of the record named by `handle`.
    ///
    /// Fails with [`PoolError::FieldOutOfRange`] if the field runs past
    /// the record.
    pub fn write<T: Primitive>(
        &mut self,
        handle: Handle,
        field: Field<T>,
        value: T,
    ) -> Result<(), PoolError> {
        self.check_field(field)?;
        let slot = self.mem.check(handle)?;
        self.mem.put(slot, field, value);
        Ok(())
    }

    /// Reject a field that does not fit in one record.
    pub fn check_field<T: Primitive>(&self, field: Field<T>) -> Result<(), PoolError> {
        let record_size = self.record_size();
        if field.end() > record_size {
            return Err(PoolError::FieldOutOfRange {
                end: field.end(),
                record_size,
            });
        }
        Ok(())
    }

    /// Read a field by raw slot, without liveness checks.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is beyond the storage capacity or the field runs
    /// past the record.
    pub fn read_unchecked<T: Primitive>(&self, slot: SlotId, field: Field<T>) -> T {
        self.mem.get(slot, field)
    }

    /// Write a field by raw slot, without liveness checks.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is beyond the storage capacity or the field runs
    /// past the record.
    pub fn write_unchecked<T: Primitive>(&mut self, slot: SlotId, field: Field<T>, value: T) {
        self.mem.put(slot, field, value);
    }

    /// The raw bytes of a live record.
    pub fn record(&self, handle: Handle) -> Result<&[u8], PoolError> {
        let slot = self.mem.check(handle)?;
        Ok(self.mem.storage().record(slot.index()))
    }

    /// The raw bytes of a live record, mutably.
    pub fn record_mut(&mut self, handle: Handle) -> Result<&mut [u8], PoolError> {
        let slot = self.mem.check(handle)?;
        Ok(self.mem.storage_mut().record_mut(slot.index()))
    }

    /// Iterate over handles of all live records in slot order.
    ///
    /// The iterator is lazy and can be cloned to restart from the same
    /// position.
    pub fn iter(&self) -> LiveSlots<'_> {
        self.mem.iter()
    }

    /// A cursor that rebinds `r` to each live record in turn.
    pub fn cursor<'p, 'r>(&'p self, r: &'r mut ObjRef) -> RefCursor<'p, 'r> {
        RefCursor {
            slots: self.mem.iter(),
            r,
        }
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.mem.len()
    }

    /// Whether the pool has no live records.
    pub fn is_empty(&self) -> bool {
        self.mem.is_empty()
    }

    /// Number of slots ever allocated.
    pub fn allocated(&self) -> usize {
        self.mem.allocated()
    }

    /// Number of records storage holds without growing.
    pub fn capacity(&self) -> usize {
        self.mem.capacity()
    }

    /// Memory used by the pool in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.mem.memory_bytes()
    }

    /// Number of proxies this pool has ever created.
    pub fn refs_created(&self) -> usize {
        self.refs.created()
    }

    /// The underlying slot allocator.
    pub fn mem(&self) -> &MemPool {
        &self.mem
    }

    /// The underlying slot allocator, mutably.
    pub fn mem_mut(&mut self) -> &mut MemPool {
        &mut self.mem
    }
}

impl RefPool for Pool {
    type Ref = ObjRef;

    fn create_ref(&self) -> ObjRef {
        self.refs.acquire()
    }

    fn release_ref(&self, r: ObjRef) {
        self.refs.release(r);
    }

    fn get_object<'r>(
        &self,
        slot: SlotId,
        r: &'r mut ObjRef,
    ) -> Result<&'r mut ObjRef, PoolError> {
        r.bind(self.mem.handle(slot)?);
        Ok(r)
    }

    fn get_id(&self, r: &ObjRef) -> Result<SlotId, PoolError> {
        self.mem.check(r.handle()?)
    }
}

/// Garbage-free traversal of a pool: one proxy rebound per step.
pub struct RefCursor<'p, 'r> {
    slots: LiveSlots<'p>,
    r: &'r mut ObjRef,
}

impl RefCursor<'_, '_> {
    /// Advance to the next live record, returning the rebound proxy.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&ObjRef> {
        let handle = self.slots.next()?;
        self.r.bind(handle);
        Some(&*self.r)
    }
}
