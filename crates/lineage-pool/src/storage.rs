//! Contiguous fixed-width record storage.
//!
//! A [`StorageArray`] is a single growable `Vec<u8>` divided into equal
//! records. Records are addressed by slot index; fields inside a record
//! are addressed by [`Field`] descriptors.

use lineage_core::PoolError;

use crate::layout::{Field, Primitive};

/// A growable array of fixed-width byte records.
///
/// Growth is roughly 1.5x and bounded by `max_capacity`. Existing content
/// is preserved across growth. Storage never shrinks.
pub struct StorageArray {
    data: Vec<u8>,
    record_size: usize,
    capacity: usize,
    max_capacity: usize,
}

impl StorageArray {
    /// Create storage for `capacity` zeroed records of `record_size` bytes.
    pub fn new(
        record_size: usize,
        capacity: usize,
        max_capacity: usize,
    ) -> Result<Self, PoolError> {
        if capacity > max_capacity {
            return Err(PoolError::CapacityExceeded {
                requested: capacity,
                capacity: max_capacity,
            });
        }
        Ok(Self {
            data: vec![0; capacity * record_size],
            record_size,
            capacity,
            max_capacity,
        })
    }

    /// Width of one record in bytes.
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Number of records the storage can currently hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Maximum number of records the storage may grow to.
    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    /// Grow, if needed, so that at least `records` records fit.
    ///
    /// Returns `Err(PoolError::CapacityExceeded)` if `records` is larger
    /// than the maximum capacity.
    pub fn ensure_capacity(&mut self, records: usize) -> Result<(), PoolError> {
        if records <= self.capacity {
            return Ok(());
        }
        if records > self.max_capacity {
            return Err(PoolError::CapacityExceeded {
                requested: records,
                capacity: self.max_capacity,
            });
        }
        let grown = self
            .capacity
            .saturating_add(self.capacity / 2)
            .max(self.capacity + 1);
        let new_capacity = grown.max(records).min(self.max_capacity);
        self.data.resize(new_capacity * self.record_size, 0);
        tracing::debug!(
            from = self.capacity,
            to = new_capacity,
            record_size = self.record_size,
            "storage array grown"
        );
        self.capacity = new_capacity;
        Ok(())
    }

    /// Read a field of the record in `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is beyond capacity or the field extends past the
    /// record.
    pub fn get<T: Primitive>(&self, slot: usize, field: Field<T>) -> T {
        T::read(&self.record(slot)[field.offset()..field.end()])
    }

    /// Write a field of the record in `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is beyond capacity or the field extends past the
    /// record.
    pub fn put<T: Primitive>(&mut self, slot: usize, field: Field<T>, value: T) {
        value.write(&mut self.record_mut(slot)[field.offset()..field.end()]);
    }

    /// The bytes of one record.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is beyond capacity.
    pub fn record(&self, slot: usize) -> &[u8] {
        let start = slot * self.record_size;
        &self.data[start..start + self.record_size]
    }

    /// The bytes of one record, mutably.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is beyond capacity.
    pub fn record_mut(&mut self, slot: usize) -> &mut [u8] {
        let start = slot * self.record_size;
        &mut self.data[start..start + self.record_size]
    }

    /// Exchange the contents of two records.
    pub fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let size = self.record_size;
        let (head, tail) = self.data.split_at_mut(hi * size);
        head[lo * size..(lo + 1) * size].swap_with_slice(&mut tail[..size]);
    }

    /// Copy the record in `from` over the record in `to`.
    pub fn copy(&mut self, from: usize, to: usize) {
        let size = self.record_size;
        self.data
            .copy_within(from * size..(from + 1) * size, to * size);
    }

    /// Zero every byte of a record.
    pub fn zero(&mut self, slot: usize) {
        self.record_mut(slot).fill(0);
    }

    /// Memory usage of the backing storage in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: Field<i32> = Field::new(0);
    const B: Field<f64> = Field::new(4);

    fn storage(capacity: usize) -> StorageArray {
        StorageArray::new(12, capacity, 100).unwrap()
    }

    #[test]
    fn new_storage_is_zeroed() {
        let s = storage(4);
        assert_eq!(s.memory_bytes(), 48);
        assert!(s.record(3).iter().all(|&b| b == 0));
    }

    #[test]
    fn fields_are_independent() {
        let mut s = storage(2);
        s.put(1, A, -7);
        s.put(1, B, 2.5);
        assert_eq!(s.get(1, A), -7);
        assert_eq!(s.get(1, B), 2.5);
        assert_eq!(s.get(0, A), 0);
    }

    #[test]
    fn growth_is_one_and_a_half_times() {
        let mut s = storage(10);
        s.ensure_capacity(11).unwrap();
        assert_eq!(s.capacity(), 15);
    }

    #[test]
    fn growth_from_zero_takes_one_step() {
        let mut s = storage(0);
        s.ensure_capacity(1).unwrap();
        assert_eq!(s.capacity(), 1);
    }

    #[test]
    fn growth_preserves_content() {
        let mut s = storage(2);
        s.put(1, B, 9.0);
        s.ensure_capacity(50).unwrap();
        assert_eq!(s.get(1, B), 9.0);
        assert_eq!(s.get(49, B), 0.0);
    }

    #[test]
    fn growth_is_capped_at_max() {
        let mut s = storage(80);
        s.ensure_capacity(81).unwrap();
        assert_eq!(s.capacity(), 100);
        assert!(matches!(
            s.ensure_capacity(101),
            Err(PoolError::CapacityExceeded {
                requested: 101,
                capacity: 100
            })
        ));
    }

    #[test]
    fn initial_above_max_is_rejected() {
        assert!(StorageArray::new(8, 10, 5).is_err());
    }

    #[test]
    fn swap_exchanges_records() {
        let mut s = storage(3);
        s.put(0, A, 1);
        s.put(2, A, 3);
        s.swap(2, 0);
        assert_eq!(s.get(0, A), 3);
        assert_eq!(s.get(2, A), 1);
        s.swap(1, 1);
        assert_eq!(s.get(1, A), 0);
    }

    #[test]
    fn copy_then_zero() {
        let mut s = storage(3);
        s.put(0, B, 4.0);
        s.copy(0, 2);
        assert_eq!(s.get(2, B), 4.0);
        s.zero(0);
        assert_eq!(s.get(0, B), 0.0);
        assert_eq!(s.get(2, B), 4.0);
    }
}
