//! Raw binary layout of a pool.
//!
//! An arena is written as a big-endian `i32` record count followed by that
//! many records, each copied verbatim from storage. Fields are already
//! big-endian in storage, so a record's bytes are its on-disk form. There
//! is no header, padding, or schema; reader and writer must agree on the
//! record layout.

use std::fmt;
use std::io::{self, Read, Write};

use indexmap::IndexMap;
use lineage_core::{Handle, PoolError, SlotId};

use crate::pool::Pool;

/// Errors from reading or writing the raw layout.
#[derive(Debug)]
pub enum RawError {
    /// An I/O error occurred during read or write.
    Io(io::Error),
    /// The input is not a valid raw layout (negative count, bad index).
    Malformed {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// Allocating records for the decoded data failed.
    Pool(PoolError),
}

impl fmt::Display for RawError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Malformed { detail } => write!(f, "malformed raw data: {detail}"),
            Self::Pool(e) => write!(f, "pool error: {e}"),
        }
    }
}

impl std::error::Error for RawError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Pool(e) => Some(e),
            Self::Malformed { .. } => None,
        }
    }
}

impl From<io::Error> for RawError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<PoolError> for RawError {
    fn from(e: PoolError) -> Self {
        Self::Pool(e)
    }
}

/// Write a big-endian i32.
pub fn write_i32_be(w: &mut dyn Write, v: i32) -> Result<(), RawError> {
    w.write_all(&v.to_be_bytes())?;
    Ok(())
}

/// Read a big-endian i32.
pub fn read_i32_be(r: &mut dyn Read) -> Result<i32, RawError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_be_bytes(buf))
}

/// Write a record count, rejecting counts that do not fit an `i32`.
pub fn write_count(w: &mut dyn Write, count: usize) -> Result<(), RawError> {
    let count = i32::try_from(count).map_err(|_| RawError::Malformed {
        detail: format!("record count {count} does not fit an i32"),
    })?;
    write_i32_be(w, count)
}

/// Read a record count, rejecting negative values.
pub fn read_count(r: &mut dyn Read) -> Result<usize, RawError> {
    let count = read_i32_be(r)?;
    usize::try_from(count).map_err(|_| RawError::Malformed {
        detail: format!("negative record count {count}"),
    })
}

/// Read a file index and check it against the number of records read.
pub fn read_file_index(r: &mut dyn Read, len: usize) -> Result<usize, RawError> {
    let index = read_i32_be(r)?;
    match usize::try_from(index) {
        Ok(i) if i < len => Ok(i),
        _ => Err(RawError::Malformed {
            detail: format!("file index {index} out of range 0..{len}"),
        }),
    }
}

/// Write every live record of `pool`.
///
/// Records are written in slot order. Returns the file index assigned to
/// each slot, for callers that write cross-references afterwards.
pub fn write_pool(w: &mut dyn Write, pool: &Pool) -> Result<IndexMap<SlotId, u32>, RawError> {
    write_count(w, pool.len())?;
    let mut file_index = IndexMap::with_capacity(pool.len());
    for (i, handle) in pool.iter().enumerate() {
        w.write_all(pool.record(handle)?)?;
        file_index.insert(handle.slot(), i as u32);
    }
    tracing::debug!(records = pool.len(), record_size = pool.record_size(), "pool written");
    Ok(file_index)
}

/// Read records into `pool`, appending to whatever it already holds.
///
/// Returns the handle of each record, indexed by file index.
pub fn read_pool(r: &mut dyn Read, pool: &mut Pool) -> Result<Vec<Handle>, RawError> {
    let count = read_count(r)?;
    let mut handles = Vec::with_capacity(count.min(pool.capacity().max(1024)));
    for _ in 0..count {
        let handle = pool.create_handle()?;
        r.read_exact(pool.record_mut(handle)?)?;
        handles.push(handle);
    }
    tracing::debug!(records = count, record_size = pool.record_size(), "pool read");
    Ok(handles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;
    use crate::layout::Field;

    const ID: Field<i32> = Field::new(0);
    const W: Field<f32> = Field::new(4);

    fn pool() -> Pool {
        Pool::new(8, &PoolConfig::new(4)).unwrap()
    }

    #[test]
    fn layout_is_count_then_records() {
        let mut p = pool();
        let h = p.create_handle().unwrap();
        p.write(h, ID, 7).unwrap();
        p.write(h, W, 1.0).unwrap();

        let mut buf = Vec::new();
        write_pool(&mut buf, &p).unwrap();
        assert_eq!(&buf[..4], &[0, 0, 0, 1]);
        assert_eq!(&buf[4..8], &[0, 0, 0, 7]);
        assert_eq!(&buf[8..12], &1.0f32.to_be_bytes());
        assert_eq!(buf.len(), 12);
    }

    #[test]
    fn round_trip_skips_deleted_records() {
        let mut p = pool();
        for i in 0..5 {
            let h = p.create_handle().unwrap();
            p.write(h, ID, i).unwrap();
        }
        p.delete(SlotId(1)).unwrap();
        p.delete(SlotId(3)).unwrap();

        let mut buf = Vec::new();
        let written = write_pool(&mut buf, &p).unwrap();
        assert_eq!(written.get(&SlotId(4)), Some(&2));

        let mut q = pool();
        let handles = read_pool(&mut buf.as_slice(), &mut q).unwrap();
        let ids: Vec<i32> = handles.iter().map(|&h| q.read(h, ID).unwrap()).collect();
        assert_eq!(ids, vec![0, 2, 4]);
    }

    #[test]
    fn negative_count_is_malformed() {
        let buf = (-3i32).to_be_bytes();
        let err = read_pool(&mut buf.as_slice(), &mut pool()).unwrap_err();
        assert!(matches!(err, RawError::Malformed { .. }));
    }

    #[test]
    fn truncated_input_is_io_error() {
        let mut buf = Vec::new();
        write_i32_be(&mut buf, 2).unwrap();
        buf.extend_from_slice(&[0; 12]);
        let err = read_pool(&mut buf.as_slice(), &mut pool()).unwrap_err();
        assert!(matches!(err, RawError::Io(_)));
    }

    #[test]
    fn file_index_is_bounds_checked() {
        let buf = 5i32.to_be_bytes();
        assert!(read_file_index(&mut buf.as_slice(), 5).is_err());
        let buf = 4i32.to_be_bytes();
        assert_eq!(read_file_index(&mut buf.as_slice(), 5).unwrap(), 4);
    }
}
