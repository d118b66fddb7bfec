//! Error types for the lineage engine.
//!
//! Organized by subsystem: pool (storage, slot allocation, proxy binding)
//! and spatial (tree construction and index queries).

use std::error::Error;
use std::fmt;

use crate::id::{Handle, SlotId};

/// Errors from pool storage, slot allocation, and proxy binding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolError {
    /// The storage array cannot grow to hold the requested number of slots.
    CapacityExceeded {
        /// Number of slots requested.
        requested: usize,
        /// Maximum number of slots the pool may grow to.
        capacity: usize,
    },
    /// A proxy or slot was used in a state that does not permit the
    /// operation (unbound proxy, released proxy, slot not live).
    InvalidState {
        /// What was wrong.
        reason: &'static str,
    },
    /// A handle or proxy refers to a slot that has since been deleted.
    StaleHandle {
        /// The slot the handle points at.
        slot: SlotId,
        /// The generation encoded in the handle.
        handle_generation: u32,
        /// The slot's current generation.
        current_generation: u32,
    },
    /// A slot index beyond the pool's allocated range.
    SlotOutOfRange {
        /// The offending slot.
        slot: SlotId,
        /// Number of slots ever allocated in the pool.
        len: usize,
    },
    /// A pool configuration failed validation.
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },
    /// A field extends past the end of the record it is read from or
    /// written to.
    FieldOutOfRange {
        /// First byte past the field.
        end: usize,
        /// Width of one record in bytes.
        record_size: usize,
    },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded {
                requested,
                capacity,
            } => {
                write!(
                    f,
                    "pool capacity exceeded: requested {requested} slots, capacity {capacity} slots"
                )
            }
            Self::InvalidState { reason } => write!(f, "invalid state: {reason}"),
            Self::StaleHandle {
                slot,
                handle_generation,
                current_generation,
            } => {
                write!(
                    f,
                    "stale handle: slot {slot} generation {handle_generation}, \
                     current {current_generation}"
                )
            }
            Self::SlotOutOfRange { slot, len } => {
                write!(f, "slot {slot} out of range (pool has {len} slots)")
            }
            Self::InvalidConfig { reason } => write!(f, "invalid pool config: {reason}"),
            Self::FieldOutOfRange { end, record_size } => {
                write!(f, "field ends at byte {end}, past the {record_size}-byte record")
            }
        }
    }
}

impl Error for PoolError {}

/// Errors from KD-tree construction and spatial index queries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpatialError {
    /// A point, plane, or object has a different dimensionality than the
    /// tree or index it is used with.
    DimensionMismatch {
        /// Dimensionality of the tree or index.
        expected: usize,
        /// Dimensionality that was supplied.
        found: usize,
    },
    /// An object handed to the tree builder is no longer live in its pool.
    StaleObject {
        /// The stale handle.
        handle: Handle,
    },
    /// A rebuild policy failed validation.
    InvalidPolicy {
        /// Description of the problem.
        reason: String,
    },
    /// The underlying node pool failed.
    Pool(PoolError),
}

impl fmt::Display for SpatialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DimensionMismatch { expected, found } => {
                write!(f, "dimension mismatch: expected {expected}, found {found}")
            }
            Self::StaleObject { handle } => write!(f, "object {handle} is not live"),
            Self::InvalidPolicy { reason } => write!(f, "invalid rebuild policy: {reason}"),
            Self::Pool(e) => write!(f, "node pool error: {e}"),
        }
    }
}

impl Error for SpatialError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Pool(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PoolError> for SpatialError {
    fn from(e: PoolError) -> Self {
        Self::Pool(e)
    }
}
