//! Pool configuration parameters.

use lineage_core::PoolError;

/// Configuration for a record pool.
///
/// Controls the initial slot capacity of the storage array and the hard
/// ceiling it may grow to. Validated at pool construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of slots allocated up front.
    ///
    /// Default: 1024.
    pub initial_capacity: u32,

    /// Maximum number of slots the storage array may grow to.
    ///
    /// Default: `i32::MAX`. Records link to each other with `i32` slot
    /// indices (`-1` meaning "none"), so larger values are rejected.
    pub max_capacity: u32,
}

impl PoolConfig {
    /// Default initial capacity in slots.
    pub const DEFAULT_INITIAL_CAPACITY: u32 = 1024;

    /// Default (and largest permitted) maximum capacity in slots.
    pub const DEFAULT_MAX_CAPACITY: u32 = i32::MAX as u32;

    /// Create a config with the given initial capacity and the default ceiling.
    pub fn new(initial_capacity: u32) -> Self {
        Self {
            initial_capacity,
            max_capacity: Self::DEFAULT_MAX_CAPACITY,
        }
    }

    /// Set the maximum capacity.
    pub fn with_max_capacity(mut self, max_capacity: u32) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    /// Check the configuration for consistency.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_capacity > Self::DEFAULT_MAX_CAPACITY {
            return Err(PoolError::InvalidConfig {
                reason: format!(
                    "max_capacity {} exceeds the largest linkable slot count {}",
                    self.max_capacity,
                    Self::DEFAULT_MAX_CAPACITY
                ),
            });
        }
        if self.initial_capacity > self.max_capacity {
            return Err(PoolError::InvalidConfig {
                reason: format!(
                    "initial_capacity {} exceeds max_capacity {}",
                    self.initial_capacity, self.max_capacity
                ),
            });
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INITIAL_CAPACITY)
    }
}
