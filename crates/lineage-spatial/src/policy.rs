//! When to discard an index and rebuild it from a fresh snapshot.

use lineage_core::SpatialError;

use crate::index::SpatialIndex;

/// Caller-side rebuild policy for a [`SpatialIndex`].
///
/// The index never rebuilds itself. A policy says a rebuild is due once
/// enough modifications have accumulated, both absolutely and relative
/// to the index size.
#[derive(Clone, Debug, PartialEq)]
pub struct RebuildPolicy {
    /// Modifications below which a rebuild is never due.
    ///
    /// Default: 1000.
    pub min_mod_count: usize,

    /// Fraction of `mod_count` to `size` at which a rebuild is due.
    ///
    /// Default: 0.25.
    pub max_stale_ratio: f64,
}

impl RebuildPolicy {
    /// Default modification floor.
    pub const DEFAULT_MIN_MOD_COUNT: usize = 1000;

    /// Default staleness ratio.
    pub const DEFAULT_MAX_STALE_RATIO: f64 = 0.25;

    /// Check the policy for consistency.
    pub fn validate(&self) -> Result<(), SpatialError> {
        if !self.max_stale_ratio.is_finite() || self.max_stale_ratio < 0.0 {
            return Err(SpatialError::InvalidPolicy {
                reason: format!(
                    "max_stale_ratio must be finite and non-negative, got {}",
                    self.max_stale_ratio
                ),
            });
        }
        Ok(())
    }

    /// Whether `index` has accumulated enough modifications to rebuild.
    pub fn should_rebuild(&self, index: &SpatialIndex) -> bool {
        let mod_count = index.mod_count();
        if mod_count == 0 || mod_count < self.min_mod_count {
            return false;
        }
        mod_count as f64 >= self.max_stale_ratio * index.size().max(1) as f64
    }
}

impl Default for RebuildPolicy {
    fn default() -> Self {
        Self {
            min_mod_count: Self::DEFAULT_MIN_MOD_COUNT,
            max_stale_ratio: Self::DEFAULT_MAX_STALE_RATIO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineage_test_utils::PointCloud;

    fn index_of(count: usize) -> (PointCloud, SpatialIndex) {
        let cloud = PointCloud::uniform(count, 2, 1.0, 5);
        let index =
            SpatialIndex::build(cloud.handles.iter().copied(), &cloud.positions()).unwrap();
        (cloud, index)
    }

    #[test]
    fn default_policy_is_valid() {
        let policy = RebuildPolicy::default();
        assert!(policy.validate().is_ok());
        assert_eq!(policy.min_mod_count, 1000);
    }

    #[test]
    fn rejects_bad_ratio() {
        let policy = RebuildPolicy {
            max_stale_ratio: f64::NAN,
            ..RebuildPolicy::default()
        };
        assert!(matches!(
            policy.validate(),
            Err(SpatialError::InvalidPolicy { .. })
        ));
        let policy = RebuildPolicy {
            max_stale_ratio: -0.5,
            ..RebuildPolicy::default()
        };
        let err = policy.validate().unwrap_err();
        assert!(matches!(err, SpatialError::InvalidPolicy { .. }));
        assert!(err.to_string().starts_with("invalid rebuild policy"));
    }

    #[test]
    fn fresh_index_never_needs_rebuild() {
        let (_cloud, index) = index_of(100);
        let policy = RebuildPolicy {
            min_mod_count: 0,
            max_stale_ratio: 0.0,
        };
        assert!(!policy.should_rebuild(&index));
    }

    #[test]
    fn rebuild_due_after_enough_modifications() {
        let (cloud, mut index) = index_of(100);
        let policy = RebuildPolicy {
            min_mod_count: 10,
            max_stale_ratio: 0.4,
        };
        for &h in &cloud.handles[..19] {
            index.add(h);
        }
        assert!(!policy.should_rebuild(&index));
        index.add(cloud.handles[19]);
        // 20 invalid nodes + 20 overlay entries against 100 objects.
        assert!(policy.should_rebuild(&index));
    }
}
