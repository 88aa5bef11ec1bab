use std::time::Duration;

use thiserror::Error;

/// Result alias used by every fallible cache operation.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors surfaced by [`crate::CacheManager::set`] and, per entry, by
/// [`crate::CacheManager::import`].
///
/// Reads (`get`, `contains`, `delete`) never fail: a missing or expired key is
/// a normal outcome for a cache-aside caller, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The insert does not fit and eviction is disabled (or cannot help,
    /// e.g. `max_entries == 0`).
    #[error(
        "cache capacity exceeded: need {required_bytes} bytes with {used_bytes}/{max_size_bytes} used, \
         {entries}/{max_entries} entries"
    )]
    CapacityExceeded {
        required_bytes: u64,
        used_bytes: u64,
        max_size_bytes: u64,
        entries: u64,
        max_entries: u64,
    },

    /// A single value is bigger than the whole byte budget.
    #[error("value of {size_bytes} bytes exceeds the cache limit of {max_size_bytes} bytes")]
    ValueTooLarge { size_bytes: u64, max_size_bytes: u64 },

    /// The value could not be measured for size accounting.
    #[error("failed to measure cached value: {reason}")]
    SerializationFailure { reason: String },

    /// The TTL is zero or too large to be represented as a deadline.
    #[error("invalid ttl {ttl:?}: must be non-zero and representable")]
    InvalidTtl { ttl: Duration },
}

impl CacheError {
    /// Convenience constructor for size strategies.
    pub fn serialization(reason: impl std::fmt::Display) -> Self {
        CacheError::SerializationFailure {
            reason: reason.to_string(),
        }
    }

    /// Returns true for the two capacity-related variants.
    pub fn is_capacity(&self) -> bool {
        matches!(
            self,
            CacheError::CapacityExceeded { .. } | CacheError::ValueTooLarge { .. }
        )
    }
}
