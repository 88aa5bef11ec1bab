//! Export/import records for persistence round-trips.
//!
//! Exports carry a *remaining* TTL rather than absolute instants: `Instant` is
//! meaningless across processes, and a relative deadline keeps an entry from
//! living longer after a reload than it would have without one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::CacheError;

/// One live entry as produced by [`crate::CacheManager::export`] and consumed
/// by [`crate::CacheManager::import`].
///
/// ```
/// use cachet_core::{tag_set, ExportedEntry};
/// use std::time::Duration;
///
/// let entry = ExportedEntry {
///     key: "prompt:42".to_string(),
///     value: "cached completion".to_string(),
///     remaining_ttl: Duration::from_secs(90),
///     tags: tag_set(["ai-responses"]),
/// };
///
/// let json = serde_json::to_string(&entry).unwrap();
/// let back: ExportedEntry<String> = serde_json::from_str(&json).unwrap();
/// assert_eq!(back, entry);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedEntry<V> {
    pub key: String,
    pub value: V,
    pub remaining_ttl: Duration,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

/// Outcome of an [`crate::CacheManager::import`] batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Entries stored successfully.
    pub imported: u64,
    /// Entries rejected, in input order.
    pub failures: Vec<ImportFailure>,
}

impl ImportReport {
    /// True when every entry of the batch was stored.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A single rejected import entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFailure {
    pub key: String,
    pub error: CacheError,
}
