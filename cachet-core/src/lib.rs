//! # Cachet Core
//!
//! Core engine of the Cachet caching library: a bounded, namespaced,
//! in-memory cache sitting between application code and slower backing
//! stores (model provider calls, database reads).
//!
//! ## Features
//!
//! - **Dual budgets**: Byte-size and entry-count limits enforced on every insert
//! - **TTL expiry**: Lazy on read, eager on purge, one liveness rule everywhere
//! - **Recency + frequency eviction**: Deterministic `(score, key)` ordering
//! - **Tag invalidation**: Drop every entry carrying a label in one call
//! - **Statistics**: Hits, misses, evictions, expirations and current size
//! - **Persistence bridge**: Export live entries with remaining TTLs, import them back
//! - **Pluggable measurement**: JSON length, heap estimate or any closure
//!
//! ## Module Organization
//!
//! - [`cache_entry`] - Value plus expiry, access and size metadata
//! - [`eviction_policy`] - Replacement scoring and ordering
//! - [`config`] - Per-namespace budgets and TTLs
//! - [`size`] - Size measurement strategies
//! - [`clock`] - Time source abstraction for deterministic tests
//!
//! The registry and background reaper live in the `cachet` crate.
pub mod cache_entry;
pub mod clock;
pub mod config;
pub mod eviction_policy;
pub mod size;

mod cache_manager;
mod error;
mod persistence;
mod stats;

pub use cache_entry::CacheEntry;
pub use cache_manager::CacheManager;
pub use clock::{Clock, MockClock, SystemClock};
pub use config::{CacheConfig, CacheConfigBuilder};
pub use error::{CacheError, CacheResult};
pub use eviction_policy::{EvictionPolicy, DEFAULT_FREQUENCY_WEIGHT};
pub use persistence::{ExportedEntry, ImportFailure, ImportReport};
pub use size::{HeapSize, JsonSize, MemoryEstimator, SizeEstimator, SizeFn};
pub use stats::CacheStats;

use std::collections::BTreeSet;

/// Builds a tag set from anything yielding string-like items.
///
/// # Examples
///
/// ```
/// use cachet_core::tag_set;
///
/// let tags = tag_set(["ai-responses", "user:7"]);
/// assert!(tags.contains("user:7"));
///
/// let none = tag_set(Vec::<String>::new());
/// assert!(none.is_empty());
/// ```
pub fn tag_set<I, T>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    tags.into_iter().map(Into::into).collect()
}
