//! Per-namespace cache configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::eviction_policy::{EvictionPolicy, DEFAULT_FREQUENCY_WEIGHT};

/// Budget, expiry and eviction settings for one [`crate::CacheManager`].
///
/// Every field has a default, so partial configs deserialize cleanly:
///
/// ```
/// use cachet_core::CacheConfig;
/// use std::time::Duration;
///
/// let config: CacheConfig =
///     serde_json::from_str(r#"{ "max_entries": 50, "eviction_enabled": false }"#).unwrap();
/// assert_eq!(config.max_entries, 50);
/// assert!(!config.eviction_enabled);
/// assert_eq!(config.default_ttl, Duration::from_secs(3600));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Ceiling on the sum of `size_bytes` over stored entries.
    pub max_size_bytes: u64,

    /// Ceiling on the number of stored entries.
    pub max_entries: u64,

    /// TTL applied when `set` is called without one.
    pub default_ttl: Duration,

    /// Period between automatic purges. Zero disables the reaper.
    pub cleanup_interval: Duration,

    /// When false, an insert that does not fit is rejected instead of evicting.
    pub eviction_enabled: bool,

    /// Weight of one access in the replacement score.
    pub frequency_weight: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: 100 * 1024 * 1024,
            max_entries: 10_000,
            default_ttl: Duration::from_secs(3600),
            cleanup_interval: Duration::from_secs(60),
            eviction_enabled: true,
            frequency_weight: DEFAULT_FREQUENCY_WEIGHT,
        }
    }
}

impl CacheConfig {
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Eviction policy derived from `frequency_weight`.
    pub fn eviction_policy(&self) -> EvictionPolicy {
        EvictionPolicy::new(self.frequency_weight)
    }
}

/// Fluent builder for [`CacheConfig`], starting from the defaults.
///
/// ```
/// use cachet_core::CacheConfig;
/// use std::time::Duration;
///
/// let config = CacheConfig::builder()
///     .max_size_bytes(5 * 1024 * 1024)
///     .max_entries(500)
///     .default_ttl(Duration::from_secs(30 * 60))
///     .build();
/// assert_eq!(config.max_entries, 500);
/// ```
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_size_bytes(mut self, bytes: u64) -> Self {
        self.config.max_size_bytes = bytes;
        self
    }

    pub fn max_entries(mut self, entries: u64) -> Self {
        self.config.max_entries = entries;
        self
    }

    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.config.default_ttl = ttl;
        self
    }

    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.config.cleanup_interval = interval;
        self
    }

    pub fn eviction_enabled(mut self, enabled: bool) -> Self {
        self.config.eviction_enabled = enabled;
        self
    }

    pub fn frequency_weight(mut self, weight: Duration) -> Self {
        self.config.frequency_weight = weight;
        self
    }

    pub fn build(self) -> CacheConfig {
        self.config
    }
}
