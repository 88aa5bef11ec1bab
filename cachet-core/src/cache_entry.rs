use std::collections::BTreeSet;
use std::time::{Duration, Instant};

/// A cached value together with the metadata the manager needs for expiry,
/// eviction scoring and size accounting.
///
/// Entries are owned exclusively by the [`crate::CacheManager`] map; callers
/// only ever receive clones of `value`.
///
/// # Fields
///
/// * `value` - The cached payload
/// * `created_at` - When the entry was inserted
/// * `expires_at` - Deadline after which the entry is dead (always `> created_at`)
/// * `last_accessed_at` - Last successful read, or `created_at` if never read
/// * `access_count` - Number of successful reads
/// * `size_bytes` - Measured once at insertion by the manager's size strategy
/// * `tags` - Labels for bulk invalidation
///
/// # Examples
///
/// ```
/// use cachet_core::CacheEntry;
/// use std::collections::BTreeSet;
/// use std::time::{Duration, Instant};
///
/// let now = Instant::now();
/// let entry = CacheEntry::new("data", 4, BTreeSet::new(), now, now + Duration::from_secs(60));
/// assert_eq!(entry.access_count, 0);
/// assert!(!entry.is_expired(now));
/// assert!(entry.is_expired(now + Duration::from_secs(60)));
/// ```
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub created_at: Instant,
    pub expires_at: Instant,
    pub last_accessed_at: Instant,
    pub access_count: u64,
    pub size_bytes: u64,
    pub tags: BTreeSet<String>,
}

impl<V> CacheEntry<V> {
    /// Creates a fresh entry. `last_accessed_at` starts at `created_at`.
    pub fn new(
        value: V,
        size_bytes: u64,
        tags: BTreeSet<String>,
        created_at: Instant,
        expires_at: Instant,
    ) -> Self {
        debug_assert!(expires_at > created_at);
        Self {
            value,
            created_at,
            expires_at,
            last_accessed_at: created_at,
            access_count: 0,
            size_bytes,
            tags,
        }
    }

    /// Returns true once `now` has reached the deadline.
    ///
    /// This is the only liveness comparison in the crate: reads, `contains`,
    /// purges, exports and capacity checks all go through it.
    #[inline]
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    /// Time left before expiry, or `None` if the entry is already dead.
    pub fn remaining_ttl(&self, now: Instant) -> Option<Duration> {
        if self.is_expired(now) {
            None
        } else {
            Some(self.expires_at.duration_since(now))
        }
    }

    /// Records a successful read.
    pub fn record_access(&mut self, now: Instant) {
        self.access_count = self.access_count.saturating_add(1);
        self.last_accessed_at = now;
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}
