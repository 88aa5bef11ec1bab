use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::CacheEntry;

/// Default weight of one recorded access in the replacement score.
///
/// One read is worth one second of recency: recency dominates, frequency breaks
/// near-ties.
pub const DEFAULT_FREQUENCY_WEIGHT: Duration = Duration::from_millis(1000);

/// Replacement scoring used when a cache must make room.
///
/// Every entry gets a score
///
/// ```text
/// score = millis(last_accessed_at - epoch) + access_count * millis(frequency_weight)
/// ```
///
/// where `epoch` is the creation instant of the owning manager. Entries are
/// evicted in ascending `(score, key)` order, so the ordering is a total order:
/// two entries with identical recency and frequency are separated by key, the
/// lexicographically smaller key going first.
///
/// The policy is a pure function of the entries it is given; it never touches
/// the cache.
///
/// # Examples
///
/// ```
/// use cachet_core::{CacheEntry, EvictionPolicy};
/// use std::collections::{BTreeSet, HashMap};
/// use std::time::{Duration, Instant};
///
/// let epoch = Instant::now();
/// let ttl = Duration::from_secs(60);
/// let mut entries = HashMap::new();
/// entries.insert("b".to_string(), CacheEntry::new(1, 1, BTreeSet::new(), epoch, epoch + ttl));
/// entries.insert("a".to_string(), CacheEntry::new(2, 1, BTreeSet::new(), epoch, epoch + ttl));
///
/// let order = EvictionPolicy::default().eviction_order(&entries, epoch);
/// assert_eq!(order, vec!["a", "b"]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionPolicy {
    frequency_weight: Duration,
}

impl EvictionPolicy {
    /// Creates a policy where each access is worth `frequency_weight` of recency.
    pub const fn new(frequency_weight: Duration) -> Self {
        Self { frequency_weight }
    }

    pub fn frequency_weight(&self) -> Duration {
        self.frequency_weight
    }

    /// Replacement score of one entry; lower means evicted sooner.
    ///
    /// Both terms are whole milliseconds. Entries last touched within the same
    /// millisecond and with equal access counts tie, and the key decides.
    pub fn score<V>(&self, entry: &CacheEntry<V>, epoch: Instant) -> u128 {
        let recency = entry.last_accessed_at.saturating_duration_since(epoch).as_millis();
        let frequency =
            u128::from(entry.access_count).saturating_mul(self.frequency_weight.as_millis());
        recency.saturating_add(frequency)
    }

    /// Compares two keyed entries by `(score, key)`.
    pub fn compare<V>(
        &self,
        (key_a, a): (&str, &CacheEntry<V>),
        (key_b, b): (&str, &CacheEntry<V>),
        epoch: Instant,
    ) -> Ordering {
        self.score(a, epoch)
            .cmp(&self.score(b, epoch))
            .then_with(|| key_a.cmp(key_b))
    }

    /// Returns every key ordered from first-to-evict to last-to-evict.
    ///
    /// Scores are computed once per entry, so this is O(n log n).
    pub fn eviction_order<'a, V>(
        &self,
        entries: &'a HashMap<String, CacheEntry<V>>,
        epoch: Instant,
    ) -> Vec<&'a str> {
        let mut scored: Vec<(u128, &'a str)> = entries
            .iter()
            .map(|(key, entry)| (self.score(entry, epoch), key.as_str()))
            .collect();
        scored.sort_unstable();
        scored.into_iter().map(|(_, key)| key).collect()
    }
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_FREQUENCY_WEIGHT)
    }
}
