use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::persistence::{ExportedEntry, ImportFailure, ImportReport};
use crate::size::{JsonSize, SizeEstimator};
use crate::stats::Counters;
use crate::{CacheConfig, CacheEntry, CacheError, CacheResult, CacheStats, Clock, SystemClock};

/// One bounded, namespaced cache.
///
/// A `CacheManager` owns its entries exclusively and enforces two budgets at
/// once: the sum of measured value sizes (`max_size_bytes`) and the number of
/// entries (`max_entries`). When an insert does not fit, expired entries are
/// dropped first and then, if eviction is enabled, live entries are evicted in
/// [`crate::EvictionPolicy`] order until both budgets hold.
///
/// # Type Parameters
///
/// * `V` - The cached payload; reads hand out clones
/// * `S` - The [`SizeEstimator`] measuring each value once at insertion
/// * `C` - The [`Clock`] used for TTLs and recency scores
///
/// # Thread Safety
///
/// All state sits behind a single `parking_lot::Mutex`, so every operation is
/// linearizable and `stats().size_bytes` always equals the sum of the stored
/// entries' sizes. Values are measured before the lock is taken. Separate
/// managers never contend with each other.
///
/// # Examples
///
/// ```
/// use cachet_core::{tag_set, CacheConfig, CacheManager};
/// use std::time::Duration;
///
/// let cache: CacheManager<String> = CacheManager::new("completions", CacheConfig::default());
///
/// cache
///     .set("prompt:1", "Hello!".to_string(), Some(Duration::from_secs(60)), tag_set(["ai"]))
///     .unwrap();
/// assert_eq!(cache.get("prompt:1"), Some("Hello!".to_string()));
/// assert_eq!(cache.get("prompt:2"), None);
///
/// let stats = cache.stats();
/// assert_eq!((stats.hits, stats.misses), (1, 1));
/// assert_eq!(stats.size_bytes, 8); // "Hello!" as JSON
/// ```
pub struct CacheManager<V, S = JsonSize, C = SystemClock> {
    name: String,
    state: Mutex<CacheState<V>>,
    counters: Counters,
    sizer: S,
    clock: C,
    epoch: Instant,
}

struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    size_bytes: u64,
    config: CacheConfig,
    last_purge_at: Option<Instant>,
}

impl<V> CacheState<V> {
    fn remove(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.size_bytes -= entry.size_bytes;
        Some(entry)
    }

    fn store(&mut self, key: String, entry: CacheEntry<V>) {
        self.size_bytes += entry.size_bytes;
        if let Some(old) = self.entries.insert(key, entry) {
            self.size_bytes -= old.size_bytes;
        }
    }

    fn within_budget(&self, additional_bytes: u64, additional_entries: u64) -> bool {
        self.size_bytes.saturating_add(additional_bytes) <= self.config.max_size_bytes
            && (self.entries.len() as u64).saturating_add(additional_entries)
                <= self.config.max_entries
    }

    fn remove_expired(&mut self, now: Instant) -> u64 {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.remove(key);
        }
        expired.len() as u64
    }

    fn capacity_error(&self, required_bytes: u64) -> CacheError {
        CacheError::CapacityExceeded {
            required_bytes,
            used_bytes: self.size_bytes,
            max_size_bytes: self.config.max_size_bytes,
            entries: self.entries.len() as u64,
            max_entries: self.config.max_entries,
        }
    }
}

impl<V> CacheManager<V> {
    /// Creates a manager measuring values as JSON and using the system clock.
    pub fn new(name: impl Into<String>, config: CacheConfig) -> Self {
        Self::with_clock(name, config, JsonSize, SystemClock)
    }
}

impl<V, S> CacheManager<V, S> {
    /// Creates a manager with a custom size strategy.
    pub fn with_sizer(name: impl Into<String>, config: CacheConfig, sizer: S) -> Self {
        Self::with_clock(name, config, sizer, SystemClock)
    }
}

impl<V, S, C: Clock> CacheManager<V, S, C> {
    /// Creates a manager with a custom size strategy and time source.
    ///
    /// The clock's current instant becomes the manager's epoch, the origin of
    /// every eviction score.
    pub fn with_clock(name: impl Into<String>, config: CacheConfig, sizer: S, clock: C) -> Self {
        let epoch = clock.now();
        Self {
            name: name.into(),
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                size_bytes: 0,
                config,
                last_purge_at: None,
            }),
            counters: Counters::default(),
            sizer,
            clock,
            epoch,
        }
    }

    /// Namespace this cache was created for.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if `key` is present and live.
    ///
    /// An expired entry found here is removed, but hit/miss counters and the
    /// entry's access metadata are left untouched.
    pub fn contains(&self, key: &str) -> bool {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let now = self.clock.now();

        let expired = match state.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => return false,
        };
        if expired {
            state.remove(key);
            self.counters.record_expirations(1);
            debug!(cache = %self.name, key, "expired entry dropped on contains");
        }
        !expired
    }

    /// Removes `key`, returning true if a live entry was removed.
    ///
    /// An expired entry is removed as well but reported as absent.
    pub fn delete(&self, key: &str) -> bool {
        let mut state = self.state.lock();
        let now = self.clock.now();

        match state.remove(key) {
            Some(entry) if entry.is_expired(now) => {
                self.counters.record_expirations(1);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Removes every entry carrying `tag` and returns how many live entries
    /// were removed.
    ///
    /// This is a full scan. Expired entries carrying the tag are dropped too
    /// but are not part of the returned count.
    pub fn delete_by_tag(&self, tag: &str) -> u64 {
        let mut state = self.state.lock();
        let now = self.clock.now();

        let tagged: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.has_tag(tag))
            .map(|(key, _)| key.clone())
            .collect();

        let mut removed = 0u64;
        let mut expired = 0u64;
        for key in &tagged {
            if let Some(entry) = state.remove(key) {
                if entry.is_expired(now) {
                    expired += 1;
                } else {
                    removed += 1;
                }
            }
        }
        self.counters.record_expirations(expired);

        debug!(cache = %self.name, tag, removed, expired, "invalidated entries by tag");
        removed
    }

    /// Removes all expired entries and records the purge time.
    pub fn purge_expired(&self) -> u64 {
        let mut state = self.state.lock();
        let now = self.clock.now();

        let purged = state.remove_expired(now);
        state.last_purge_at = Some(now);
        self.counters.record_expirations(purged);

        if purged > 0 {
            debug!(cache = %self.name, purged, remaining = state.entries.len(), "purged expired entries");
        }
        purged
    }

    /// Drops every entry. Lifetime counters are kept.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        if state.entries.is_empty() {
            return;
        }
        let dropped = state.entries.len();
        state.entries.clear();
        state.size_bytes = 0;
        debug!(cache = %self.name, dropped, "cache cleared");
    }

    /// Point-in-time snapshot of usage and lifetime counters.
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        self.counters.snapshot(
            state.size_bytes,
            state.entries.len() as u64,
            state.last_purge_at,
        )
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// True when no entries are stored, expired or not.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live keys in ascending order.
    pub fn keys(&self) -> Vec<String> {
        let state = self.state.lock();
        let now = self.clock.now();
        let mut keys: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Copy of the current configuration.
    pub fn config(&self) -> CacheConfig {
        self.state.lock().config.clone()
    }

    /// Replaces the configuration.
    ///
    /// With eviction enabled, the new budgets are enforced immediately; with
    /// eviction disabled, existing entries stay and only later inserts are
    /// checked against the new limits.
    pub fn update_config(&self, config: CacheConfig) {
        let mut state = self.state.lock();
        let now = self.clock.now();

        info!(
            cache = %self.name,
            max_size_bytes = config.max_size_bytes,
            max_entries = config.max_entries,
            eviction_enabled = config.eviction_enabled,
            "cache config updated"
        );
        state.config = config;

        if state.config.eviction_enabled {
            if let Err(err) = self.ensure_capacity(&mut state, 0, 0, now) {
                warn!(cache = %self.name, error = %err, "could not enforce new budgets");
            }
        }
    }

    /// Makes room for `additional_bytes` spread over `additional_entries` new
    /// entries.
    fn ensure_capacity(
        &self,
        state: &mut CacheState<V>,
        additional_bytes: u64,
        additional_entries: u64,
        now: Instant,
    ) -> CacheResult<()> {
        if state.within_budget(additional_bytes, additional_entries) {
            return Ok(());
        }

        let expired = state.remove_expired(now);
        if expired > 0 {
            self.counters.record_expirations(expired);
            debug!(cache = %self.name, expired, "dropped expired entries to make room");
            if state.within_budget(additional_bytes, additional_entries) {
                return Ok(());
            }
        }

        if !state.config.eviction_enabled || additional_entries > state.config.max_entries {
            return Err(state.capacity_error(additional_bytes));
        }

        let victims: Vec<String> = state
            .config
            .eviction_policy()
            .eviction_order(&state.entries, self.epoch)
            .into_iter()
            .map(str::to_owned)
            .collect();

        for key in victims {
            if let Some(entry) = state.remove(&key) {
                self.counters.record_eviction();
                debug!(
                    cache = %self.name,
                    key = %key,
                    size_bytes = entry.size_bytes,
                    access_count = entry.access_count,
                    "evicted entry"
                );
            }
            if state.within_budget(additional_bytes, additional_entries) {
                return Ok(());
            }
        }

        Err(state.capacity_error(additional_bytes))
    }
}

impl<V, S, C> CacheManager<V, S, C>
where
    V: Clone,
    S: SizeEstimator<V>,
    C: Clock,
{
    /// Stores `value` under `key`.
    ///
    /// The value is measured once through the size strategy. `ttl` defaults to
    /// the configured `default_ttl`. Replacing an existing key is atomic: if
    /// the new value cannot be stored, the previous one is kept.
    ///
    /// # Errors
    ///
    /// * [`CacheError::SerializationFailure`] - the value could not be measured
    /// * [`CacheError::InvalidTtl`] - the TTL is zero or overflows
    /// * [`CacheError::ValueTooLarge`] - the value alone exceeds `max_size_bytes`
    /// * [`CacheError::CapacityExceeded`] - no room and eviction is disabled
    pub fn set(
        &self,
        key: impl Into<String>,
        value: V,
        ttl: Option<Duration>,
        tags: BTreeSet<String>,
    ) -> CacheResult<()> {
        let key = key.into();
        let size_bytes = self.sizer.size_of(&value)?;

        let mut guard = self.state.lock();
        let state = &mut *guard;
        let now = self.clock.now();

        let ttl = ttl.unwrap_or(state.config.default_ttl);
        if ttl.is_zero() {
            return Err(CacheError::InvalidTtl { ttl });
        }
        let expires_at = now
            .checked_add(ttl)
            .ok_or(CacheError::InvalidTtl { ttl })?;

        if size_bytes > state.config.max_size_bytes {
            return Err(CacheError::ValueTooLarge {
                size_bytes,
                max_size_bytes: state.config.max_size_bytes,
            });
        }

        let previous = state.remove(&key);
        if let Err(err) = self.ensure_capacity(state, size_bytes, 1, now) {
            match previous {
                Some(old) if !old.is_expired(now) => state.store(key, old),
                Some(_) => self.counters.record_expirations(1),
                None => {}
            }
            debug!(cache = %self.name, error = %err, "insert rejected");
            return Err(err);
        }

        state.store(key, CacheEntry::new(value, size_bytes, tags, now, expires_at));
        Ok(())
    }

    /// Stores `value` with the default TTL and no tags.
    pub fn insert(&self, key: impl Into<String>, value: V) -> CacheResult<()> {
        self.set(key, value, None, BTreeSet::new())
    }

    /// Returns a clone of the live value under `key`.
    ///
    /// A hit bumps the entry's access count and recency. An absent or expired
    /// key is a miss; an expired entry is removed on the way.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let now = self.clock.now();

        if let Some(entry) = state.entries.get_mut(key) {
            if !entry.is_expired(now) {
                entry.record_access(now);
                self.counters.record_hit();
                return Some(entry.value.clone());
            }
        }

        if state.remove(key).is_some() {
            self.counters.record_expirations(1);
            debug!(cache = %self.name, key, "expired entry dropped on read");
        }
        self.counters.record_miss();
        None
    }

    /// Snapshots every live entry, sorted by key, with its remaining TTL.
    pub fn export(&self) -> Vec<ExportedEntry<V>> {
        let state = self.state.lock();
        let now = self.clock.now();

        let mut exported: Vec<ExportedEntry<V>> = state
            .entries
            .iter()
            .filter_map(|(key, entry)| {
                entry.remaining_ttl(now).map(|remaining_ttl| ExportedEntry {
                    key: key.clone(),
                    value: entry.value.clone(),
                    remaining_ttl,
                    tags: entry.tags.clone(),
                })
            })
            .collect();
        exported.sort_unstable_by(|a, b| a.key.cmp(&b.key));
        exported
    }

    /// Replays exported entries through [`set`](Self::set).
    ///
    /// Each entry succeeds or fails on its own; failures are collected in the
    /// report and the rest of the batch still runs.
    pub fn import<I>(&self, entries: I) -> ImportReport
    where
        I: IntoIterator<Item = ExportedEntry<V>>,
    {
        let mut report = ImportReport::default();
        for ExportedEntry {
            key,
            value,
            remaining_ttl,
            tags,
        } in entries
        {
            match self.set(key.clone(), value, Some(remaining_ttl), tags) {
                Ok(()) => report.imported += 1,
                Err(error) => {
                    warn!(cache = %self.name, key = %key, error = %error, "failed to import entry");
                    report.failures.push(ImportFailure { key, error });
                }
            }
        }

        debug!(
            cache = %self.name,
            imported = report.imported,
            failed = report.failures.len(),
            "import finished"
        );
        report
    }
}

impl<V, S, C> fmt::Debug for CacheManager<V, S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CacheManager")
            .field("name", &self.name)
            .field("entries", &state.entries.len())
            .field("size_bytes", &state.size_bytes)
            .finish_non_exhaustive()
    }
}
