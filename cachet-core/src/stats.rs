use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Point-in-time snapshot of one cache's statistics.
///
/// `hits`, `misses`, `evictions` and `expirations` are lifetime counters and
/// survive [`crate::CacheManager::clear`]; `size_bytes` and `entries` describe
/// the current contents.
///
/// # Examples
///
/// ```
/// use cachet_core::CacheStats;
///
/// let stats = CacheStats { hits: 2, misses: 1, ..Default::default() };
/// assert_eq!(stats.total_accesses(), 3);
/// assert!((stats.hit_rate() - 0.6666).abs() < 0.001);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size_bytes: u64,
    pub entries: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub last_purge_at: Option<Instant>,
}

impl CacheStats {
    /// Total number of reads (hits + misses).
    #[inline]
    pub fn total_accesses(&self) -> u64 {
        self.hits.saturating_add(self.misses)
    }

    /// Fraction of reads that were hits, 0.0 when nothing was read.
    #[inline]
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_accesses();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    #[inline]
    pub fn miss_rate(&self) -> f64 {
        1.0 - self.hit_rate()
    }
}

/// Lifetime counters shared by the manager's read and write paths.
///
/// Every update happens under the manager lock, so `Relaxed` ordering is
/// sufficient.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl Counters {
    #[inline]
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_expirations(&self, count: u64) {
        if count > 0 {
            self.expirations.fetch_add(count, Ordering::Relaxed);
        }
    }

    /// Builds a snapshot from the counters plus the caller-supplied current
    /// contents.
    pub(crate) fn snapshot(
        &self,
        size_bytes: u64,
        entries: u64,
        last_purge_at: Option<Instant>,
    ) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size_bytes,
            entries,
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            last_purge_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_snapshot() {
        let stats = Counters::default().snapshot(0, 0, None);
        assert_eq!(stats, CacheStats::default());
    }

    #[test]
    fn test_record_operations() {
        let counters = Counters::default();
        counters.record_hit();
        counters.record_hit();
        counters.record_miss();
        counters.record_eviction();
        counters.record_expirations(3);
        counters.record_expirations(0);

        let stats = counters.snapshot(128, 2, None);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.expirations, 3);
        assert_eq!(stats.size_bytes, 128);
        assert_eq!(stats.entries, 2);
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 1e-10);
        assert!((stats.miss_rate() - 0.2).abs() < 1e-10);
        assert_eq!(stats.total_accesses(), 100);
    }

    #[test]
    fn test_hit_rate_no_accesses() {
        let stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
        assert_eq!(stats.miss_rate(), 1.0);
    }

    #[test]
    fn test_concurrent_counters() {
        use std::sync::Arc;
        use std::thread;

        let counters = Arc::new(Counters::default());
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let counters = Arc::clone(&counters);
                thread::spawn(move || {
                    for _ in 0..100 {
                        counters.record_hit();
                    }
                    for _ in 0..50 {
                        counters.record_miss();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let stats = counters.snapshot(0, 0, None);
        assert_eq!(stats.hits, 1000);
        assert_eq!(stats.misses, 500);
    }
}
