use cachet::{CacheConfig, CacheRegistry, Clock, JsonSize, MockClock};
use serial_test::serial;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn fast_reaping() -> CacheConfig {
    CacheConfig::builder()
        .cleanup_interval(Duration::from_millis(10))
        .build()
}

async fn wait_for<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn test_reaper_purges_expired_entries() {
    let clock = MockClock::new();
    let registry = CacheRegistry::with_clock(fast_reaping(), clock.clone());
    let cache = registry.manager::<String, JsonSize>("sessions", None).unwrap();

    cache
        .set("s1", "token".to_string(), Some(Duration::from_secs(30)), Default::default())
        .unwrap();
    cache
        .set("s2", "token".to_string(), Some(Duration::from_secs(300)), Default::default())
        .unwrap();

    clock.advance(Duration::from_secs(30));

    assert!(wait_for(|| cache.len() == 1).await);
    let stats = cache.stats();
    assert_eq!(stats.expirations, 1);
    assert!(stats.last_purge_at.is_some());
    assert_eq!(cache.keys(), vec!["s2".to_string()]);

    registry.shutdown().await;
}

/// Mock clock that can stall the next caller of `now()`.
///
/// Managers read the clock while holding their lock, so a stalled call keeps
/// the manager busy for the duration of the stall.
#[derive(Clone, Default)]
struct StallingClock {
    inner: MockClock,
    stall_next: Arc<AtomicBool>,
    holding: Arc<AtomicBool>,
    released: Arc<AtomicBool>,
}

impl Clock for StallingClock {
    fn now(&self) -> Instant {
        if self.stall_next.swap(false, Ordering::SeqCst) {
            self.holding.store(true, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(200));
            self.released.store(true, Ordering::SeqCst);
        }
        self.inner.now()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn test_tick_waits_for_busy_manager() {
    let clock = StallingClock::default();
    let config = CacheConfig::builder()
        .cleanup_interval(Duration::from_millis(50))
        .build();
    let registry = CacheRegistry::with_clock(config, clock.clone());
    let cache = registry.manager::<u32, JsonSize>("busy", None).unwrap();

    cache
        .set("stale", 1, Some(Duration::from_secs(1)), Default::default())
        .unwrap();
    cache.insert("fresh", 2).unwrap();
    clock.inner.advance(Duration::from_secs(1));

    clock.stall_next.store(true, Ordering::SeqCst);
    let holder = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || cache.contains("fresh"))
    };
    assert!(wait_for(|| clock.holding.load(Ordering::SeqCst)).await);

    // The first tick falls due while "fresh" is being looked up.
    assert!(
        wait_for(|| clock.released.load(Ordering::SeqCst) && cache.stats().expirations == 1).await
    );
    assert!(holder.join().unwrap());
    assert!(cache.stats().last_purge_at.is_some());
    assert_eq!(cache.keys(), vec!["fresh".to_string()]);

    registry.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn test_no_ticks_after_shutdown() {
    let clock = MockClock::new();
    let registry = CacheRegistry::with_clock(fast_reaping(), clock.clone());
    let cache = registry.manager::<u32, JsonSize>("a", None).unwrap();

    assert!(wait_for(|| cache.stats().last_purge_at.is_some()).await);
    registry.shutdown().await;

    let last = cache.stats().last_purge_at;
    clock.advance(Duration::from_secs(1));
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(cache.stats().last_purge_at, last);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn test_zero_interval_disables_reaper() {
    let clock = MockClock::new();
    let registry = CacheRegistry::with_clock(fast_reaping(), clock.clone());
    let config = CacheConfig::builder()
        .cleanup_interval(Duration::ZERO)
        .build();
    let cache = registry.manager::<u32, JsonSize>("manual", Some(config)).unwrap();
    cache
        .set("k", 1, Some(Duration::from_secs(1)), Default::default())
        .unwrap();
    clock.advance(Duration::from_secs(2));

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(cache.stats().last_purge_at, None);
    assert_eq!(cache.len(), 1);

    assert_eq!(registry.cleanup_all(), 1);
    registry.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn test_removed_namespace_is_no_longer_reaped() {
    let clock = MockClock::new();
    let registry = CacheRegistry::with_clock(fast_reaping(), clock.clone());
    let cache = registry.manager::<u32, JsonSize>("a", None).unwrap();
    assert!(wait_for(|| cache.stats().last_purge_at.is_some()).await);

    assert!(registry.remove_namespace("a").await);
    let last = cache.stats().last_purge_at;
    clock.advance(Duration::from_secs(1));
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(cache.stats().last_purge_at, last);

    registry.shutdown().await;
}

#[test]
#[serial]
fn test_reaper_started_late_on_explicit_runtime() {
    let clock = MockClock::new();
    let registry = CacheRegistry::with_clock(fast_reaping(), clock.clone());
    let cache = registry.manager::<u32, JsonSize>("late", None).unwrap();
    cache
        .set("k", 1, Some(Duration::from_secs(1)), Default::default())
        .unwrap();
    clock.advance(Duration::from_secs(1));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap();
    registry.start_reaper_on(runtime.handle().clone()).unwrap();

    runtime.block_on(async {
        assert!(wait_for(|| cache.is_empty()).await);
        registry.shutdown().await;
    });
    assert_eq!(cache.stats().expirations, 1);
}
