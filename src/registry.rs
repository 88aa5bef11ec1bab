//! Named collection of independently configured caches.
//!
//! The host builds one [`CacheRegistry`], wraps it in an `Arc` and passes it
//! to whoever needs a cache. Each namespace maps to its own
//! [`CacheManager`], created lazily on first use with either a caller-supplied
//! [`CacheConfig`] or the registry default, and gets its own [`Reaper`] when a
//! Tokio runtime is available.
//!
//! Namespaces may cache different payload types. The registry keeps each
//! manager behind the object-safe [`ManagedCache`] trait for fan-out
//! operations and hands out typed `Arc<CacheManager<..>>` handles on request.

use std::any::{type_name, Any};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cachet_core::{CacheConfig, CacheManager, CacheStats, Clock, SizeEstimator, SystemClock};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{RegistryError, RegistryResult};
use crate::reaper::Reaper;

/// Type-erased view of a cache used by registry-wide operations.
pub trait ManagedCache: Send + Sync {
    fn name(&self) -> &str;
    fn purge_expired(&self) -> u64;
    fn clear(&self);
    fn delete_by_tag(&self, tag: &str) -> u64;
    fn stats(&self) -> CacheStats;
    fn config(&self) -> CacheConfig;
}

impl<V, S, C> ManagedCache for CacheManager<V, S, C>
where
    V: Send,
    S: Send + Sync,
    C: Clock,
{
    fn name(&self) -> &str {
        CacheManager::name(self)
    }

    fn purge_expired(&self) -> u64 {
        CacheManager::purge_expired(self)
    }

    fn clear(&self) {
        CacheManager::clear(self)
    }

    fn delete_by_tag(&self, tag: &str) -> u64 {
        CacheManager::delete_by_tag(self, tag)
    }

    fn stats(&self) -> CacheStats {
        CacheManager::stats(self)
    }

    fn config(&self) -> CacheConfig {
        CacheManager::config(self)
    }
}

struct Namespace {
    cache: Arc<dyn ManagedCache>,
    typed: Arc<dyn Any + Send + Sync>,
    reaper: Option<Reaper>,
}

/// Registry of namespaced caches.
///
/// # Lifecycle
///
/// - [`manager`](Self::manager) creates a namespace on first use; its config
///   is fixed for the manager's lifetime
/// - [`recreate`](Self::recreate) replaces a namespace with a fresh manager
/// - [`shutdown`](Self::shutdown) stops every reaper and clears every cache;
///   afterwards no namespace can be created
///
/// Dropping the registry cancels all reapers without waiting for them.
///
/// # Examples
///
/// ```
/// use cachet::{tag_set, CacheConfig, CacheRegistry, JsonSize};
///
/// let registry = CacheRegistry::new(CacheConfig::default());
///
/// let responses = registry.manager::<String, JsonSize>("ai-responses", None).unwrap();
/// responses
///     .set("prompt:1", "Hi!".to_string(), None, tag_set(["model:small"]))
///     .unwrap();
///
/// let small = CacheConfig::builder().max_entries(100).build();
/// let settings = registry.manager::<u32, JsonSize>("settings", Some(small)).unwrap();
/// settings.insert("retries", 3).unwrap();
///
/// assert_eq!(registry.namespaces(), vec!["ai-responses", "settings"]);
/// assert_eq!(registry.delete_by_tag_all("model:small"), 1);
/// ```
pub struct CacheRegistry<C = SystemClock> {
    namespaces: DashMap<String, Namespace>,
    default_config: CacheConfig,
    clock: C,
    runtime: Mutex<Option<Handle>>,
    cancellation: CancellationToken,
    shutdown_lock: tokio::sync::Mutex<()>,
    shut_down: AtomicBool,
}

impl CacheRegistry {
    /// Creates a registry on the system clock.
    ///
    /// If called inside a Tokio runtime, namespaces get reapers on that
    /// runtime; otherwise call [`start_reaper`](Self::start_reaper) later.
    pub fn new(default_config: CacheConfig) -> Self {
        Self::with_clock(default_config, SystemClock)
    }
}

impl<C> CacheRegistry<C>
where
    C: Clock + Clone + 'static,
{
    pub fn with_clock(default_config: CacheConfig, clock: C) -> Self {
        Self {
            namespaces: DashMap::new(),
            default_config,
            clock,
            runtime: Mutex::new(Handle::try_current().ok()),
            cancellation: CancellationToken::new(),
            shutdown_lock: tokio::sync::Mutex::new(()),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Config applied to namespaces created without one.
    pub fn default_config(&self) -> &CacheConfig {
        &self.default_config
    }

    /// Returns the manager for `namespace`, creating it if needed.
    ///
    /// `config` is only used when the namespace is created; an existing
    /// manager keeps the config it was built with.
    ///
    /// # Errors
    ///
    /// * [`RegistryError::NamespaceTypeMismatch`] - the namespace exists with
    ///   another payload or size strategy type
    /// * [`RegistryError::ShutDown`] - the registry was shut down
    pub fn manager<V, S>(
        &self,
        namespace: &str,
        config: Option<CacheConfig>,
    ) -> RegistryResult<Arc<CacheManager<V, S, C>>>
    where
        V: Send + 'static,
        S: SizeEstimator<V> + Default + Send + Sync + 'static,
    {
        self.manager_with_sizer(namespace, config, S::default())
    }

    /// Like [`manager`](Self::manager) with an explicit size strategy, for
    /// strategies without a `Default`.
    pub fn manager_with_sizer<V, S>(
        &self,
        namespace: &str,
        config: Option<CacheConfig>,
        sizer: S,
    ) -> RegistryResult<Arc<CacheManager<V, S, C>>>
    where
        V: Send + 'static,
        S: SizeEstimator<V> + Send + Sync + 'static,
    {
        if self.is_shut_down() {
            return Err(RegistryError::ShutDown);
        }

        match self.namespaces.entry(namespace.to_string()) {
            Entry::Occupied(slot) => Arc::clone(&slot.get().typed)
                .downcast::<CacheManager<V, S, C>>()
                .map_err(|_| RegistryError::NamespaceTypeMismatch {
                    namespace: namespace.to_string(),
                    expected: type_name::<CacheManager<V, S, C>>(),
                }),
            Entry::Vacant(slot) => {
                let config = config.unwrap_or_else(|| self.default_config.clone());
                info!(
                    namespace,
                    max_size_bytes = config.max_size_bytes,
                    max_entries = config.max_entries,
                    "creating cache namespace"
                );

                let manager = Arc::new(CacheManager::with_clock(
                    namespace,
                    config,
                    sizer,
                    self.clock.clone(),
                ));
                let cache: Arc<dyn ManagedCache> = manager.clone();
                let reaper = self.spawn_reaper(&cache);

                slot.insert(Namespace {
                    cache,
                    typed: manager.clone(),
                    reaper,
                });
                Ok(manager)
            }
        }
    }

    fn spawn_reaper(&self, cache: &Arc<dyn ManagedCache>) -> Option<Reaper> {
        let runtime = self.runtime.lock().clone()?;
        let target = Arc::clone(cache);
        Reaper::spawn(
            &runtime,
            cache.name(),
            cache.config().cleanup_interval,
            self.cancellation.child_token(),
            move || target.purge_expired(),
        )
    }

    /// Attaches the current Tokio runtime and starts reapers for every
    /// namespace that lacks one.
    ///
    /// # Errors
    ///
    /// * [`RegistryError::NoRuntime`] - not called from within a runtime
    /// * [`RegistryError::ShutDown`] - the registry was shut down
    pub fn start_reaper(&self) -> RegistryResult<()> {
        let runtime = Handle::try_current().map_err(|_| RegistryError::NoRuntime)?;
        self.start_reaper_on(runtime)
    }

    /// Same as [`start_reaper`](Self::start_reaper) with an explicit runtime.
    pub fn start_reaper_on(&self, runtime: Handle) -> RegistryResult<()> {
        if self.is_shut_down() {
            return Err(RegistryError::ShutDown);
        }
        *self.runtime.lock() = Some(runtime);

        let mut started = 0usize;
        for mut slot in self.namespaces.iter_mut() {
            if slot.reaper.is_none() {
                let reaper = self.spawn_reaper(&slot.cache);
                started += usize::from(reaper.is_some());
                slot.reaper = reaper;
            }
        }

        debug!(started, "reapers attached to runtime");
        Ok(())
    }

    fn caches(&self) -> Vec<Arc<dyn ManagedCache>> {
        self.namespaces
            .iter()
            .map(|slot| Arc::clone(&slot.cache))
            .collect()
    }

    /// Purges expired entries in every namespace; returns the total removed.
    pub fn cleanup_all(&self) -> u64 {
        let purged: u64 = self.caches().iter().map(|cache| cache.purge_expired()).sum();
        debug!(purged, "purged all namespaces");
        purged
    }

    /// Empties every namespace. Managers and their counters survive.
    pub fn clear_all(&self) {
        for cache in self.caches() {
            cache.clear();
        }
    }

    /// Statistics per namespace, keyed by namespace name.
    pub fn stats_all(&self) -> BTreeMap<String, CacheStats> {
        self.caches()
            .into_iter()
            .map(|cache| (cache.name().to_string(), cache.stats()))
            .collect()
    }

    /// Invalidates `tag` in every namespace; returns the total of live
    /// entries removed.
    pub fn delete_by_tag_all(&self, tag: &str) -> u64 {
        self.caches()
            .iter()
            .map(|cache| cache.delete_by_tag(tag))
            .sum()
    }

    /// Namespace names in ascending order.
    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .namespaces
            .iter()
            .map(|slot| slot.key().clone())
            .collect();
        names.sort_unstable();
        names
    }

    pub fn contains_namespace(&self, namespace: &str) -> bool {
        self.namespaces.contains_key(namespace)
    }

    /// Removes a namespace: stops its reaper, then clears its manager.
    ///
    /// Handles obtained earlier keep working but are no longer reaped or
    /// reachable through the registry. Returns false if the namespace did not
    /// exist.
    pub async fn remove_namespace(&self, namespace: &str) -> bool {
        let Some((_, slot)) = self.namespaces.remove(namespace) else {
            return false;
        };

        if let Some(reaper) = slot.reaper {
            reaper.stop().await;
        }
        slot.cache.clear();

        info!(namespace, "cache namespace removed");
        true
    }

    /// Replaces `namespace` with a fresh manager built from `config`.
    pub async fn recreate<V, S>(
        &self,
        namespace: &str,
        config: CacheConfig,
    ) -> RegistryResult<Arc<CacheManager<V, S, C>>>
    where
        V: Send + 'static,
        S: SizeEstimator<V> + Default + Send + Sync + 'static,
    {
        self.remove_namespace(namespace).await;
        self.manager(namespace, Some(config))
    }

    /// Stops every reaper and clears every manager.
    ///
    /// Idempotent. When this returns, no purge is running and none will start.
    pub async fn shutdown(&self) {
        let _guard = self.shutdown_lock.lock().await;
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }

        info!(namespaces = self.namespaces.len(), "shutting down cache registry");

        self.cancellation.cancel();
        self.runtime.lock().take();

        let reapers: Vec<Reaper> = self
            .namespaces
            .iter_mut()
            .filter_map(|mut slot| slot.reaper.take())
            .collect();
        for reaper in reapers {
            reaper.stop().await;
        }

        self.clear_all();
        info!("cache registry shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl<C> Drop for CacheRegistry<C> {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}

impl<C> std::fmt::Debug for CacheRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheRegistry")
            .field("namespaces", &self.namespaces.len())
            .field("shut_down", &self.shut_down.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
