//! Background expiry for a single cache.
//!
//! A [`Reaper`] is a Tokio task that calls a purge function on a fixed
//! period. It holds no cache state of its own: the registry hands it a closure
//! over the manager's `purge_expired`.
//!
//! # Scheduling
//!
//! - The first purge runs one full period after the reaper starts
//! - Each purge runs on the blocking pool and waits for the manager lock
//! - Ticks that fall due while a purge is running are coalesced, not queued
//! - Cancellation is observed between purges, never during one
//!
//! # Examples
//!
//! ```
//! use cachet::{CacheConfig, CacheManager, Reaper};
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let cache: Arc<CacheManager<String>> =
//!     Arc::new(CacheManager::new("sessions", CacheConfig::default()));
//!
//! let target = Arc::clone(&cache);
//! let reaper = Reaper::spawn(
//!     &tokio::runtime::Handle::current(),
//!     "sessions",
//!     Duration::from_millis(10),
//!     CancellationToken::new(),
//!     move || target.purge_expired(),
//! )
//! .unwrap();
//!
//! tokio::time::sleep(Duration::from_millis(30)).await;
//! reaper.stop().await;
//! assert!(cache.stats().last_purge_at.is_some());
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::{self, JoinHandle};
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Handle to a running purge loop.
///
/// Dropping the handle cancels the loop without waiting for it; use
/// [`stop`](Self::stop) to wait until the last purge has finished.
#[derive(Debug)]
pub struct Reaper {
    name: String,
    period: Duration,
    cancellation: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Reaper {
    /// Starts a purge loop on `runtime`.
    ///
    /// Returns `None` when `period` is zero, which disables reaping.
    /// `cancellation` may be a child of a wider token so that a registry can
    /// stop every reaper at once.
    pub fn spawn<F>(
        runtime: &Handle,
        name: impl Into<String>,
        period: Duration,
        cancellation: CancellationToken,
        purge: F,
    ) -> Option<Self>
    where
        F: Fn() -> u64 + Send + Sync + 'static,
    {
        if period.is_zero() {
            return None;
        }

        let name = name.into();
        let handle = runtime.spawn(Self::run(
            name.clone(),
            period,
            cancellation.clone(),
            Arc::new(purge),
        ));

        info!(cache = %name, period_ms = period.as_millis() as u64, "reaper started");

        Some(Self {
            name,
            period,
            cancellation,
            handle: Some(handle),
        })
    }

    async fn run<F>(name: String, period: Duration, cancellation: CancellationToken, purge: Arc<F>)
    where
        F: Fn() -> u64 + Send + Sync + 'static,
    {
        let mut ticker = time::interval_at(time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = cancellation.cancelled() => {
                    debug!(cache = %name, "reaper loop cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    let purge = Arc::clone(&purge);
                    match task::spawn_blocking(move || purge()).await {
                        Ok(0) => {}
                        Ok(purged) => debug!(cache = %name, purged, "reaper purged expired entries"),
                        Err(err) => warn!(cache = %name, error = %err, "reaper purge failed"),
                    }
                }
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// True while the loop task has not finished.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Requests cancellation without waiting.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Cancels the loop and waits for it to exit.
    ///
    /// A purge that is already running completes first. Once this returns, no
    /// further purge will start.
    pub async fn stop(mut self) {
        self.cancellation.cancel();

        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                warn!(cache = %self.name, error = %err, "reaper task ended abnormally");
            }
        }

        info!(cache = %self.name, "reaper stopped");
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        if self.handle.is_some() && !self.cancellation.is_cancelled() {
            debug!(cache = %self.name, "reaper dropped while running; cancelling");
            self.cancellation.cancel();
        }
    }
}
