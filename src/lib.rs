//! # Cachet
//!
//! A namespaced, in-memory caching engine for values that are expensive to
//! produce: model provider responses, database reads, computed settings.
//!
//! ## Features
//!
//! - **Namespaces**: Independent caches with their own payload type, budgets and stats
//! - **Dual budgets**: Byte-size and entry-count limits, enforced on insert
//! - **TTL expiry**: Lazy on read, eager on a background reaper
//! - **Recency + frequency eviction**: Deterministic, tie-broken by key
//! - **Tag invalidation**: Per namespace or across the whole registry
//! - **Persistence bridge**: Export/import with remaining TTLs
//!
//! ## Quick Start
//!
//! The cache is cache-aside: the caller looks up, computes on a miss and
//! stores the result.
//!
//! ```rust
//! use cachet::{tag_set, CacheConfig, CacheRegistry, JsonSize};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! async fn ask_model(prompt: &str) -> String {
//!     format!("answer to {prompt}")
//! }
//!
//! let registry = CacheRegistry::new(CacheConfig::default());
//! let responses = registry
//!     .manager::<String, JsonSize>("ai-responses", None)
//!     .unwrap();
//!
//! let prompt = "what is a cache?";
//! let answer = match responses.get(prompt) {
//!     Some(hit) => hit,
//!     None => {
//!         let fresh = ask_model(prompt).await;
//!         responses
//!             .set(prompt, fresh.clone(), Some(Duration::from_secs(600)), tag_set(["model:small"]))
//!             .unwrap();
//!         fresh
//!     }
//! };
//!
//! assert_eq!(responses.get(prompt), Some(answer));
//! registry.shutdown().await;
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`registry`] - Namespace map and registry-wide operations
//! - [`reaper`] - Periodic, cancelable purge task
//! - The cache engine itself is re-exported from `cachet_core`
pub mod reaper;
pub mod registry;

mod error;

pub use cachet_core::*;

pub use error::{RegistryError, RegistryResult};
pub use reaper::Reaper;
pub use registry::{CacheRegistry, ManagedCache};
