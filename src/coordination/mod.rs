//! Stampede-safe cache coordination
//!
//! Versioned collection keys, a token-checked distributed lock, the
//! read-through coordinator and the write-side invalidator. All shared state
//! lives in the injected [`CacheStore`](crate::cache::CacheStore), so any
//! number of service instances can coordinate through the same backend.

mod config;
mod coordinator;
mod invalidator;
pub mod keys;
mod lock;

pub use config::CoordinatorConfig;
pub use coordinator::{CacheCoordinator, ReadSource};
pub use invalidator::Invalidator;
pub use lock::{DistributedLock, LockToken};

use crate::cache::CacheStoreError;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
  /// The version counter could not be read; no safe key can be derived
  #[error("version counter unavailable: {0}")]
  Version(#[source] CacheStoreError),
  #[error("store operation failed: {0:#}")]
  Store(anyhow::Error),
  /// The mutation succeeded but the cache could not be invalidated
  #[error("cache invalidation failed: {0}")]
  Invalidation(#[source] CacheStoreError),
  #[error("rebuild task failed: {0}")]
  Rebuild(#[from] tokio::task::JoinError),
}
