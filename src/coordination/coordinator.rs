//! Read-through protocol with single-rebuilder election.
//!
//! ```text
//! CheckCache --hit--> Done
//!     |miss
//! AcquireLock --acquired--> Rebuild --> Done
//!     |busy
//!   Poll --cache appears--> Done
//!     |timeout
//!  Fallback --> Done
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;

use super::config::CoordinatorConfig;
use super::keys::{collection_key, item_key, version_key};
use super::lock::{DistributedLock, LockToken};
use super::CacheError;
use crate::cache::{CacheStore, CacheStoreError};

/// Which path of the protocol produced a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSource {
  /// Served from the current versioned snapshot
  Cache,
  /// This caller held the lock and rebuilt the snapshot
  Rebuilt,
  /// Another caller's rebuild appeared while polling
  Awaited,
  /// Loaded directly from the store without touching the cache
  Fallback,
}

impl ReadSource {
  pub fn as_str(&self) -> &'static str {
    match self {
      ReadSource::Cache => "HIT",
      ReadSource::Rebuilt => "REBUILT",
      ReadSource::Awaited => "AWAITED",
      ReadSource::Fallback => "FALLBACK",
    }
  }
}

#[derive(Clone)]
pub struct CacheCoordinator {
  store: Arc<dyn CacheStore>,
  lock: DistributedLock,
  config: Arc<CoordinatorConfig>,
}

impl CacheCoordinator {
  pub fn new(store: Arc<dyn CacheStore>, config: CoordinatorConfig) -> Self {
    Self {
      lock: DistributedLock::new(store.clone()),
      store,
      config: Arc::new(config),
    }
  }

  pub fn config(&self) -> &CoordinatorConfig {
    &self.config
  }

  /// Current collection version; a missing counter reads as 0.
  pub async fn current_version(&self) -> Result<i64, CacheError> {
    let raw = self
      .store
      .get(&version_key(&self.config.collection))
      .await
      .map_err(CacheError::Version)?;

    match raw {
      None => Ok(0),
      Some(bytes) => std::str::from_utf8(&bytes)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| {
          CacheError::Version(CacheStoreError::InvalidValue(
            "version counter is not an integer".to_string(),
          ))
        }),
    }
  }

  /// Collection snapshot through the cache, rebuilding at most once per miss window.
  pub async fn read_through<T, F, Fut>(&self, loader: F) -> Result<T, CacheError>
  where
    T: Serialize + DeserializeOwned + Send + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
  {
    self
      .read_through_traced(loader)
      .await
      .map(|(value, _)| value)
  }

  /// Like [`read_through`](Self::read_through), also reporting the path taken.
  pub async fn read_through_traced<T, F, Fut>(
    &self,
    loader: F,
  ) -> Result<(T, ReadSource), CacheError>
  where
    T: Serialize + DeserializeOwned + Send + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
  {
    let version = self.current_version().await?;
    let key = collection_key(&self.config.collection, version);
    if let Some(value) = self.lookup(&key).await {
      return Ok((value, ReadSource::Cache));
    }

    let acquired = self
      .lock
      .try_acquire(&self.config.lock_name, self.config.lock_ttl)
      .await;

    match acquired {
      Ok(Some(token)) => {
        // Detached so that dropping this caller cannot cancel the rebuild
        // or skip the release; waiters depend on its side effects.
        let this = self.clone();
        let value = tokio::spawn(async move { this.guarded_rebuild(token, loader).await }).await??;
        Ok((value, ReadSource::Rebuilt))
      }
      Ok(None) => self.await_rebuild(loader).await,
      Err(e) => {
        tracing::warn!(
          lock = %self.config.lock_name,
          error = %e,
          "rebuild lock unavailable, loading directly"
        );
        let value = loader().await.map_err(CacheError::Store)?;
        Ok((value, ReadSource::Fallback))
      }
    }
  }

  /// Single record through the cache. No lock: concurrent fills are idempotent.
  pub async fn read_by_id<T, Id, F, Fut>(&self, id: Id, loader: F) -> Result<Option<T>, CacheError>
  where
    T: Serialize + DeserializeOwned,
    Id: Display,
    F: FnOnce(Id) -> Fut,
    Fut: Future<Output = anyhow::Result<Option<T>>>,
  {
    let key = item_key(&self.config.collection, &id);
    if let Some(value) = self.lookup(&key).await {
      return Ok(Some(value));
    }

    let record = loader(id).await.map_err(CacheError::Store)?;
    if let Some(record) = &record {
      self.store_value(&key, record).await;
    }
    Ok(record)
  }

  /// Runs [`rebuild`](Self::rebuild) in its own task so that a panicking
  /// loader still leads to the lock being released.
  async fn guarded_rebuild<T, F, Fut>(self, token: LockToken, loader: F) -> Result<T, CacheError>
  where
    T: Serialize + Send + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
  {
    let this = self.clone();
    let held = token.clone();
    match tokio::spawn(async move { this.rebuild(held, loader).await }).await {
      Ok(result) => result,
      Err(e) => {
        tracing::error!(
          lock = %self.config.lock_name,
          error = %e,
          "rebuild task failed, releasing lock"
        );
        self.lock.release(&self.config.lock_name, &token).await;
        Err(CacheError::Rebuild(e))
      }
    }
  }

  /// Runs with the lock held; releases it on every exit path.
  async fn rebuild<T, F, Fut>(&self, token: LockToken, loader: F) -> Result<T, CacheError>
  where
    T: Serialize,
    F: FnOnce() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
  {
    let result = match loader().await {
      Ok(data) => {
        match serde_json::to_vec(&data) {
          Ok(payload) => self.publish(payload).await,
          Err(e) => tracing::error!(error = %e, "failed to serialize collection snapshot"),
        }
        Ok(data)
      }
      Err(e) => {
        tracing::error!(collection = %self.config.collection, error = %e, "rebuild load failed");
        Err(CacheError::Store(e))
      }
    };

    self.lock.release(&self.config.lock_name, &token).await;
    result
  }

  /// Bump the version and write the snapshot under the new key.
  ///
  /// Failures are logged only: the caller already has fresh data.
  async fn publish(&self, payload: Vec<u8>) {
    let version = match self.store.incr(&version_key(&self.config.collection)).await {
      Ok(version) => version,
      Err(e) => {
        tracing::warn!(error = %e, "failed to bump collection version, snapshot not cached");
        return;
      }
    };

    let key = collection_key(&self.config.collection, version);
    match self
      .store
      .set(&key, payload, Some(self.config.entry_ttl))
      .await
    {
      Ok(()) => tracing::info!(key = %key, "collection cache rebuilt"),
      Err(e) => tracing::warn!(key = %key, error = %e, "failed to write collection snapshot"),
    }
  }

  /// Poll for another task's rebuild, then fall back to a direct uncached load.
  async fn await_rebuild<T, F, Fut>(&self, loader: F) -> Result<(T, ReadSource), CacheError>
  where
    T: DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
  {
    let deadline = Instant::now() + self.config.wait_timeout;

    loop {
      let version = self.current_version().await?;
      let key = collection_key(&self.config.collection, version);
      if let Some(value) = self.lookup(&key).await {
        return Ok((value, ReadSource::Awaited));
      }

      let now = Instant::now();
      if now >= deadline {
        break;
      }
      tokio::time::sleep(self.config.poll_interval.min(deadline - now)).await;
    }

    tracing::warn!(
      collection = %self.config.collection,
      wait_ms = self.config.wait_timeout.as_millis() as u64,
      "timed out waiting for rebuild, loading directly"
    );
    // Never cached: a second version bump would race the lock holder
    let value = loader().await.map_err(CacheError::Store)?;
    Ok((value, ReadSource::Fallback))
  }

  /// Fail-open read: backend errors and undecodable entries count as misses.
  async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    match self.store.get(key).await {
      Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
          tracing::warn!(key = %key, error = %e, "discarding undecodable cache entry");
          None
        }
      },
      Ok(None) => None,
      Err(e) => {
        tracing::warn!(key = %key, error = %e, "cache read failed, treating as miss");
        None
      }
    }
  }

  async fn store_value<T: Serialize>(&self, key: &str, value: &T) {
    let payload = match serde_json::to_vec(value) {
      Ok(payload) => payload,
      Err(e) => {
        tracing::error!(key = %key, error = %e, "failed to serialize cache entry");
        return;
      }
    };

    if let Err(e) = self
      .store
      .set(key, payload, Some(self.config.entry_ttl))
      .await
    {
      tracing::warn!(key = %key, error = %e, "failed to cache record");
    }
  }
}
