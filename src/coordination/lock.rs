//! Distributed lock on top of a shared cache store.
//!
//! A lock is a single record holding a random token, created with
//! set-if-absent and an expiry. Only the holder of the matching token can
//! delete it; a crashed or slow holder loses it once the expiry passes.
//! There is no renewal: the holder must finish inside the TTL.

use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::cache::{CacheStore, CacheStoreError};

/// Proof of lock ownership returned by a successful acquire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken(String);

impl LockToken {
  fn generate() -> Self {
    Self(Uuid::new_v4().to_string())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl std::fmt::Display for LockToken {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

#[derive(Clone)]
pub struct DistributedLock {
  store: Arc<dyn CacheStore>,
}

impl DistributedLock {
  pub fn new(store: Arc<dyn CacheStore>) -> Self {
    Self { store }
  }

  /// Single non-blocking attempt to take `name` for `ttl`.
  pub async fn try_acquire(
    &self,
    name: &str,
    ttl: Duration,
  ) -> Result<Option<LockToken>, CacheStoreError> {
    let token = LockToken::generate();
    let acquired = self
      .store
      .set_if_absent(name, token.as_str().as_bytes().to_vec(), Some(ttl))
      .await?;

    if acquired {
      tracing::debug!(lock = name, ttl_ms = ttl.as_millis() as u64, "lock acquired");
      Ok(Some(token))
    } else {
      Ok(None)
    }
  }

  /// Release `name` if it is still held with `token`.
  ///
  /// Backend errors are logged and swallowed; the record expires on its own.
  pub async fn release(&self, name: &str, token: &LockToken) -> bool {
    match self
      .store
      .compare_and_delete(name, token.as_str().as_bytes())
      .await
    {
      Ok(true) => {
        tracing::debug!(lock = name, "lock released");
        true
      }
      Ok(false) => {
        tracing::warn!(lock = name, "lock expired or taken over before release");
        false
      }
      Err(e) => {
        tracing::error!(lock = name, error = %e, "lock release failed, waiting for expiry");
        false
      }
    }
  }
}
