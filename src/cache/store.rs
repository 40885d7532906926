//! Cache store implementation

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::entry::CacheEntry;

/// Cache statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
  pub keys: usize,
  pub hits: u64,
  pub misses: u64,
  pub expired: u64,
}

impl CacheStats {
  pub fn hit_rate(&self) -> f64 {
    let total = self.hits + self.misses;
    if total == 0 {
      0.0
    } else {
      self.hits as f64 / total as f64
    }
  }
}

/// Store operation error
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheStoreError {
  #[error("cache backend unavailable: {0}")]
  Unavailable(String),
  #[error("invalid value: {0}")]
  InvalidValue(String),
}

/// Key-value primitives the coordination layer needs from a shared cache.
///
/// Every implementation must make `set_if_absent`, `incr` and
/// `compare_and_delete` atomic with respect to all other clients of the same
/// backend, not only the current process.
#[async_trait]
pub trait CacheStore: Send + Sync {
  async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheStoreError>;
  async fn set(
    &self,
    key: &str,
    value: Vec<u8>,
    ttl: Option<Duration>,
  ) -> Result<(), CacheStoreError>;
  /// Store `value` only if `key` holds no live value. Returns whether it was stored.
  async fn set_if_absent(
    &self,
    key: &str,
    value: Vec<u8>,
    ttl: Option<Duration>,
  ) -> Result<bool, CacheStoreError>;
  /// Increment the integer at `key` by one, treating a missing key as 0.
  async fn incr(&self, key: &str) -> Result<i64, CacheStoreError>;
  async fn delete(&self, key: &str) -> Result<bool, CacheStoreError>;
  /// Delete `key` only if it currently holds exactly `expected`.
  async fn compare_and_delete(&self, key: &str, expected: &[u8]) -> Result<bool, CacheStoreError>;
  /// Remaining lifetime of `key`; `None` when missing or persistent.
  async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheStoreError>;
  async fn info(&self) -> CacheStats;
}

/// In-memory cache store implementation
///
/// Shared by every task of one process. Suitable for single-instance
/// deployments and tests; multiple instances need a shared backend.
pub struct InMemoryCacheStore {
  data: RwLock<HashMap<String, CacheEntry>>,
  hits: AtomicU64,
  misses: AtomicU64,
  expired: AtomicU64,
}

impl Default for InMemoryCacheStore {
  fn default() -> Self {
    Self::new()
  }
}

impl InMemoryCacheStore {
  pub fn new() -> Self {
    Self {
      data: RwLock::new(HashMap::new()),
      hits: AtomicU64::new(0),
      misses: AtomicU64::new(0),
      expired: AtomicU64::new(0),
    }
  }

  /// Check and evict expired entries
  pub fn evict_expired(&self) -> usize {
    let mut data = self.data.write();
    let before = data.len();
    data.retain(|_, entry| !entry.is_expired());
    let count = before - data.len();
    self.expired.fetch_add(count as u64, Ordering::Relaxed);
    count
  }

  /// Live keys starting with `prefix`
  pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
    let data = self.data.read();
    let mut keys: Vec<String> = data
      .iter()
      .filter(|(k, e)| !e.is_expired() && k.starts_with(prefix))
      .map(|(k, _)| k.clone())
      .collect();
    keys.sort();
    keys
  }

  /// Remove `key` if its entry has expired. Caller holds the write lock.
  fn purge_if_expired(&self, data: &mut HashMap<String, CacheEntry>, key: &str) {
    if data.get(key).map(|e| e.is_expired()).unwrap_or(false) {
      data.remove(key);
      self.expired.fetch_add(1, Ordering::Relaxed);
    }
  }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
  async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheStoreError> {
    let mut data = self.data.write();
    self.purge_if_expired(&mut data, key);

    match data.get(key) {
      Some(entry) => {
        self.hits.fetch_add(1, Ordering::Relaxed);
        Ok(Some(entry.value.clone()))
      }
      None => {
        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(None)
      }
    }
  }

  async fn set(
    &self,
    key: &str,
    value: Vec<u8>,
    ttl: Option<Duration>,
  ) -> Result<(), CacheStoreError> {
    let mut data = self.data.write();
    data.insert(key.to_string(), CacheEntry::new(value, ttl));
    Ok(())
  }

  async fn set_if_absent(
    &self,
    key: &str,
    value: Vec<u8>,
    ttl: Option<Duration>,
  ) -> Result<bool, CacheStoreError> {
    let mut data = self.data.write();
    self.purge_if_expired(&mut data, key);

    if data.contains_key(key) {
      return Ok(false);
    }
    data.insert(key.to_string(), CacheEntry::new(value, ttl));
    Ok(true)
  }

  async fn incr(&self, key: &str) -> Result<i64, CacheStoreError> {
    let mut data = self.data.write();
    self.purge_if_expired(&mut data, key);

    if let Some(entry) = data.get_mut(key) {
      let current = entry
        .as_i64()
        .ok_or_else(|| CacheStoreError::InvalidValue("value is not an integer".to_string()))?;
      let next = current
        .checked_add(1)
        .ok_or_else(|| CacheStoreError::InvalidValue("increment would overflow".to_string()))?;
      entry.value = next.to_string().into_bytes();
      Ok(next)
    } else {
      data.insert(key.to_string(), CacheEntry::new(b"1".to_vec(), None));
      Ok(1)
    }
  }

  async fn delete(&self, key: &str) -> Result<bool, CacheStoreError> {
    let mut data = self.data.write();
    self.purge_if_expired(&mut data, key);
    Ok(data.remove(key).is_some())
  }

  async fn compare_and_delete(&self, key: &str, expected: &[u8]) -> Result<bool, CacheStoreError> {
    let mut data = self.data.write();
    self.purge_if_expired(&mut data, key);

    match data.get(key) {
      Some(entry) if entry.value == expected => {
        data.remove(key);
        Ok(true)
      }
      _ => Ok(false),
    }
  }

  async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheStoreError> {
    let data = self.data.read();
    Ok(data.get(key).and_then(|entry| entry.ttl_remaining()))
  }

  async fn info(&self) -> CacheStats {
    let data = self.data.read();
    CacheStats {
      keys: data.values().filter(|e| !e.is_expired()).count(),
      hits: self.hits.load(Ordering::Relaxed),
      misses: self.misses.load(Ordering::Relaxed),
      expired: self.expired.load(Ordering::Relaxed),
    }
  }
}
