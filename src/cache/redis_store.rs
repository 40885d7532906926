//! Redis-backed cache store, shared by every service instance

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::config::RedisConfig;
use super::store::{CacheStats, CacheStore, CacheStoreError};

/// Deletes KEYS[1] only while it still holds ARGV[1].
const COMPARE_AND_DELETE_SCRIPT: &str = r#"
if redis.call("get", KEYS[1]) == ARGV[1] then
  return redis.call("del", KEYS[1])
else
  return 0
end
"#;

pub struct RedisCacheStore {
  connection: ConnectionManager,
  hits: AtomicU64,
  misses: AtomicU64,
}

impl From<RedisError> for CacheStoreError {
  fn from(e: RedisError) -> Self {
    CacheStoreError::Unavailable(e.to_string())
  }
}

impl RedisCacheStore {
  pub async fn new(config: &RedisConfig) -> Result<Self, RedisError> {
    let client = Client::open(config.connection_url())?;
    let connection = ConnectionManager::new(client).await?;

    Ok(Self {
      connection,
      hits: AtomicU64::new(0),
      misses: AtomicU64::new(0),
    })
  }

  /// Test the connection to Redis
  pub async fn test_connection(&self) -> Result<(), RedisError> {
    let mut conn = self.connection.clone();
    redis::cmd("PING").query_async::<()>(&mut conn).await?;
    Ok(())
  }
}

/// Redis rejects `PX 0`, so sub-millisecond lifetimes round up.
fn ttl_millis(ttl: Duration) -> u64 {
  (ttl.as_millis() as u64).max(1)
}

#[async_trait]
impl CacheStore for RedisCacheStore {
  async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheStoreError> {
    let mut conn = self.connection.clone();
    let value: Option<Vec<u8>> = conn.get(key).await?;
    if value.is_some() {
      self.hits.fetch_add(1, Ordering::Relaxed);
    } else {
      self.misses.fetch_add(1, Ordering::Relaxed);
    }
    Ok(value)
  }

  async fn set(
    &self,
    key: &str,
    value: Vec<u8>,
    ttl: Option<Duration>,
  ) -> Result<(), CacheStoreError> {
    let mut conn = self.connection.clone();
    let mut cmd = redis::cmd("SET");
    cmd.arg(key).arg(value);
    if let Some(ttl) = ttl {
      cmd.arg("PX").arg(ttl_millis(ttl));
    }
    cmd.query_async::<()>(&mut conn).await?;
    Ok(())
  }

  async fn set_if_absent(
    &self,
    key: &str,
    value: Vec<u8>,
    ttl: Option<Duration>,
  ) -> Result<bool, CacheStoreError> {
    let mut conn = self.connection.clone();
    let mut cmd = redis::cmd("SET");
    cmd.arg(key).arg(value).arg("NX");
    if let Some(ttl) = ttl {
      cmd.arg("PX").arg(ttl_millis(ttl));
    }
    // Nil reply means the key already existed
    let reply: Option<String> = cmd.query_async(&mut conn).await?;
    Ok(reply.is_some())
  }

  async fn incr(&self, key: &str) -> Result<i64, CacheStoreError> {
    let mut conn = self.connection.clone();
    let value: i64 = conn.incr(key, 1).await?;
    Ok(value)
  }

  async fn delete(&self, key: &str) -> Result<bool, CacheStoreError> {
    let mut conn = self.connection.clone();
    let removed: i64 = conn.del(key).await?;
    Ok(removed > 0)
  }

  async fn compare_and_delete(&self, key: &str, expected: &[u8]) -> Result<bool, CacheStoreError> {
    let mut conn = self.connection.clone();
    let removed: i64 = redis::Script::new(COMPARE_AND_DELETE_SCRIPT)
      .key(key)
      .arg(expected)
      .invoke_async(&mut conn)
      .await?;
    Ok(removed > 0)
  }

  async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheStoreError> {
    let mut conn = self.connection.clone();
    // -2 = missing, -1 = no expiry
    let millis: i64 = conn.pttl(key).await?;
    Ok((millis >= 0).then(|| Duration::from_millis(millis as u64)))
  }

  async fn info(&self) -> CacheStats {
    let mut conn = self.connection.clone();
    let dbsize: Result<usize, _> = redis::cmd("DBSIZE").query_async(&mut conn).await;

    CacheStats {
      keys: dbsize.unwrap_or(0),
      hits: self.hits.load(Ordering::Relaxed),
      misses: self.misses.load(Ordering::Relaxed),
      // Expiry happens server-side
      expired: 0,
    }
  }
}
