//! Redis backend tests. Run against a disposable server with
//! `NEWSCACHE_TEST_REDIS_URL=redis://localhost:6379/15 cargo test -- --ignored`.

mod common;

use common::shared;
use newscache::cache::{CacheStore, RedisCacheStore, RedisConfig};
use newscache::coordination::{CacheCoordinator, CoordinatorConfig, DistributedLock, ReadSource};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

async fn connect() -> Option<Arc<RedisCacheStore>> {
  let url = std::env::var("NEWSCACHE_TEST_REDIS_URL").ok()?;
  let config = RedisConfig {
    url: Some(url),
    ..Default::default()
  };
  let store = RedisCacheStore::new(&config).await.unwrap();
  store.test_connection().await.unwrap();
  Some(Arc::new(store))
}

fn unique(prefix: &str) -> String {
  format!("{}:{}", prefix, Uuid::new_v4())
}

#[tokio::test]
#[ignore = "requires NEWSCACHE_TEST_REDIS_URL"]
async fn test_redis_set_if_absent_reply() {
  let Some(store) = connect().await else { return };
  let key = unique("test:nx");

  assert!(store
    .set_if_absent(&key, b"a".to_vec(), Some(Duration::from_secs(5)))
    .await
    .unwrap());
  assert!(!store
    .set_if_absent(&key, b"b".to_vec(), Some(Duration::from_secs(5)))
    .await
    .unwrap());
  assert_eq!(store.get(&key).await.unwrap(), Some(b"a".to_vec()));

  let ttl = store.ttl(&key).await.unwrap().unwrap();
  assert!(ttl <= Duration::from_secs(5));
  store.delete(&key).await.unwrap();
}

#[tokio::test]
#[ignore = "requires NEWSCACHE_TEST_REDIS_URL"]
async fn test_redis_compare_and_delete_script() {
  let Some(store) = connect().await else { return };
  let key = unique("test:cad");

  store.set(&key, b"token-a".to_vec(), None).await.unwrap();
  assert!(!store.compare_and_delete(&key, b"token-b").await.unwrap());
  assert!(store.get(&key).await.unwrap().is_some());
  assert!(store.compare_and_delete(&key, b"token-a").await.unwrap());
  assert!(store.get(&key).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires NEWSCACHE_TEST_REDIS_URL"]
async fn test_redis_incr_and_missing_ttl() {
  let Some(store) = connect().await else { return };
  let key = unique("test:version");

  assert_eq!(store.incr(&key).await.unwrap(), 1);
  assert_eq!(store.incr(&key).await.unwrap(), 2);
  assert!(store.ttl(&key).await.unwrap().is_none());
  assert!(store.ttl(&unique("test:missing")).await.unwrap().is_none());
  assert!(store.delete(&key).await.unwrap());
}

#[tokio::test]
#[ignore = "requires NEWSCACHE_TEST_REDIS_URL"]
async fn test_redis_lock_and_read_through() {
  let Some(store) = connect().await else { return };
  let collection = unique("news");
  let cache = shared(&store);

  let lock = DistributedLock::new(cache.clone());
  let lock_name = format!("lock:{}:all", collection);
  let token = lock
    .try_acquire(&lock_name, Duration::from_secs(5))
    .await
    .unwrap()
    .unwrap();
  assert!(lock
    .try_acquire(&lock_name, Duration::from_secs(5))
    .await
    .unwrap()
    .is_none());
  assert!(lock.release(&lock_name, &token).await);

  let coordinator = CacheCoordinator::new(cache, CoordinatorConfig::for_collection(collection.clone()));
  let (value, source) = coordinator
    .read_through_traced(|| async { Ok::<_, anyhow::Error>(vec!["a".to_string(), "b".to_string()]) })
    .await
    .unwrap();
  assert_eq!(source, ReadSource::Rebuilt);

  let (cached, source) = coordinator
    .read_through_traced(|| async { Ok::<_, anyhow::Error>(Vec::<String>::new()) })
    .await
    .unwrap();
  assert_eq!(source, ReadSource::Cache);
  assert_eq!(cached, value);

  store.delete(&format!("{}:all:v1", collection)).await.unwrap();
  store.delete(&format!("{}:version", collection)).await.unwrap();
}
