#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use newscache::cache::{CacheStats, CacheStore, CacheStoreError, InMemoryCacheStore};
use newscache::db::RecordStore;
use newscache::types::{NewsFields, NewsRecord};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub fn fields(title: &str) -> NewsFields {
  NewsFields {
    title: title.to_string(),
    content: format!("{} body", title),
    category: "tech".to_string(),
    author: "desk".to_string(),
  }
}

/// Record store held in memory, counting loads and optionally slow or failing.
pub struct MemoryNewsStore {
  records: Mutex<Vec<NewsRecord>>,
  next_id: AtomicI64,
  load_delay: Duration,
  fail_loads: AtomicBool,
  loads: AtomicUsize,
}

impl MemoryNewsStore {
  pub fn new() -> Self {
    Self::with_delay(Duration::ZERO)
  }

  pub fn with_delay(load_delay: Duration) -> Self {
    Self {
      records: Mutex::new(Vec::new()),
      next_id: AtomicI64::new(1),
      load_delay,
      fail_loads: AtomicBool::new(false),
      loads: AtomicUsize::new(0),
    }
  }

  /// Insert a record with a fixed id, older than everything inserted before it
  pub fn seed(&self, id: i64, title: &str) {
    let f = fields(title);
    let mut records = self.records.lock();
    let created_at = Utc::now() - ChronoDuration::minutes(records.len() as i64 + 1);
    records.push(NewsRecord {
      id,
      title: f.title,
      content: f.content,
      category: f.category,
      author: f.author,
      created_at,
    });
    self.next_id.fetch_max(id + 1, Ordering::SeqCst);
  }

  pub fn loads(&self) -> usize {
    self.loads.load(Ordering::SeqCst)
  }

  pub fn fail_loads(&self, fail: bool) {
    self.fail_loads.store(fail, Ordering::SeqCst);
  }

  async fn begin_load(&self) -> Result<(), anyhow::Error> {
    self.loads.fetch_add(1, Ordering::SeqCst);
    if !self.load_delay.is_zero() {
      tokio::time::sleep(self.load_delay).await;
    }
    if self.fail_loads.load(Ordering::SeqCst) {
      anyhow::bail!("database unavailable");
    }
    Ok(())
  }
}

#[async_trait]
impl RecordStore for MemoryNewsStore {
  type Id = i64;
  type Record = NewsRecord;
  type Fields = NewsFields;

  async fn init_schema(&self) -> Result<(), anyhow::Error> {
    Ok(())
  }

  async fn load_all(&self) -> Result<Vec<NewsRecord>, anyhow::Error> {
    self.begin_load().await?;
    let mut records = self.records.lock().clone();
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    Ok(records)
  }

  async fn load_by_id(&self, id: i64) -> Result<Option<NewsRecord>, anyhow::Error> {
    self.begin_load().await?;
    Ok(self.records.lock().iter().find(|r| r.id == id).cloned())
  }

  async fn create(&self, fields: NewsFields) -> Result<i64, anyhow::Error> {
    let id = self.next_id.fetch_add(1, Ordering::SeqCst);
    self.records.lock().push(NewsRecord {
      id,
      title: fields.title,
      content: fields.content,
      category: fields.category,
      author: fields.author,
      created_at: Utc::now(),
    });
    Ok(id)
  }

  async fn update(&self, id: i64, fields: NewsFields) -> Result<bool, anyhow::Error> {
    let mut records = self.records.lock();
    match records.iter_mut().find(|r| r.id == id) {
      Some(record) => {
        record.title = fields.title;
        record.content = fields.content;
        record.category = fields.category;
        record.author = fields.author;
        Ok(true)
      }
      None => Ok(false),
    }
  }

  async fn delete(&self, id: i64) -> Result<bool, anyhow::Error> {
    let mut records = self.records.lock();
    let before = records.len();
    records.retain(|r| r.id != id);
    Ok(records.len() != before)
  }
}

/// In-memory cache whose operations can be made to fail on demand.
pub struct FlakyCache {
  inner: InMemoryCacheStore,
  failing_reads: Mutex<Vec<String>>,
  fail_writes: AtomicBool,
  fail_incr: AtomicBool,
  fail_locks: AtomicBool,
  fail_deletes: AtomicBool,
}

impl FlakyCache {
  pub fn new() -> Self {
    Self {
      inner: InMemoryCacheStore::new(),
      failing_reads: Mutex::new(Vec::new()),
      fail_writes: AtomicBool::new(false),
      fail_incr: AtomicBool::new(false),
      fail_locks: AtomicBool::new(false),
      fail_deletes: AtomicBool::new(false),
    }
  }

  pub fn inner(&self) -> &InMemoryCacheStore {
    &self.inner
  }

  /// Fail every read of a key starting with `prefix`
  pub fn fail_reads_of(&self, prefix: &str) {
    self.failing_reads.lock().push(prefix.to_string());
  }

  pub fn fail_writes(&self, fail: bool) {
    self.fail_writes.store(fail, Ordering::SeqCst);
  }

  pub fn fail_incr(&self, fail: bool) {
    self.fail_incr.store(fail, Ordering::SeqCst);
  }

  pub fn fail_locks(&self, fail: bool) {
    self.fail_locks.store(fail, Ordering::SeqCst);
  }

  pub fn fail_deletes(&self, fail: bool) {
    self.fail_deletes.store(fail, Ordering::SeqCst);
  }

  fn check(flag: &AtomicBool) -> Result<(), CacheStoreError> {
    if flag.load(Ordering::SeqCst) {
      Err(CacheStoreError::Unavailable("connection refused".to_string()))
    } else {
      Ok(())
    }
  }
}

#[async_trait]
impl CacheStore for FlakyCache {
  async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheStoreError> {
    if self.failing_reads.lock().iter().any(|p| key.starts_with(p.as_str())) {
      return Err(CacheStoreError::Unavailable("read timed out".to_string()));
    }
    self.inner.get(key).await
  }

  async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), CacheStoreError> {
    Self::check(&self.fail_writes)?;
    self.inner.set(key, value, ttl).await
  }

  async fn set_if_absent(
    &self,
    key: &str,
    value: Vec<u8>,
    ttl: Option<Duration>,
  ) -> Result<bool, CacheStoreError> {
    Self::check(&self.fail_locks)?;
    self.inner.set_if_absent(key, value, ttl).await
  }

  async fn incr(&self, key: &str) -> Result<i64, CacheStoreError> {
    Self::check(&self.fail_incr)?;
    self.inner.incr(key).await
  }

  async fn delete(&self, key: &str) -> Result<bool, CacheStoreError> {
    Self::check(&self.fail_deletes)?;
    self.inner.delete(key).await
  }

  async fn compare_and_delete(&self, key: &str, expected: &[u8]) -> Result<bool, CacheStoreError> {
    self.inner.compare_and_delete(key, expected).await
  }

  async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheStoreError> {
    self.inner.ttl(key).await
  }

  async fn info(&self) -> CacheStats {
    self.inner.info().await
  }
}

pub fn shared<T: CacheStore + 'static>(store: &Arc<T>) -> Arc<dyn CacheStore> {
  store.clone()
}
