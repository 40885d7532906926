//! News operations as the HTTP layer sees them.

use std::sync::Arc;

use crate::cache::CacheStore;
use crate::coordination::{CacheCoordinator, CacheError, CoordinatorConfig, Invalidator, ReadSource};
use crate::db::NewsStore;
use crate::types::{NewsFields, NewsRecord};

#[derive(Clone)]
pub struct NewsService {
  records: Arc<NewsStore>,
  cache: Arc<dyn CacheStore>,
  coordinator: CacheCoordinator,
  invalidator: Invalidator<NewsStore>,
}

impl NewsService {
  pub fn new(records: Arc<NewsStore>, cache: Arc<dyn CacheStore>, config: CoordinatorConfig) -> Self {
    let invalidator = Invalidator::new(records.clone(), cache.clone(), config.collection.clone());
    Self {
      coordinator: CacheCoordinator::new(cache.clone(), config),
      records,
      cache,
      invalidator,
    }
  }

  pub fn cache(&self) -> &Arc<dyn CacheStore> {
    &self.cache
  }

  pub fn coordinator(&self) -> &CacheCoordinator {
    &self.coordinator
  }

  /// All news, newest first, with the protocol path that served them
  pub async fn list(&self) -> Result<(Vec<NewsRecord>, ReadSource), CacheError> {
    let records = self.records.clone();
    self
      .coordinator
      .read_through_traced(move || async move { records.load_all().await })
      .await
  }

  pub async fn get(&self, id: i64) -> Result<Option<NewsRecord>, CacheError> {
    let records = self.records.clone();
    self
      .coordinator
      .read_by_id(id, move |id| async move { records.load_by_id(id).await })
      .await
  }

  pub async fn create(&self, fields: NewsFields) -> Result<i64, CacheError> {
    let id = self.invalidator.on_create(fields).await?;
    tracing::info!(id, "news created");
    Ok(id)
  }

  pub async fn update(&self, id: i64, fields: NewsFields) -> Result<bool, CacheError> {
    self.invalidator.on_update(id, fields).await
  }

  pub async fn delete(&self, id: i64) -> Result<bool, CacheError> {
    self.invalidator.on_delete(id).await
  }
}
