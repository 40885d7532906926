//! Write path: mutate the store, then invalidate.
//!
//! Collection snapshots are never deleted. Bumping the version counter
//! orphans them; they linger until their TTL runs out but no reader derives
//! their key again. Single-record entries are deleted immediately.

use std::sync::Arc;

use super::keys::{item_key, version_key};
use super::CacheError;
use crate::cache::CacheStore;
use crate::db::RecordStore;

pub struct Invalidator<S: ?Sized> {
  records: Arc<S>,
  cache: Arc<dyn CacheStore>,
  collection: String,
}

impl<S: ?Sized> Clone for Invalidator<S> {
  fn clone(&self) -> Self {
    Self {
      records: self.records.clone(),
      cache: self.cache.clone(),
      collection: self.collection.clone(),
    }
  }
}

impl<S: RecordStore + ?Sized> Invalidator<S> {
  pub fn new(records: Arc<S>, cache: Arc<dyn CacheStore>, collection: impl Into<String>) -> Self {
    Self {
      records,
      cache,
      collection: collection.into(),
    }
  }

  pub async fn on_create(&self, fields: S::Fields) -> Result<S::Id, CacheError> {
    let id = self.records.create(fields).await.map_err(CacheError::Store)?;
    self.invalidate(None).await?;
    Ok(id)
  }

  /// Returns whether the record existed.
  pub async fn on_update(&self, id: S::Id, fields: S::Fields) -> Result<bool, CacheError> {
    let found = self
      .records
      .update(id.clone(), fields)
      .await
      .map_err(CacheError::Store)?;
    self.invalidate(Some(&id)).await?;
    Ok(found)
  }

  /// Returns whether the record existed.
  pub async fn on_delete(&self, id: S::Id) -> Result<bool, CacheError> {
    let found = self
      .records
      .delete(id.clone())
      .await
      .map_err(CacheError::Store)?;
    self.invalidate(Some(&id)).await?;
    Ok(found)
  }

  /// Bump the version, then drop the record entry. Both steps are attempted
  /// even if the first fails; the first error is returned.
  async fn invalidate(&self, id: Option<&S::Id>) -> Result<(), CacheError> {
    let bumped = self.cache.incr(&version_key(&self.collection)).await;
    match &bumped {
      Ok(version) => tracing::debug!(collection = %self.collection, version, "collection version bumped"),
      Err(e) => tracing::error!(collection = %self.collection, error = %e, "failed to bump collection version"),
    }

    let dropped = match id {
      Some(id) => {
        let key = item_key(&self.collection, id);
        let result = self.cache.delete(&key).await;
        if let Err(e) = &result {
          tracing::error!(key = %key, error = %e, "failed to drop cached record");
        }
        result.map(|_| ())
      }
      None => Ok(()),
    };

    bumped
      .map(|_| ())
      .and(dropped)
      .map_err(CacheError::Invalidation)
  }
}
