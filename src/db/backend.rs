use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;

use crate::types::{NewsFields, NewsRecord};

/// CRUD access to the backing relational store.
///
/// Records are opaque to the caching layer: it only serializes them.
#[async_trait]
pub trait RecordStore: Send + Sync {
  type Id: Display + Clone + Send + Sync + 'static;
  type Record: Serialize + DeserializeOwned + Send + Sync + 'static;
  type Fields: Send + 'static;

  async fn init_schema(&self) -> Result<(), anyhow::Error>;

  /// Every record, newest first
  async fn load_all(&self) -> Result<Vec<Self::Record>, anyhow::Error>;
  async fn load_by_id(&self, id: Self::Id) -> Result<Option<Self::Record>, anyhow::Error>;
  async fn create(&self, fields: Self::Fields) -> Result<Self::Id, anyhow::Error>;
  /// Returns whether a record with `id` existed
  async fn update(&self, id: Self::Id, fields: Self::Fields) -> Result<bool, anyhow::Error>;
  /// Returns whether a record with `id` existed
  async fn delete(&self, id: Self::Id) -> Result<bool, anyhow::Error>;
}

/// The news table as a record store
pub type NewsStore = dyn RecordStore<Id = i64, Record = NewsRecord, Fields = NewsFields>;
