use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsRecord {
  pub id: i64,
  pub title: String,
  pub content: String,
  pub category: String,
  pub author: String,
  pub created_at: DateTime<Utc>,
}

/// Writable fields of a news record (create and update payload)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsFields {
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub content: String,
  #[serde(default)]
  pub category: String,
  #[serde(default)]
  pub author: String,
}
