use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use tokio_postgres::{NoTls, Row};

use super::backend::RecordStore;
use crate::types::{NewsFields, NewsRecord};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS news (
    id BIGSERIAL PRIMARY KEY,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    category VARCHAR(255) NOT NULL DEFAULT '',
    author VARCHAR(255) NOT NULL DEFAULT '',
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_news_created_at ON news(created_at);
"#;

pub struct PostgresBackend {
  pool: Pool,
}

impl PostgresBackend {
  pub fn new(url: &str, max_connections: usize) -> Result<Self, anyhow::Error> {
    let mut cfg = Config::new();
    cfg.url = Some(url.into());
    cfg.manager = Some(ManagerConfig {
      recycling_method: RecyclingMethod::Fast,
    });
    cfg.pool = Some(PoolConfig::new(max_connections.max(1)));
    let pool = cfg.create_pool(Some(Runtime::Tokio1), NoTls)?;
    Ok(Self { pool })
  }
}

fn row_to_record(row: &Row) -> NewsRecord {
  NewsRecord {
    id: row.get("id"),
    title: row.get("title"),
    content: row.get("content"),
    category: row.get("category"),
    author: row.get("author"),
    created_at: row.get("created_at"),
  }
}

#[async_trait]
impl RecordStore for PostgresBackend {
  type Id = i64;
  type Record = NewsRecord;
  type Fields = NewsFields;

  async fn init_schema(&self) -> Result<(), anyhow::Error> {
    self.pool.get().await?.batch_execute(SCHEMA).await?;
    tracing::info!("PostgreSQL schema initialized");
    Ok(())
  }

  async fn load_all(&self) -> Result<Vec<NewsRecord>, anyhow::Error> {
    let rows = self
      .pool
      .get()
      .await?
      .query(
        "SELECT id, title, content, category, author, created_at FROM news ORDER BY created_at DESC, id DESC",
        &[],
      )
      .await?;
    Ok(rows.iter().map(row_to_record).collect())
  }

  async fn load_by_id(&self, id: i64) -> Result<Option<NewsRecord>, anyhow::Error> {
    let row = self
      .pool
      .get()
      .await?
      .query_opt(
        "SELECT id, title, content, category, author, created_at FROM news WHERE id = $1",
        &[&id],
      )
      .await?;
    Ok(row.as_ref().map(row_to_record))
  }

  async fn create(&self, fields: NewsFields) -> Result<i64, anyhow::Error> {
    let row = self
      .pool
      .get()
      .await?
      .query_one(
        "INSERT INTO news (title, content, category, author) VALUES ($1, $2, $3, $4) RETURNING id",
        &[&fields.title, &fields.content, &fields.category, &fields.author],
      )
      .await?;
    Ok(row.get(0))
  }

  async fn update(&self, id: i64, fields: NewsFields) -> Result<bool, anyhow::Error> {
    let changed = self
      .pool
      .get()
      .await?
      .execute(
        "UPDATE news SET title = $1, content = $2, category = $3, author = $4 WHERE id = $5",
        &[&fields.title, &fields.content, &fields.category, &fields.author, &id],
      )
      .await?;
    Ok(changed > 0)
  }

  async fn delete(&self, id: i64) -> Result<bool, anyhow::Error> {
    let changed = self
      .pool
      .get()
      .await?
      .execute("DELETE FROM news WHERE id = $1", &[&id])
      .await?;
    Ok(changed > 0)
  }
}
