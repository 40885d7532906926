use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::params;
use tokio_rusqlite::Connection;

use super::backend::RecordStore;
use crate::types::{NewsFields, NewsRecord};

const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA temp_store = MEMORY;
"#;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS news (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    category TEXT NOT NULL DEFAULT '',
    author TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_news_created_at ON news(created_at);
"#;

const SELECT_COLUMNS: &str = "SELECT id, title, content, category, author, created_at FROM news";

pub struct SqliteBackend {
  conn: Connection,
}

impl SqliteBackend {
  pub async fn new(path: &str) -> Result<Self, anyhow::Error> {
    let conn = if path == ":memory:" {
      Connection::open_in_memory().await?
    } else {
      Connection::open(path).await?
    };

    conn
      .call(|conn| conn.execute_batch(PRAGMAS).map_err(|e| e.into()))
      .await?;

    Ok(Self { conn })
  }

  pub async fn in_memory() -> Result<Self, anyhow::Error> {
    Self::new(":memory:").await
  }
}

/// Fixed-width timestamps so that text ordering matches time ordering
fn format_timestamp(ts: DateTime<Utc>) -> String {
  ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[async_trait]
impl RecordStore for SqliteBackend {
  type Id = i64;
  type Record = NewsRecord;
  type Fields = NewsFields;

  async fn init_schema(&self) -> Result<(), anyhow::Error> {
    self
      .conn
      .call(|conn| conn.execute_batch(SCHEMA).map_err(|e| e.into()))
      .await?;
    tracing::info!("SQLite schema initialized");
    Ok(())
  }

  async fn load_all(&self) -> Result<Vec<NewsRecord>, anyhow::Error> {
    let records = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare_cached(&format!("{} ORDER BY created_at DESC, id DESC", SELECT_COLUMNS))?;
        let rows = stmt.query_map([], row_to_record)?;
        rows
          .collect::<Result<Vec<_>, _>>()
          .map_err(|e| e.into())
      })
      .await?;
    Ok(records)
  }

  async fn load_by_id(&self, id: i64) -> Result<Option<NewsRecord>, anyhow::Error> {
    let record = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(&format!("{} WHERE id = ?1", SELECT_COLUMNS))?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
          Some(row) => Ok(Some(row_to_record(row)?)),
          None => Ok(None),
        }
      })
      .await?;
    Ok(record)
  }

  async fn create(&self, fields: NewsFields) -> Result<i64, anyhow::Error> {
    let now = format_timestamp(Utc::now());
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO news (title, content, category, author, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
          params![fields.title, fields.content, fields.category, fields.author, now],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;
    Ok(id)
  }

  async fn update(&self, id: i64, fields: NewsFields) -> Result<bool, anyhow::Error> {
    let changed = self
      .conn
      .call(move |conn| {
        conn
          .execute(
            "UPDATE news SET title = ?1, content = ?2, category = ?3, author = ?4 WHERE id = ?5",
            params![fields.title, fields.content, fields.category, fields.author, id],
          )
          .map_err(|e| e.into())
      })
      .await?;
    Ok(changed > 0)
  }

  async fn delete(&self, id: i64) -> Result<bool, anyhow::Error> {
    let changed = self
      .conn
      .call(move |conn| {
        conn
          .execute("DELETE FROM news WHERE id = ?1", params![id])
          .map_err(|e| e.into())
      })
      .await?;
    Ok(changed > 0)
  }
}

fn row_to_record(row: &rusqlite::Row) -> Result<NewsRecord, rusqlite::Error> {
  let created_str: String = row.get(5)?;
  let created_at = DateTime::parse_from_rfc3339(&created_str)
    .map(|d| d.with_timezone(&Utc))
    .map_err(|e| {
      rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;

  Ok(NewsRecord {
    id: row.get(0)?,
    title: row.get(1)?,
    content: row.get(2)?,
    category: row.get(3)?,
    author: row.get(4)?,
    created_at,
  })
}
