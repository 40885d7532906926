use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::coordination::{keys, CoordinatorConfig};

/// Expand environment variables in a string.
/// Supports $VAR_NAME and ${VAR_NAME} syntax. Each reference is expanded
/// once; substituted values are not scanned again.
fn expand_env_vars(input: &str) -> String {
  let mut result = String::with_capacity(input.len());
  let mut chars = input.char_indices();

  while let Some((i, c)) = chars.next() {
    if c != '$' {
      result.push(c);
      continue;
    }

    let rest = &input[i + 1..];
    if let Some(braced) = rest.strip_prefix('{') {
      match braced.find('}') {
        Some(end) => {
          result.push_str(&std::env::var(&braced[..end]).unwrap_or_default());
          // Skip '{', the name and '}'
          let skip = braced[..end].chars().count() + 2;
          for _ in 0..skip {
            chars.next();
          }
        }
        None => result.push(c),
      }
      continue;
    }

    let name_len = rest
      .chars()
      .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
      .count();
    if name_len == 0 {
      result.push(c);
      continue;
    }
    // Names are ASCII, so the char count is also the byte length
    result.push_str(&std::env::var(&rest[..name_len]).unwrap_or_default());
    for _ in 0..name_len {
      chars.next();
    }
  }

  result
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
  #[default]
  Postgres,
  Sqlite,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
  #[serde(default)]
  pub server: ServerSection,
  #[serde(default)]
  pub backend: BackendType,
  #[serde(default)]
  pub postgres: PostgresSection,
  #[serde(default)]
  pub sqlite: SqliteSection,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub coordinator: CoordinatorSection,
  #[serde(default)]
  pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
  #[serde(default = "default_host")]
  pub host: String,
  #[serde(default = "default_http_port")]
  pub port: u16,
  /// CORS allowed origins
  /// Use ["*"] for permissive mode, or specify origins like ["http://localhost:3000"]
  #[serde(default)]
  pub cors_origins: Vec<String>,
}

fn default_host() -> String {
  "0.0.0.0".into()
}

fn default_http_port() -> u16 {
  3000
}

impl Default for ServerSection {
  fn default() -> Self {
    Self {
      host: default_host(),
      port: default_http_port(),
      cors_origins: vec!["*".to_string()],
    }
  }
}

/// Read-through protocol tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorSection {
  /// Collection name used as cache key prefix
  #[serde(default = "default_collection")]
  pub collection: String,

  /// Rebuild lock key (default: lock:<collection>:all)
  #[serde(default)]
  pub lock_name: Option<String>,

  /// Lock hold duration in milliseconds
  #[serde(default = "default_lock_ttl_ms")]
  pub lock_ttl_ms: u64,

  /// Cache entry lifetime in seconds
  #[serde(default = "default_entry_ttl")]
  pub entry_ttl: u64,

  /// Delay between cache checks while waiting for a rebuild
  #[serde(default = "default_poll_interval_ms")]
  pub poll_interval_ms: u64,

  /// Maximum wait for another instance's rebuild before loading directly
  #[serde(default = "default_wait_timeout_ms")]
  pub wait_timeout_ms: u64,
}

fn default_collection() -> String {
  "news".into()
}
fn default_lock_ttl_ms() -> u64 {
  10_000
}
fn default_entry_ttl() -> u64 {
  60
}
fn default_poll_interval_ms() -> u64 {
  100
}
fn default_wait_timeout_ms() -> u64 {
  9_000
}

impl Default for CoordinatorSection {
  fn default() -> Self {
    Self {
      collection: default_collection(),
      lock_name: None,
      lock_ttl_ms: default_lock_ttl_ms(),
      entry_ttl: default_entry_ttl(),
      poll_interval_ms: default_poll_interval_ms(),
      wait_timeout_ms: default_wait_timeout_ms(),
    }
  }
}

impl CoordinatorSection {
  pub fn to_coordinator_config(&self) -> CoordinatorConfig {
    CoordinatorConfig {
      collection: self.collection.clone(),
      lock_name: self
        .lock_name
        .clone()
        .unwrap_or_else(|| keys::default_lock_name(&self.collection)),
      lock_ttl: Duration::from_millis(self.lock_ttl_ms),
      entry_ttl: Duration::from_secs(self.entry_ttl),
      poll_interval: Duration::from_millis(self.poll_interval_ms),
      wait_timeout: Duration::from_millis(self.wait_timeout_ms),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresSection {
  #[serde(default = "default_pg_url")]
  pub url: String,
  #[serde(default = "default_max_conn")]
  pub max_connections: usize,
}
fn default_pg_url() -> String {
  "postgres://localhost/news".into()
}
fn default_max_conn() -> usize {
  20
}
impl Default for PostgresSection {
  fn default() -> Self {
    Self {
      url: default_pg_url(),
      max_connections: default_max_conn(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteSection {
  #[serde(default = "default_sqlite_path")]
  pub path: String,
}
fn default_sqlite_path() -> String {
  "news.db".into()
}
impl Default for SqliteSection {
  fn default() -> Self {
    Self {
      path: default_sqlite_path(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
  #[serde(default = "default_level")]
  pub level: String,
}
fn default_level() -> String {
  "info".into()
}
impl Default for LoggingSection {
  fn default() -> Self {
    Self {
      level: default_level(),
    }
  }
}

impl ServerConfig {
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
    let content = std::fs::read_to_string(&path)?;
    Self::from_yaml(&content)
  }

  pub fn from_yaml(content: &str) -> Result<Self, anyhow::Error> {
    let expanded = expand_env_vars(content);
    Ok(serde_yaml::from_str(&expanded)?)
  }

  pub fn find_and_load() -> Result<Option<Self>, anyhow::Error> {
    for p in ["newscache.yaml", "newscache.yml"] {
      if Path::new(p).exists() {
        tracing::info!("Loading config from {}", p);
        return Ok(Some(Self::from_file(p)?));
      }
    }
    Ok(None)
  }

  pub fn address(&self) -> String {
    format!("{}:{}", self.server.host, self.server.port)
  }
}
