//! Cache configuration

use serde::{Deserialize, Serialize};

/// Cache mode: builtin in-memory or an external Redis server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
  /// In-process cache (single instance only)
  #[default]
  Builtin,
  /// Shared Redis server (required when several instances run)
  Redis,
}

impl std::fmt::Display for CacheMode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      CacheMode::Builtin => write!(f, "builtin"),
      CacheMode::Redis => write!(f, "redis"),
    }
  }
}

/// Connection settings for the Redis backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
  #[serde(default = "default_host")]
  pub host: String,

  #[serde(default = "default_redis_port")]
  pub port: u16,

  #[serde(default)]
  pub password: Option<String>,

  /// Redis database number
  #[serde(default)]
  pub database: u8,

  #[serde(default)]
  pub tls_enabled: bool,

  /// Full connection URL; overrides the individual fields when set
  #[serde(default)]
  pub url: Option<String>,
}

fn default_host() -> String {
  "localhost".to_string()
}

fn default_redis_port() -> u16 {
  6379
}

impl Default for RedisConfig {
  fn default() -> Self {
    Self {
      host: default_host(),
      port: default_redis_port(),
      password: None,
      database: 0,
      tls_enabled: false,
      url: None,
    }
  }
}

impl RedisConfig {
  /// Generate Redis connection URL
  pub fn connection_url(&self) -> String {
    if let Some(url) = self.url.as_deref().filter(|u| !u.is_empty()) {
      return url.to_string();
    }
    let scheme = if self.tls_enabled { "rediss" } else { "redis" };
    let auth = match &self.password {
      Some(pwd) if !pwd.is_empty() => format!(":{}@", pwd),
      _ => String::new(),
    };
    format!(
      "{}://{}{}:{}/{}",
      scheme, auth, self.host, self.port, self.database
    )
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
  #[serde(default)]
  pub mode: CacheMode,

  #[serde(default)]
  pub redis: RedisConfig,

  /// Seconds between expired-entry sweeps of the builtin store (0 = never)
  #[serde(default = "default_sweep_interval")]
  pub sweep_interval: u64,
}

fn default_sweep_interval() -> u64 {
  30
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      mode: CacheMode::default(),
      redis: RedisConfig::default(),
      sweep_interval: default_sweep_interval(),
    }
  }
}
