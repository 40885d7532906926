use newscache::cache::CacheMode;
use newscache::server::{BackendType, ServerConfig};
use std::io::Write;
use std::time::Duration;

#[test]
fn test_defaults() {
  let config = ServerConfig::default();
  assert_eq!(config.backend, BackendType::Postgres);
  assert_eq!(config.cache.mode, CacheMode::Builtin);
  assert_eq!(config.address(), "0.0.0.0:3000");
  assert_eq!(config.server.cors_origins, vec!["*".to_string()]);

  let coordinator = config.coordinator.to_coordinator_config();
  assert_eq!(coordinator.collection, "news");
  assert_eq!(coordinator.lock_name, "lock:news:all");
  assert_eq!(coordinator.lock_ttl, Duration::from_secs(10));
  assert_eq!(coordinator.entry_ttl, Duration::from_secs(60));
  assert_eq!(coordinator.poll_interval, Duration::from_millis(100));
  assert_eq!(coordinator.wait_timeout, Duration::from_millis(9000));
}

#[test]
fn test_empty_yaml_uses_defaults() {
  let config = ServerConfig::from_yaml("{}").unwrap();
  assert_eq!(config.server.port, 3000);
  assert_eq!(config.logging.level, "info");
}

#[test]
fn test_full_yaml() {
  let yaml = r#"
server:
  host: "127.0.0.1"
  port: 8080
  cors_origins: ["http://localhost:5173"]
backend: sqlite
sqlite:
  path: "/tmp/news.db"
cache:
  mode: redis
  redis:
    host: "cache.internal"
    port: 6380
coordinator:
  collection: "articles"
  lock_ttl_ms: 5000
  entry_ttl: 120
  poll_interval_ms: 50
  wait_timeout_ms: 4000
logging:
  level: "debug"
"#;
  let config = ServerConfig::from_yaml(yaml).unwrap();
  assert_eq!(config.address(), "127.0.0.1:8080");
  assert_eq!(config.backend, BackendType::Sqlite);
  assert_eq!(config.sqlite.path, "/tmp/news.db");
  assert_eq!(config.cache.mode, CacheMode::Redis);
  assert_eq!(config.cache.redis.connection_url(), "redis://cache.internal:6380/0");
  assert_eq!(config.logging.level, "debug");

  let coordinator = config.coordinator.to_coordinator_config();
  assert_eq!(coordinator.collection, "articles");
  assert_eq!(coordinator.lock_name, "lock:articles:all");
  assert_eq!(coordinator.lock_ttl, Duration::from_millis(5000));
  assert_eq!(coordinator.entry_ttl, Duration::from_secs(120));
  assert_eq!(coordinator.wait_timeout, Duration::from_millis(4000));
}

#[test]
fn test_env_expansion_in_yaml() {
  std::env::set_var("NEWSCACHE_CONFIG_TEST_PG", "postgres://ci@db/news");
  let config = ServerConfig::from_yaml("postgres:\n  url: \"${NEWSCACHE_CONFIG_TEST_PG}\"\n").unwrap();
  assert_eq!(config.postgres.url, "postgres://ci@db/news");
}

#[test]
fn test_from_file() {
  let mut file = tempfile::NamedTempFile::new().unwrap();
  writeln!(file, "server:\n  port: 4000\ncoordinator:\n  lock_name: \"lock:custom\"").unwrap();

  let config = ServerConfig::from_file(file.path()).unwrap();
  assert_eq!(config.server.port, 4000);
  assert_eq!(config.coordinator.to_coordinator_config().lock_name, "lock:custom");
}

#[test]
fn test_invalid_yaml_is_error() {
  assert!(ServerConfig::from_yaml("server: [unclosed").is_err());
}

#[test]
fn test_non_ascii_yaml_with_env_var() {
  std::env::set_var("NEWSCACHE_CONFIG_TEST_PORT", "8082");
  let yaml = "# café config, résumé\nserver:\n  port: $NEWSCACHE_CONFIG_TEST_PORT\nlogging:\n  level: \"info\" # niveau\n";
  let config = ServerConfig::from_yaml(yaml).unwrap();
  assert_eq!(config.server.port, 8082);
}
