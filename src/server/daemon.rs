use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};

use super::routes::{build_router, AppState};
use super::ServerConfig;
use crate::cache::{CacheMode, CacheStore, InMemoryCacheStore, RedisCacheStore};
use crate::db::NewsStore;
use crate::service::NewsService;

/// Selected cache backend. The builtin store is kept concrete so the
/// daemon can sweep it.
enum CacheHandle {
  Builtin(Arc<InMemoryCacheStore>),
  Redis(Arc<RedisCacheStore>),
}

impl CacheHandle {
  fn shared(&self) -> Arc<dyn CacheStore> {
    match self {
      CacheHandle::Builtin(store) => store.clone(),
      CacheHandle::Redis(store) => store.clone(),
    }
  }
}

pub struct Daemon {
  config: ServerConfig,
  records: Arc<NewsStore>,
  cache: CacheHandle,
  shutdown_tx: broadcast::Sender<()>,
}

impl Daemon {
  /// Connect the configured cache backend.
  pub async fn new(config: ServerConfig, records: Arc<NewsStore>) -> Result<Self, anyhow::Error> {
    let cache = match config.cache.mode {
      CacheMode::Builtin => {
        tracing::warn!("Using builtin cache; lock and versions are not shared across instances");
        CacheHandle::Builtin(Arc::new(InMemoryCacheStore::new()))
      }
      CacheMode::Redis => {
        let store = RedisCacheStore::new(&config.cache.redis).await?;
        store.test_connection().await?;
        tracing::info!(
          "Redis cache connected at {}:{}",
          config.cache.redis.host,
          config.cache.redis.port
        );
        CacheHandle::Redis(Arc::new(store))
      }
    };

    let (shutdown_tx, _) = broadcast::channel(1);
    Ok(Self {
      config,
      records,
      cache,
      shutdown_tx,
    })
  }

  /// Trigger graceful shutdown of all servers
  pub fn shutdown(&self) {
    tracing::info!("Initiating graceful shutdown...");
    let _ = self.shutdown_tx.send(());
  }

  pub async fn run(&self) -> Result<(), anyhow::Error> {
    tracing::info!("Initializing database schema...");
    self.records.init_schema().await?;

    if let CacheHandle::Builtin(store) = &self.cache {
      self.spawn_sweeper(store.clone());
    }

    let service = NewsService::new(
      self.records.clone(),
      self.cache.shared(),
      self.config.coordinator.to_coordinator_config(),
    );
    let coordinator = service.coordinator().config();
    tracing::info!(
      collection = %coordinator.collection,
      cache = %self.config.cache.mode,
      lock_ttl_ms = coordinator.lock_ttl.as_millis() as u64,
      wait_timeout_ms = coordinator.wait_timeout.as_millis() as u64,
      "Cache coordinator ready"
    );

    let app = build_router(AppState { service }).layer(self.cors_layer());

    let addr = self.config.address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("News API on http://{} (pid {})", addr, std::process::id());

    let mut shutdown_rx = self.shutdown_tx.subscribe();
    axum::serve(listener, app.into_make_service())
      .with_graceful_shutdown(async move {
        let _ = shutdown_rx.recv().await;
        tracing::info!("HTTP server shutting down");
      })
      .await?;
    Ok(())
  }

  fn cors_layer(&self) -> CorsLayer {
    let origins = &self.config.server.cors_origins;
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
      CorsLayer::permissive()
    } else {
      let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
      CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
    }
  }

  fn spawn_sweeper(&self, store: Arc<InMemoryCacheStore>) {
    let interval = self.config.cache.sweep_interval;
    if interval == 0 {
      return;
    }

    let mut shutdown_rx = self.shutdown_tx.subscribe();
    tokio::spawn(async move {
      let mut ticker = tokio::time::interval(Duration::from_secs(interval));
      loop {
        tokio::select! {
          _ = ticker.tick() => {
            let evicted = store.evict_expired();
            if evicted > 0 {
              tracing::debug!(evicted, "expired cache entries swept");
            }
          }
          _ = shutdown_rx.recv() => break,
        }
      }
    });
  }
}
