//! Cache backend adapters
//!
//! Provides the key-value primitives the coordination layer is built on:
//! - TTL-bounded `get`/`set`
//! - atomic `set_if_absent`, `incr` and `compare_and_delete`
//! - a builtin in-process store and a Redis store for multi-instance setups

pub mod config;
mod entry;
#[cfg(feature = "server")]
mod redis_store;
mod store;

pub use config::{CacheConfig, CacheMode, RedisConfig};
pub use entry::CacheEntry;
#[cfg(feature = "server")]
pub use redis_store::RedisCacheStore;
pub use store::{CacheStats, CacheStore, CacheStoreError, InMemoryCacheStore};
