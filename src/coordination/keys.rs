//! Versioned cache key scheme
//!
//! Every collection rebuild bumps the version, so a rebuilt snapshot always
//! lands under a key no reader has seen before. Readers never observe a
//! deleted-but-not-yet-repopulated collection key.

use std::fmt::Display;

/// Key of the collection snapshot built at `version`: `<collection>:all:v<version>`
pub fn collection_key(collection: &str, version: i64) -> String {
  format!("{}:all:v{}", collection, version)
}

/// Key of the collection's version counter: `<collection>:version`
pub fn version_key(collection: &str) -> String {
  format!("{}:version", collection)
}

/// Key of a single cached record: `<collection>:<id>`
pub fn item_key(collection: &str, id: impl Display) -> String {
  format!("{}:{}", collection, id)
}

/// Lock guarding rebuilds of the full collection: `lock:<collection>:all`
pub fn default_lock_name(collection: &str) -> String {
  format!("lock:{}:all", collection)
}
