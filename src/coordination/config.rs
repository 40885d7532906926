use std::time::Duration;

use super::keys::default_lock_name;

/// Tuning of the read-through protocol for one collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
  /// Logical collection name, the prefix of every cache key
  pub collection: String,
  /// Key of the rebuild lock
  pub lock_name: String,
  /// How long a rebuilder may hold the lock before it expires
  pub lock_ttl: Duration,
  /// Lifetime of cached snapshots and records
  pub entry_ttl: Duration,
  /// Delay between cache checks while another task rebuilds
  pub poll_interval: Duration,
  /// Upper bound on waiting for another task's rebuild
  pub wait_timeout: Duration,
}

impl CoordinatorConfig {
  pub fn for_collection(collection: impl Into<String>) -> Self {
    let collection = collection.into();
    Self {
      lock_name: default_lock_name(&collection),
      collection,
      lock_ttl: Duration::from_millis(10_000),
      entry_ttl: Duration::from_secs(60),
      poll_interval: Duration::from_millis(100),
      wait_timeout: Duration::from_millis(9_000),
    }
  }
}

impl Default for CoordinatorConfig {
  fn default() -> Self {
    Self::for_collection("news")
  }
}
