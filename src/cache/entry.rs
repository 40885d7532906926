//! Cache entry types

use std::time::{Duration, Instant};

/// A cached value with its expiry metadata
#[derive(Debug, Clone)]
pub struct CacheEntry {
  pub value: Vec<u8>,
  pub expires_at: Option<Instant>,
}

impl CacheEntry {
  pub fn new(value: Vec<u8>, ttl: Option<Duration>) -> Self {
    let now = Instant::now();
    Self {
      value,
      expires_at: ttl.map(|d| now + d),
    }
  }

  pub fn is_expired(&self) -> bool {
    self
      .expires_at
      .map(|exp| Instant::now() >= exp)
      .unwrap_or(false)
  }

  pub fn ttl_remaining(&self) -> Option<Duration> {
    self.expires_at.and_then(|exp| {
      let now = Instant::now();
      if now >= exp {
        None
      } else {
        Some(exp - now)
      }
    })
  }

  /// Parse the stored bytes as a decimal integer (Redis `INCR` semantics)
  pub fn as_i64(&self) -> Option<i64> {
    std::str::from_utf8(&self.value)
      .ok()
      .and_then(|s| s.trim().parse().ok())
  }
}
