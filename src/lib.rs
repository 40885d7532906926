//! Stampede-safe read-through caching for a news service.
//!
//! The [`coordination`] module holds the protocol (versioned keys, the
//! rebuild lock, the read-through coordinator and the invalidator). The
//! [`cache`] and [`db`] modules provide its two backends.

pub mod cache;
pub mod coordination;
pub mod db;
pub mod service;
pub mod types;

#[cfg(feature = "server")]
pub mod server;
