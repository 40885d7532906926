mod backend;
#[cfg(feature = "server")]
mod postgres;
#[cfg(feature = "server")]
mod sqlite;

pub use backend::{NewsStore, RecordStore};
#[cfg(feature = "server")]
pub use postgres::PostgresBackend;
#[cfg(feature = "server")]
pub use sqlite::SqliteBackend;
