mod config;
mod daemon;
mod routes;

pub use config::{
  BackendType, CoordinatorSection, LoggingSection, PostgresSection, ServerConfig, ServerSection,
  SqliteSection,
};
pub use daemon::Daemon;
pub use routes::{build_router, AppError, AppState};
