pub mod app;
pub mod crypto;
pub mod domain;
pub mod error;
pub mod infra;
pub mod storage;
pub mod transport;

// Convenience re-exports (keeps call-sites clean)
pub use app::Services;
pub use error::{AppError, Result};
pub use infra::config::AppConfig;
pub use storage::{MemoryStore, PgStore, Store};
pub use transport::http::{create_router, ApiDoc, AppState};
