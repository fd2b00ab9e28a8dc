pub mod config;
pub mod rest;
pub mod storage;
pub mod tasks;

use std::sync::Arc;

use config::TaskdConfig;
use storage::Storage;

/// Shared application state passed to every HTTP handler.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<TaskdConfig>,
    pub storage: Arc<Storage>,
    pub started_at: std::time::Instant,
}
