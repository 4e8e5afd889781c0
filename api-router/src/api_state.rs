use std::sync::Arc;

use common::{
    storage::{db::SurrealDbClient, store::StorageManager},
    utils::config::AppConfig,
};
use index_engine::RagEngine;

/// Per-request handler state. Every component is constructed once at startup
/// and passed in here; handlers hold no ambient globals.
#[derive(Clone)]
pub struct ApiState {
    pub db: Arc<SurrealDbClient>,
    pub config: AppConfig,
    pub storage: StorageManager,
    pub engine: Arc<dyn RagEngine>,
}

impl ApiState {
    pub fn new(
        db: Arc<SurrealDbClient>,
        config: AppConfig,
        storage: StorageManager,
        engine: Arc<dyn RagEngine>,
    ) -> Self {
        Self {
            db,
            config,
            storage,
            engine,
        }
    }
}
