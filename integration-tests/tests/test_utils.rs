use std::sync::Arc;

use api_router::{api_routes, api_state::ApiState};
use axum::Router;
use axum_test::TestServer;
use common::{
    storage::{db::SurrealDbClient, store::StorageManager},
    utils::{
        config::{AppConfig, StorageKind},
        embedding::EmbeddingBackend,
    },
};
use index_engine::RagEngine;
use uuid::Uuid;

pub const TEST_EMBEDDING_DIMENSION: usize = 64;

/// In-memory SurrealDB with the runtime schema applied.
pub async fn setup_test_database() -> Arc<SurrealDbClient> {
    let db = SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
        .await
        .expect("Failed to start in-memory surrealdb");

    db.ensure_initialized(TEST_EMBEDDING_DIMENSION)
        .await
        .expect("Failed to initialize schema");

    Arc::new(db)
}

pub fn test_config() -> AppConfig {
    AppConfig {
        storage: StorageKind::Memory,
        embedding_backend: EmbeddingBackend::Hashed,
        embedding_dimensions: TEST_EMBEDDING_DIMENSION as u32,
        ..AppConfig::default()
    }
}

/// Full service router backed by in-memory everything and the given engine.
pub async fn test_server(engine: Arc<dyn RagEngine>) -> (TestServer, Arc<SurrealDbClient>) {
    let db = setup_test_database().await;
    let config = test_config();

    let storage = StorageManager::new(&config)
        .await
        .expect("Failed to create storage manager");

    let api_state = ApiState::new(Arc::clone(&db), config.clone(), storage, engine);
    let app = Router::new()
        .nest(&config.api_prefix, api_routes(&api_state))
        .with_state(api_state);

    let server = TestServer::new(app).expect("Failed to start test server");
    (server, db)
}
