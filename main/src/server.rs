use std::sync::Arc;

use api_router::{api_routes, api_state::ApiState};
use axum::{response::IntoResponse, routing::get, Json, Router};
use common::{
    storage::{db::SurrealDbClient, store::StorageManager},
    utils::{config::get_config, embedding::EmbeddingProvider},
};
use index_engine::{engine::VectorIndexEngine, RagEngine};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    // Get config
    let config = get_config()?;

    let db = Arc::new(
        SurrealDbClient::new(
            &config.surrealdb_address,
            &config.surrealdb_username,
            &config.surrealdb_password,
            &config.surrealdb_namespace,
            &config.surrealdb_database,
        )
        .await?,
    );

    let openai_client = Arc::new(async_openai::Client::with_config(
        async_openai::config::OpenAIConfig::new()
            .with_api_key(&config.openai_api_key)
            .with_api_base(&config.openai_base_url),
    ));

    let embedding_provider = Arc::new(EmbeddingProvider::from_config(
        &config,
        Some(Arc::clone(&openai_client)),
    )?);
    info!(
        embedding_backend = embedding_provider.backend_label(),
        embedding_dimension = embedding_provider.dimension(),
        "Embedding provider initialized"
    );

    // Schema and indexes must exist before the first request hits the store
    db.ensure_initialized(embedding_provider.dimension()).await?;

    let storage = StorageManager::new(&config).await?;

    let engine: Arc<dyn RagEngine> = Arc::new(VectorIndexEngine::new(
        Arc::clone(&db),
        openai_client,
        embedding_provider,
        &config,
    ));

    let api_state = ApiState::new(db, config.clone(), storage, engine);

    let app = Router::new()
        .route("/", get(root))
        .nest(&config.api_prefix, api_routes(&api_state))
        .with_state(api_state)
        .layer(CorsLayer::permissive());

    info!("Starting server listening on 0.0.0.0:{}", config.http_port);
    let serve_address = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(serve_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Document QA API is running" }))
}
