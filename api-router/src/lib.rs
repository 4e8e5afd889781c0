use api_state::ApiState;
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    routing::{get, post},
    Router,
};
use routes::{
    documents::process_documents, feedback::submit_feedback, liveness::live, qa::query_documents,
    readiness::ready,
};

pub mod api_state;
pub mod error;
mod routes;

/// Router for the document QA API. Nested under the configurable path prefix
/// by the binary.
pub fn api_routes<S>(app_state: &ApiState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    // Probe endpoints (for k8s/systemd probes)
    let probes = Router::new()
        .route("/ready", get(ready))
        .route("/live", get(live));

    let api = Router::new()
        .route(
            "/documents/process",
            post(process_documents)
                .layer(DefaultBodyLimit::max(app_state.config.max_upload_bytes)),
        )
        .route("/qa/query", post(query_documents))
        .route("/feedback", post(submit_feedback));

    probes.merge(api)
}
