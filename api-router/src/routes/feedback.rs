use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use common::storage::types::answer::{Answer, VoteCounts, VoteDirection};

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub answer_id: String,
    pub feedback_type: VoteDirection,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub success: bool,
    pub message: String,
    pub updated_counts: VoteCounts,
}

/// The increment and the returned totals come from one atomic statement, so
/// concurrent votes on the same answer never read stale counters.
pub async fn submit_feedback(
    State(state): State<ApiState>,
    Json(request): Json<FeedbackRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!(
        answer_id = %request.answer_id,
        direction = ?request.feedback_type,
        "Received feedback"
    );

    let updated = Answer::record_vote(&state.db, &request.answer_id, request.feedback_type)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(FeedbackResponse {
        success: true,
        message: "Feedback recorded successfully".to_string(),
        updated_counts: updated.counts(),
    }))
}
