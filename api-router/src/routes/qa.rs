use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use common::{
    error::AppError,
    storage::types::{answer::Answer, document::Document},
};
use index_engine::IndexHandle;

use crate::{api_state::ApiState, error::ApiError};

/// Source excerpts in responses are cut at this many characters, with a
/// marker appended when anything was cut. The stored record keeps full text.
const MAX_EXCERPT_CHARS: usize = 100;
const TRUNCATION_MARKER: &str = "...";

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub prompt: String,
    pub document_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct QaResponse {
    pub id: String,
    pub answer: String,
    pub confidence: f64,
    pub sources: Vec<String>,
    pub upvotes: i64,
    pub downvotes: i64,
}

pub async fn query_documents(
    State(state): State<ApiState>,
    Json(request): Json<QuestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.prompt.trim().is_empty() {
        return Err(ApiError::ValidationError(
            "prompt must not be empty".to_string(),
        ));
    }
    if request.document_ids.is_empty() {
        return Err(ApiError::ValidationError(
            "document_ids must not be empty".to_string(),
        ));
    }

    info!(
        document_count = request.document_ids.len(),
        prompt_bytes = request.prompt.len(),
        "Received QA query"
    );

    // Unresolvable ids shrink the queried set rather than failing the call;
    // each miss is logged so the drop is never silent.
    let mut handles = Vec::new();
    let mut resolved_ids = Vec::new();
    for document_id in &request.document_ids {
        match state.db.get_item::<Document>(document_id).await? {
            Some(document) => {
                handles.push(IndexHandle::from(document.index_handle));
                resolved_ids.push(document.id);
            }
            None => warn!(document_id = %document_id, "Document id did not resolve; skipping"),
        }
    }

    if handles.is_empty() {
        return Err(ApiError::NotFound(
            "no content to query: none of the supplied document ids resolved".to_string(),
        ));
    }

    let timeout_secs = state.config.capability_timeout_secs;
    let ranked = tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        state.engine.answer(&request.prompt, &handles),
    )
    .await
    .map_err(|_| AppError::Timeout(timeout_secs))
    .map_err(ApiError::from)?
    .map_err(ApiError::from)?;

    let answer = Answer::new(
        request.prompt,
        ranked.text,
        ranked.sources,
        ranked.confidence,
        resolved_ids,
    );
    state.db.store_item(answer.clone()).await?;

    info!(answer_id = %answer.id, confidence = answer.confidence, "Answer generated");

    let sources = answer
        .sources
        .iter()
        .map(|source| truncate_excerpt(&source.text, MAX_EXCERPT_CHARS))
        .collect();

    Ok(Json(QaResponse {
        id: answer.id,
        answer: answer.answer,
        confidence: answer.confidence,
        sources,
        upvotes: answer.upvotes,
        downvotes: answer.downvotes,
    }))
}

fn truncate_excerpt(text: &str, max_chars: usize) -> String {
    let mut truncated: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        truncated.push_str(TRUNCATION_MARKER);
    }
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_excerpts_are_untouched() {
        assert_eq!(truncate_excerpt("The sky is blue.", 100), "The sky is blue.");
    }

    #[test]
    fn exact_length_excerpts_get_no_marker() {
        let text = "a".repeat(100);
        assert_eq!(truncate_excerpt(&text, 100), text);
    }

    #[test]
    fn long_excerpts_are_cut_with_a_marker() {
        let text = "a".repeat(150);
        let truncated = truncate_excerpt(&text, 100);
        assert_eq!(truncated.chars().count(), 103);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "ü".repeat(120);
        let truncated = truncate_excerpt(&text, 100);
        assert!(truncated.starts_with('ü'));
        assert!(truncated.ends_with("..."));
    }
}
