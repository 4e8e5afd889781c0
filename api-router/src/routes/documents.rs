use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart};
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info, warn};

use common::{error::AppError, storage::types::document::Document};
use index_engine::IndexMetadata;

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, TryFromMultipart)]
pub struct ProcessDocumentsParams {
    #[form_data(limit = "10000000")]
    #[form_data(default)]
    pub files: Vec<FieldData<Bytes>>,
}

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub success: bool,
    pub message: String,
    pub vector_ids: Option<Vec<String>>,
}

/// Files are processed independently and in order. A failure stops the batch
/// and the response names the failing file while still listing the documents
/// that were already persisted, so partial success is always explicit.
pub async fn process_documents(
    State(state): State<ApiState>,
    TypedMultipart(input): TypedMultipart<ProcessDocumentsParams>,
) -> Result<impl IntoResponse, ApiError> {
    if input.files.is_empty() {
        return Err(ApiError::ValidationError(
            "no files supplied in the upload".to_string(),
        ));
    }

    info!(file_count = input.files.len(), "Received document processing request");

    let mut vector_ids = Vec::new();
    for file in input.files {
        let file_name = file
            .metadata
            .file_name
            .clone()
            .unwrap_or_else(|| "unnamed".to_string());

        match ingest_file(&state, file, &file_name).await {
            Ok(document_id) => vector_ids.push(document_id),
            Err(err) => {
                error!(file_name = %file_name, error = %err, "Document processing failed");
                let response = DocumentResponse {
                    success: false,
                    message: format!(
                        "Failed to process '{file_name}'; {} earlier document(s) in the batch were already indexed",
                        vector_ids.len()
                    ),
                    vector_ids: (!vector_ids.is_empty()).then_some(vector_ids),
                };
                return Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(response)));
            }
        }
    }

    let response = DocumentResponse {
        success: true,
        message: format!("Successfully processed {} documents", vector_ids.len()),
        vector_ids: Some(vector_ids),
    };
    Ok((StatusCode::OK, Json(response)))
}

/// Index build comes before persistence: a failed build leaves no document
/// record behind.
async fn ingest_file(
    state: &ApiState,
    file: FieldData<Bytes>,
    file_name: &str,
) -> Result<String, AppError> {
    let content_type = file.metadata.content_type.clone().unwrap_or_else(|| {
        mime_guess::from_path(file_name)
            .first_or(mime::APPLICATION_OCTET_STREAM)
            .to_string()
    });
    let bytes = file.contents;

    let text = String::from_utf8(bytes.to_vec())
        .map_err(|_| AppError::Decode(format!("'{file_name}' is not valid UTF-8 text")))?;

    let document_id = Document::generate_id();
    let metadata = IndexMetadata {
        document_id: document_id.clone(),
        file_name: file_name.to_string(),
        content_type: content_type.clone(),
        uploaded_at: Utc::now(),
    };

    let timeout_secs = state.config.capability_timeout_secs;
    let handle = tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        state.engine.build_index(&text, metadata),
    )
    .await
    .map_err(|_| AppError::Timeout(timeout_secs))??;

    let document = Document::new(
        document_id.clone(),
        file_name.to_string(),
        content_type,
        handle.to_string(),
    );
    state.db.store_item(document).await?;

    // Raw upload retention is best effort; the indexed text is authoritative.
    let location = format!("documents/{document_id}/{file_name}");
    if let Err(err) = state.storage.put(&location, bytes).await {
        warn!(document_id = %document_id, error = %err, "Failed to retain raw upload");
    }

    info!(document_id = %document_id, file_name = %file_name, "Document indexed");

    Ok(document_id)
}
