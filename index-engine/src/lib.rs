use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::{error::AppError, storage::types::answer::SourceExcerpt};

pub mod engine;
mod generation;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_engine;

/// Opaque reference to one document's index. Persisted as a plain string on
/// the document record and handed back verbatim at query time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexHandle(String);

impl IndexHandle {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for IndexHandle {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for IndexHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata attached to every chunk of an index at build time.
#[derive(Debug, Clone)]
pub struct IndexMetadata {
    pub document_id: String,
    pub file_name: String,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A generated answer with its supporting excerpts, best first.
#[derive(Debug, Clone)]
pub struct RankedAnswer {
    pub text: String,
    pub confidence: f64,
    pub sources: Vec<SourceExcerpt>,
}

/// The retrieval-augmented-generation capability the HTTP layer delegates to.
/// Everything behind it (chunking, embedding, search, generation) is opaque
/// to callers.
#[async_trait]
pub trait RagEngine: Send + Sync {
    /// Indexes one document's text and returns the handle to query it with.
    async fn build_index(
        &self,
        text: &str,
        metadata: IndexMetadata,
    ) -> Result<IndexHandle, AppError>;

    /// Answers a prompt against the given indices, queried in list order.
    async fn answer(
        &self,
        prompt: &str,
        handles: &[IndexHandle],
    ) -> Result<RankedAnswer, AppError>;
}
