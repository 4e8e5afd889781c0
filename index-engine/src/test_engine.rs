use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use common::{error::AppError, storage::types::answer::SourceExcerpt};

use crate::{IndexHandle, IndexMetadata, RagEngine, RankedAnswer};

/// Offline `RagEngine` for tests: remembers indexed text per handle and
/// returns a canned answer with the indexed text as its sources.
pub struct StaticRagEngine {
    answer: String,
    confidence: f64,
    indexed: Mutex<HashMap<IndexHandle, String>>,
}

impl StaticRagEngine {
    pub fn new(answer: impl Into<String>, confidence: f64) -> Self {
        Self {
            answer: answer.into(),
            confidence,
            indexed: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl RagEngine for StaticRagEngine {
    async fn build_index(
        &self,
        text: &str,
        _metadata: IndexMetadata,
    ) -> Result<IndexHandle, AppError> {
        let handle = IndexHandle::generate();
        self.indexed
            .lock()
            .await
            .insert(handle.clone(), text.to_string());
        Ok(handle)
    }

    async fn answer(
        &self,
        _prompt: &str,
        handles: &[IndexHandle],
    ) -> Result<RankedAnswer, AppError> {
        let indexed = self.indexed.lock().await;
        let sources: Vec<SourceExcerpt> = handles
            .iter()
            .filter_map(|handle| indexed.get(handle))
            .map(|text| SourceExcerpt {
                text: text.clone(),
                score: self.confidence,
            })
            .collect();

        if sources.is_empty() {
            return Err(AppError::Engine(
                "no indexed content for the supplied handles".to_string(),
            ));
        }

        Ok(RankedAnswer {
            text: self.answer.clone(),
            confidence: self.confidence,
            sources,
        })
    }
}

/// Always fails; used to exercise the capability-error path.
pub struct FailingRagEngine;

#[async_trait]
impl RagEngine for FailingRagEngine {
    async fn build_index(
        &self,
        _text: &str,
        _metadata: IndexMetadata,
    ) -> Result<IndexHandle, AppError> {
        Err(AppError::Engine("engine unavailable".to_string()))
    }

    async fn answer(
        &self,
        _prompt: &str,
        _handles: &[IndexHandle],
    ) -> Result<RankedAnswer, AppError> {
        Err(AppError::Engine("engine unavailable".to_string()))
    }
}
