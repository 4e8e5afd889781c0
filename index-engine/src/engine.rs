use std::sync::Arc;

use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use futures::future::try_join_all;
use serde::Deserialize;
use text_splitter::TextSplitter;
use tracing::{debug, warn};

use common::{
    error::AppError,
    storage::{db::SurrealDbClient, types::answer::SourceExcerpt, types::index_chunk::IndexChunk},
    utils::{config::AppConfig, embedding::EmbeddingProvider},
};

use crate::{generation, IndexHandle, IndexMetadata, RagEngine, RankedAnswer};

const DEFAULT_CHUNK_CAPACITY: usize = 1000;
const DEFAULT_TOP_K: u8 = 8;
// HNSW search breadth; only needs to comfortably exceed top_k.
const KNN_EF: u8 = 40;

/// Production `RagEngine`: chunks with `text-splitter`, embeds through the
/// configured provider, stores chunk vectors under the SurrealDB HNSW index
/// and generates answers with a chat completion over the retrieved context.
pub struct VectorIndexEngine {
    db: Arc<SurrealDbClient>,
    chat_client: Arc<Client<OpenAIConfig>>,
    embedder: Arc<EmbeddingProvider>,
    query_model: String,
    chunk_capacity: usize,
    top_k: u8,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RetrievedChunk {
    pub chunk: String,
    pub document_id: String,
    pub file_name: String,
    pub distance: f64,
}

impl RetrievedChunk {
    pub(crate) fn similarity(&self) -> f64 {
        // Cosine distance lands in [0, 2]; clamp the mapped score into [0, 1].
        (1.0 - self.distance).clamp(0.0, 1.0)
    }
}

impl VectorIndexEngine {
    pub fn new(
        db: Arc<SurrealDbClient>,
        chat_client: Arc<Client<OpenAIConfig>>,
        embedder: Arc<EmbeddingProvider>,
        config: &AppConfig,
    ) -> Self {
        Self {
            db,
            chat_client,
            embedder,
            query_model: config.query_model.clone(),
            chunk_capacity: DEFAULT_CHUNK_CAPACITY,
            top_k: DEFAULT_TOP_K,
        }
    }

    async fn retrieve(
        &self,
        prompt: &str,
        handles: &[IndexHandle],
    ) -> Result<Vec<RetrievedChunk>, AppError> {
        let embedding = self.embedder.embed(prompt).await?;
        let index_ids: Vec<&str> = handles.iter().map(IndexHandle::as_str).collect();

        let query = format!(
            "SELECT chunk, document_id, file_name, vector::distance::knn() AS distance \
             FROM index_chunk \
             WHERE index_id IN {index_ids:?} AND embedding <|{k},{ef}|> {embedding:?} \
             ORDER BY distance",
            k = self.top_k,
            ef = KNN_EF,
        );

        let chunks: Vec<RetrievedChunk> = self.db.query(query).await?.take(0)?;
        Ok(chunks)
    }

    /// Removes every chunk stored under the handle. Cleans up after a
    /// partially failed index build; failures here are logged, not surfaced.
    async fn discard_index(&self, handle: &IndexHandle) {
        let result = self
            .db
            .query("DELETE index_chunk WHERE index_id = $index_id")
            .bind(("index_id", handle.as_str().to_string()))
            .await;
        if let Err(err) = result {
            warn!(
                index_handle = %handle,
                error = %err,
                "Failed to discard chunks of an unfinished index"
            );
        }
    }
}

#[async_trait]
impl RagEngine for VectorIndexEngine {
    async fn build_index(
        &self,
        text: &str,
        metadata: IndexMetadata,
    ) -> Result<IndexHandle, AppError> {
        let chunks: Vec<String> = TextSplitter::new(self.chunk_capacity)
            .chunks(text)
            .map(str::to_string)
            .collect();

        if chunks.is_empty() {
            return Err(AppError::Engine(format!(
                "'{}' produced no indexable text",
                metadata.file_name
            )));
        }

        let embeddings = self.embedder.embed_batch(&chunks).await?;
        let handle = IndexHandle::generate();

        let rows = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                IndexChunk::new(
                    handle.as_str(),
                    &metadata.document_id,
                    &metadata.file_name,
                    &metadata.content_type,
                    chunk,
                    embedding,
                )
            });
        if let Err(err) = try_join_all(rows.map(|row| self.db.store_item(row))).await {
            // A partial batch would leave rows nothing references; drop them
            // before surfacing the failure.
            self.discard_index(&handle).await;
            return Err(err.into());
        }

        debug!(
            index_handle = %handle,
            document_id = %metadata.document_id,
            "Built vector index"
        );

        Ok(handle)
    }

    async fn answer(
        &self,
        prompt: &str,
        handles: &[IndexHandle],
    ) -> Result<RankedAnswer, AppError> {
        let retrieved = self.retrieve(prompt, handles).await?;
        if retrieved.is_empty() {
            return Err(AppError::Engine(
                "vector search returned no chunks for the supplied indices".to_string(),
            ));
        }

        let context = generation::chunks_to_context(&retrieved);
        let user_message = generation::create_user_message(&context, prompt);
        let request = generation::create_chat_request(user_message, &self.query_model)?;
        let response = self.chat_client.chat().create(request).await?;
        let text = generation::extract_answer_text(&response)?;

        let confidence = retrieved.first().map_or(0.0, RetrievedChunk::similarity);
        let sources = retrieved
            .into_iter()
            .map(|chunk| SourceExcerpt {
                score: chunk.similarity(),
                text: chunk.chunk,
            })
            .collect();

        Ok(RankedAnswer {
            text,
            confidence,
            sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::utils::embedding::EmbeddingBackend;
    use uuid::Uuid;

    const TEST_DIMENSION: u32 = 64;

    async fn test_engine() -> VectorIndexEngine {
        let db = SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
            .await
            .expect("Failed to start in-memory surrealdb");
        db.ensure_initialized(TEST_DIMENSION as usize)
            .await
            .expect("Failed to initialize schema");

        let config = AppConfig {
            embedding_backend: EmbeddingBackend::Hashed,
            embedding_dimensions: TEST_DIMENSION,
            ..AppConfig::default()
        };
        let embedder =
            EmbeddingProvider::from_config(&config, None).expect("Failed to build embedder");
        // Never called in these tests; generation requires the network.
        let chat_client = Client::with_config(OpenAIConfig::new());

        VectorIndexEngine::new(
            Arc::new(db),
            Arc::new(chat_client),
            Arc::new(embedder),
            &config,
        )
    }

    fn metadata(document_id: &str, file_name: &str) -> IndexMetadata {
        IndexMetadata {
            document_id: document_id.to_string(),
            file_name: file_name.to_string(),
            content_type: "text/plain".to_string(),
            uploaded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn build_index_then_retrieve_finds_the_chunk() {
        let engine = test_engine().await;

        let handle = engine
            .build_index("The sky is blue on a clear day.", metadata("doc-1", "sky.txt"))
            .await
            .expect("Failed to build index");

        let hits = engine
            .retrieve("What color is the sky?", &[handle])
            .await
            .expect("Retrieval failed");

        assert!(!hits.is_empty());
        let top = hits.first().expect("empty hits");
        assert_eq!(top.document_id, "doc-1");
        assert_eq!(top.file_name, "sky.txt");
        assert!(top.chunk.contains("sky"));
    }

    #[tokio::test]
    async fn retrieval_is_scoped_to_the_given_handles() {
        let engine = test_engine().await;

        engine
            .build_index("The sky is blue.", metadata("doc-1", "sky.txt"))
            .await
            .expect("Failed to build index");

        let unrelated = IndexHandle::from("no-such-index".to_string());
        let hits = engine
            .retrieve("sky", &[unrelated])
            .await
            .expect("Retrieval failed");

        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn discarded_index_leaves_no_chunks_behind() {
        let engine = test_engine().await;

        let kept = engine
            .build_index("The sky is blue.", metadata("doc-1", "sky.txt"))
            .await
            .expect("Failed to build index");
        let dropped = engine
            .build_index("The ocean is deep.", metadata("doc-2", "ocean.txt"))
            .await
            .expect("Failed to build index");

        engine.discard_index(&dropped).await;

        let hits = engine
            .retrieve("ocean", &[dropped])
            .await
            .expect("Retrieval failed");
        assert!(hits.is_empty());

        // Other indices are untouched.
        let hits = engine
            .retrieve("sky", &[kept])
            .await
            .expect("Retrieval failed");
        assert!(!hits.is_empty());
    }

    #[tokio::test]
    async fn empty_text_is_rejected() {
        let engine = test_engine().await;

        let result = engine
            .build_index("", metadata("doc-1", "empty.txt"))
            .await;
        assert!(matches!(result, Err(AppError::Engine(_))));
    }
}
