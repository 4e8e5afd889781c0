use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    sync::Arc,
};

use async_openai::{config::OpenAIConfig, types::CreateEmbeddingRequestArgs, Client};

use crate::{error::AppError, utils::config::AppConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    OpenAI,
    Hashed,
}

impl Default for EmbeddingBackend {
    fn default() -> Self {
        Self::OpenAI
    }
}

/// Produces embedding vectors for chunks and prompts. The `hashed` backend is
/// deterministic and offline; it exists so retrieval can be exercised without
/// a network dependency.
#[derive(Clone)]
pub struct EmbeddingProvider {
    inner: EmbeddingInner,
}

#[derive(Clone)]
enum EmbeddingInner {
    OpenAI {
        client: Arc<Client<OpenAIConfig>>,
        model: String,
        dimensions: u32,
    },
    Hashed {
        dimension: usize,
    },
}

impl EmbeddingProvider {
    pub fn from_config(
        config: &AppConfig,
        openai_client: Option<Arc<Client<OpenAIConfig>>>,
    ) -> Result<Self, AppError> {
        let inner = match config.embedding_backend {
            EmbeddingBackend::OpenAI => {
                let client = openai_client.ok_or_else(|| {
                    AppError::Validation(
                        "openai embedding backend requires an OpenAI client".to_string(),
                    )
                })?;
                EmbeddingInner::OpenAI {
                    client,
                    model: config.embedding_model.clone(),
                    dimensions: config.embedding_dimensions,
                }
            }
            EmbeddingBackend::Hashed => EmbeddingInner::Hashed {
                dimension: config.embedding_dimensions as usize,
            },
        };

        Ok(Self { inner })
    }

    pub fn backend_label(&self) -> &'static str {
        match self.inner {
            EmbeddingInner::OpenAI { .. } => "openai",
            EmbeddingInner::Hashed { .. } => "hashed",
        }
    }

    pub fn dimension(&self) -> usize {
        match &self.inner {
            EmbeddingInner::OpenAI { dimensions, .. } => *dimensions as usize,
            EmbeddingInner::Hashed { dimension } => *dimension,
        }
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, AppError> {
        let texts = [text.to_string()];
        let mut vectors = self.embed_batch(&texts).await?;
        vectors
            .pop()
            .ok_or_else(|| AppError::Engine("embedding backend returned no vector".to_string()))
    }

    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        match &self.inner {
            EmbeddingInner::OpenAI {
                client,
                model,
                dimensions,
            } => {
                let request = CreateEmbeddingRequestArgs::default()
                    .model(model)
                    .dimensions(*dimensions)
                    .input(texts.to_vec())
                    .build()?;

                let response = client.embeddings().create(request).await?;
                Ok(response.data.into_iter().map(|d| d.embedding).collect())
            }
            EmbeddingInner::Hashed { dimension } => Ok(texts
                .iter()
                .map(|text| hashed_embedding(text, *dimension))
                .collect()),
        }
    }
}

/// Token-bucket embedding: hash each token into a bucket, count, normalize.
fn hashed_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let mut vector = vec![0f32; dimension];
    if dimension == 0 {
        return vector;
    }

    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let mut hasher = DefaultHasher::new();
        token.to_ascii_lowercase().hash(&mut hasher);
        let bucket = usize::try_from(hasher.finish() % dimension as u64).unwrap_or(0);
        if let Some(slot) = vector.get_mut(bucket) {
            *slot += 1.0;
        }
    }

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut vector {
            *value /= norm;
        }
    }

    vector
}
