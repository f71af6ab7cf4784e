use std::sync::Arc;

use async_trait::async_trait;

use crate::core::errors::ApiError;
use super::provider::LlmProvider;

/// Maps text to fixed-length vectors. Ingestion and search must share one
/// embedder so chunk and query vectors are comparable.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        let mut vectors = self.embed_documents(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| ApiError::Internal("Embedding service returned no vector".to_string()))
    }
}

pub struct ProviderEmbedder {
    provider: Arc<dyn LlmProvider>,
    model: String,
    dimension: usize,
    batch_size: usize,
}

impl ProviderEmbedder {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        model: impl Into<String>,
        dimension: usize,
        batch_size: usize,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            dimension,
            batch_size: batch_size.max(1),
        }
    }

    /// Embeds a short probe string to confirm the service is reachable and
    /// produces vectors of the configured dimension.
    pub async fn probe(&self) -> Result<(), ApiError> {
        self.embed_query("connectivity check").await.map(|_| ())
    }
}

#[async_trait]
impl Embedder for ProviderEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let embedded = self.provider.embed(batch, &self.model).await?;
            for vector in &embedded {
                check_dimension(vector, self.dimension)?;
            }
            vectors.extend(embedded);
        }
        Ok(vectors)
    }
}

pub fn check_dimension(vector: &[f32], expected: usize) -> Result<(), ApiError> {
    if vector.len() != expected {
        return Err(ApiError::Internal(format!(
            "Embedding dimension mismatch: expected {}, got {}",
            expected,
            vector.len()
        )));
    }
    Ok(())
}
