use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::ApiError;

/// One chunk as persisted: text plus its JSON metadata envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    pub chunk_id: String,
    pub content: String,
    pub metadata: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSearchResult {
    pub chunk: StoredChunk,
    /// Raw cosine similarity in -1..1.
    pub score: f32,
}

/// Storage and nearest-neighbour search for one collection.
#[async_trait]
pub trait RagStore: Send + Sync {
    /// Writes all items or none.
    async fn insert_batch(&self, items: Vec<(StoredChunk, Vec<f32>)>) -> Result<(), ApiError>;

    /// At most `limit` chunks, most similar first.
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<ChunkSearchResult>, ApiError>;

    async fn count(&self) -> Result<usize, ApiError>;
}
