//! SQLite-backed vector collection.
//!
//! One database file per collection. Chunk text, JSON metadata and the
//! embedding (little-endian f32 blob) live in a single `chunks` table;
//! search scans every row and ranks by cosine similarity.

use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;

use super::store::{ChunkSearchResult, RagStore, StoredChunk};
use crate::core::errors::ApiError;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS chunks (
    chunk_id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    metadata TEXT NOT NULL,
    dimension INTEGER NOT NULL,
    embedding BLOB NOT NULL,
    created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
)";

pub struct SqliteRagStore {
    pool: SqlitePool,
}

impl SqliteRagStore {
    pub async fn with_path(db_path: PathBuf) -> Result<Self, ApiError> {
        if let Some(parent) = db_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|err| {
                ApiError::ServiceUnavailable(format!("cannot open {}: {}", db_path.display(), err))
            })?;

        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(Self { pool })
    }
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|value| value.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

fn norm(vector: &[f32]) -> f32 {
    vector.iter().map(|v| v * v).sum::<f32>().sqrt()
}

/// Cosine similarity against a query whose norm is already known. Zero
/// vectors score 0.
fn cosine(query: &[f32], query_norm: f32, stored: &[f32]) -> f32 {
    let denom = query_norm * norm(stored);
    if denom <= f32::EPSILON {
        return 0.0;
    }
    let dot: f32 = query.iter().zip(stored).map(|(a, b)| a * b).sum();
    dot / denom
}

#[async_trait]
impl RagStore for SqliteRagStore {
    async fn insert_batch(&self, items: Vec<(StoredChunk, Vec<f32>)>) -> Result<(), ApiError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;
        for (chunk, embedding) in &items {
            let metadata = serde_json::to_string(&chunk.metadata).map_err(ApiError::internal)?;
            sqlx::query(
                "INSERT INTO chunks (chunk_id, content, metadata, dimension, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(&chunk.chunk_id)
            .bind(&chunk.content)
            .bind(metadata)
            .bind(embedding.len() as i64)
            .bind(encode_embedding(embedding))
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;
        }
        tx.commit().await.map_err(ApiError::internal)?;

        Ok(())
    }

    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<ChunkSearchResult>, ApiError> {
        if limit == 0 || query_embedding.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<(String, String, String, Vec<u8>)> = sqlx::query_as(
            "SELECT chunk_id, content, metadata, embedding
             FROM chunks
             WHERE dimension = ?1
             ORDER BY created_at, chunk_id",
        )
        .bind(query_embedding.len() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        let query_norm = norm(query_embedding);
        let mut scored = Vec::with_capacity(rows.len());
        for (chunk_id, content, metadata, embedding) in rows {
            let metadata = match serde_json::from_str(&metadata) {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!("Chunk {} has invalid metadata JSON: {}", chunk_id, err);
                    continue;
                }
            };
            let score = cosine(query_embedding, query_norm, &decode_embedding(&embedding));
            scored.push(ChunkSearchResult {
                chunk: StoredChunk {
                    chunk_id,
                    content,
                    metadata,
                },
                score,
            });
        }

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn count(&self) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(count.max(0) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn store() -> SqliteRagStore {
        let path = std::env::temp_dir().join(format!("newsroom-store-{}.db", uuid::Uuid::new_v4()));
        SqliteRagStore::with_path(path).await.unwrap()
    }

    fn chunk(id: &str) -> StoredChunk {
        StoredChunk {
            chunk_id: id.to_string(),
            content: format!("text of {}", id),
            metadata: json!({ "document_type": "news_article", "content_id": id }),
        }
    }

    #[tokio::test]
    async fn ranks_by_cosine_and_truncates() {
        let store = store().await;
        store
            .insert_batch(vec![
                (chunk("far"), vec![0.0, 1.0]),
                (chunk("near"), vec![0.9, 0.1]),
                (chunk("exact"), vec![2.0, 0.0]),
            ])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 3);

        let results = store.search(&[1.0, 0.0], 2).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.chunk.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "near"]);
        assert!((results[0].score - 1.0).abs() < 1e-6);
        assert_eq!(results[0].chunk.metadata["content_id"], "exact");
    }

    #[tokio::test]
    async fn rows_of_another_dimension_are_ignored() {
        let store = store().await;
        store
            .insert_batch(vec![(chunk("three"), vec![1.0, 0.0, 0.0]), (chunk("two"), vec![1.0, 0.0])])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.chunk_id, "two");
    }

    #[tokio::test]
    async fn duplicate_chunk_ids_are_rejected() {
        let store = store().await;
        store.insert_batch(vec![(chunk("a"), vec![1.0])]).await.unwrap();
        assert!(store.insert_batch(vec![(chunk("a"), vec![1.0])]).await.is_err());
        assert_eq!(store.count().await.unwrap(), 1);
        assert!(store.insert_batch(Vec::new()).await.is_ok());
    }

    #[test]
    fn embedding_blob_is_little_endian_f32() {
        let original = vec![0.25_f32, -1.5, 3.0];
        let bytes = encode_embedding(&original);
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[..4], &0.25_f32.to_le_bytes());
        assert_eq!(decode_embedding(&bytes), original);
        assert_eq!(cosine(&[0.0, 0.0], 0.0, &[1.0, 0.0]), 0.0);
    }
}
