use std::path::PathBuf;
use std::sync::Arc;

use uuid::Uuid;

use super::document::{DocumentMetadata, RetrievedDocument};
use super::sqlite::SqliteRagStore;
use super::store::{RagStore, StoredChunk};
use crate::core::errors::ApiError;
use crate::llm::embedding::{check_dimension, Embedder};

/// A named vector collection: embeds text on the way in and queries on the
/// way out, delegating storage and nearest-neighbour search to a `RagStore`.
pub struct VectorCollection {
    name: String,
    store: Arc<dyn RagStore>,
    embedder: Arc<dyn Embedder>,
}

#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: RetrievedDocument,
    /// Relevance on a 0..1 scale.
    pub score: f32,
}

impl VectorCollection {
    pub fn new(name: impl Into<String>, store: Arc<dyn RagStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            name: name.into(),
            store,
            embedder,
        }
    }

    /// Opens (creating if needed) a SQLite-backed collection.
    pub async fn open_sqlite(
        name: impl Into<String>,
        db_path: PathBuf,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, ApiError> {
        let name = name.into();
        let store = SqliteRagStore::with_path(db_path.clone()).await?;
        tracing::info!("Opened vector collection '{}' at {}", name, db_path.display());
        Ok(Self::new(name, Arc::new(store), embedder))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn count(&self) -> Result<usize, ApiError> {
        self.store.count().await
    }

    /// Embeds and stores each `(text, metadata)` pair under a fresh chunk id.
    /// Returns the number of chunks written.
    pub async fn upsert(&self, documents: Vec<(String, DocumentMetadata)>) -> Result<usize, ApiError> {
        if documents.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = documents.iter().map(|(text, _)| text.clone()).collect();
        let embeddings = self.embedder.embed_documents(&texts).await?;
        if embeddings.len() != documents.len() {
            return Err(ApiError::Internal(format!(
                "Embedder returned {} vectors for {} chunks",
                embeddings.len(),
                documents.len()
            )));
        }

        let mut items = Vec::with_capacity(documents.len());
        for ((content, metadata), embedding) in documents.into_iter().zip(embeddings) {
            let metadata = serde_json::to_value(&metadata).map_err(ApiError::internal)?;
            let chunk = StoredChunk {
                chunk_id: Uuid::new_v4().to_string(),
                content,
                metadata,
            };
            items.push((chunk, embedding));
        }

        let written = items.len();
        self.store.insert_batch(items).await?;
        tracing::debug!("Upserted {} chunks into '{}'", written, self.name);
        Ok(written)
    }

    /// Returns at most `k` documents whose relevance is at least `threshold`,
    /// best first. Cosine similarity is clamped into 0..1 to form the
    /// relevance score. Chunks with unreadable metadata are skipped without
    /// taking one of the `k` places.
    pub async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        threshold: f32,
    ) -> Result<Vec<ScoredDocument>, ApiError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed_query(query).await?;
        check_dimension(&query_embedding, self.embedder.dimension())?;

        let mut fetch = k;
        loop {
            let results = self.store.search(&query_embedding, fetch).await?;
            let exhausted = results.len() < fetch;
            let mut below_threshold = false;
            let mut documents = Vec::with_capacity(k);

            for result in results {
                let score = result.score.clamp(0.0, 1.0);
                if score < threshold {
                    below_threshold = true;
                    break;
                }
                match serde_json::from_value::<DocumentMetadata>(result.chunk.metadata) {
                    Ok(metadata) => documents.push(ScoredDocument {
                        document: RetrievedDocument {
                            page_content: result.chunk.content,
                            metadata,
                        },
                        score,
                    }),
                    Err(err) => {
                        tracing::warn!(
                            "Skipping chunk {} in '{}' with unreadable metadata: {}",
                            result.chunk.chunk_id,
                            self.name,
                            err
                        );
                    }
                }
                if documents.len() == k {
                    break;
                }
            }

            if documents.len() == k || below_threshold || exhausted {
                return Ok(documents);
            }
            fetch = fetch.saturating_mul(2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::rag::document::NewsMetadata;

    /// Embeds text by counting a few marker words, giving predictable cosines.
    struct KeywordEmbedder;

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        fn dimension(&self) -> usize {
            3
        }

        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
            Ok(texts
                .iter()
                .map(|text| {
                    let lower = text.to_lowercase();
                    vec![
                        lower.matches("election").count() as f32,
                        lower.matches("hockey").count() as f32,
                        lower.matches("weather").count() as f32 + 0.01,
                    ]
                })
                .collect())
        }
    }

    fn temp_db() -> PathBuf {
        std::env::temp_dir().join(format!("newsroom-collection-{}.db", Uuid::new_v4()))
    }

    async fn collection() -> VectorCollection {
        VectorCollection::open_sqlite("news", temp_db(), Arc::new(KeywordEmbedder))
            .await
            .unwrap()
    }

    fn news(id: &str) -> DocumentMetadata {
        DocumentMetadata::News(NewsMetadata {
            content_id: id.to_string(),
            content_headline: format!("Headline {}", id),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn search_filters_by_threshold_and_limit() {
        let collection = collection().await;
        let written = collection
            .upsert(vec![
                ("Election night results".to_string(), news("1")),
                ("Election debate recap, election polls".to_string(), news("2")),
                ("Hockey playoffs".to_string(), news("3")),
            ])
            .await
            .unwrap();
        assert_eq!(written, 3);
        assert_eq!(collection.count().await.unwrap(), 3);

        let results = collection.similarity_search("election", 5, 0.3).await.unwrap();
        let ids: Vec<String> = results
            .iter()
            .map(|r| r.document.as_news().unwrap().content_id.clone())
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(!ids.contains(&"3".to_string()));
        assert!(results.iter().all(|r| r.score >= 0.3 && r.score <= 1.0));

        let limited = collection.similarity_search("election", 1, 0.3).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn unreadable_metadata_does_not_use_up_the_limit() {
        let store = Arc::new(SqliteRagStore::with_path(temp_db()).await.unwrap());
        let broken = |id: &str| StoredChunk {
            chunk_id: id.to_string(),
            content: "Election special".to_string(),
            metadata: serde_json::json!({ "document_type": "podcast" }),
        };
        store
            .insert_batch(vec![
                (broken("bad-1"), vec![1.0, 0.0, 0.0]),
                (broken("bad-2"), vec![1.0, 0.0, 0.0]),
            ])
            .await
            .unwrap();

        let collection = VectorCollection::new("news", store, Arc::new(KeywordEmbedder));
        collection
            .upsert(vec![
                ("Election night results".to_string(), news("1")),
                ("Election polls, weather".to_string(), news("2")),
            ])
            .await
            .unwrap();

        let results = collection.similarity_search("election", 2, 0.3).await.unwrap();
        let ids: Vec<String> = results
            .iter()
            .map(|r| r.document.as_news().unwrap().content_id.clone())
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"1".to_string()) && ids.contains(&"2".to_string()));
    }

    #[tokio::test]
    async fn nothing_above_threshold_is_empty_not_error() {
        let collection = collection().await;
        collection
            .upsert(vec![("Hockey playoffs".to_string(), news("3"))])
            .await
            .unwrap();

        let results = collection.similarity_search("election", 5, 0.3).await.unwrap();
        assert!(results.is_empty());
    }
}
