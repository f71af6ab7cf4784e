use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::DocumentLookup;
use crate::core::errors::ApiError;
use crate::llm::types::ToolSpec;
use crate::rag::{RetrievedDocument, VectorCollection};

/// The two retrieval capabilities the agent can call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    News,
    Guideline,
}

impl ToolKind {
    pub const ALL: [ToolKind; 2] = [ToolKind::News, ToolKind::Guideline];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::News => "news_retriever",
            ToolKind::Guideline => "guideline_retriever",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "news_retriever" => Some(ToolKind::News),
            "guideline_retriever" => Some(ToolKind::Guideline),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolKind::News => {
                "Use this tool to retrieve information from CBC news articles and content. \
                 Suitable for queries about articles, headlines, or summaries."
            }
            ToolKind::Guideline => {
                "Use this tool to retrieve information from CBC's internal editorial guidelines \
                 (Journalistic Standards and Practices). Suitable for queries about editorial policies."
            }
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct RetrieverTool {
    kind: ToolKind,
    collection: Arc<VectorCollection>,
    top_k: usize,
    score_threshold: f32,
}

impl RetrieverTool {
    pub fn new(kind: ToolKind, collection: Arc<VectorCollection>, top_k: usize, score_threshold: f32) -> Self {
        Self {
            kind,
            collection,
            top_k,
            score_threshold,
        }
    }

    pub fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.kind.as_str().to_string(),
            description: self.kind.description().to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "query to look up in retriever"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    /// At most `top_k` documents scoring at least `score_threshold`; empty when
    /// nothing qualifies.
    pub async fn search(&self, query: &str) -> Result<Vec<RetrievedDocument>, ApiError> {
        let results = self
            .collection
            .similarity_search(query, self.top_k, self.score_threshold)
            .await?;
        tracing::debug!(
            "{} returned {} documents from '{}' for query {:?}",
            self.kind,
            results.len(),
            self.collection.name(),
            query
        );
        Ok(results.into_iter().map(|scored| scored.document).collect())
    }
}

#[async_trait]
impl DocumentLookup for RetrieverTool {
    async fn lookup(&self, query: &str) -> Result<Vec<RetrievedDocument>, ApiError> {
        self.search(query).await
    }
}

/// Text the model sees as the tool's observation.
pub fn render_documents(documents: &[RetrievedDocument]) -> String {
    documents
        .iter()
        .map(|doc| doc.page_content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[derive(Clone)]
pub struct ToolRegistry {
    news: Arc<RetrieverTool>,
    guideline: Arc<RetrieverTool>,
}

impl ToolRegistry {
    pub fn new(news: Arc<RetrieverTool>, guideline: Arc<RetrieverTool>) -> Self {
        Self { news, guideline }
    }

    pub fn get(&self, kind: ToolKind) -> &Arc<RetrieverTool> {
        match kind {
            ToolKind::News => &self.news,
            ToolKind::Guideline => &self.guideline,
        }
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        ToolKind::ALL.iter().map(|kind| self.get(*kind).spec()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::{GuidelineMetadata, NewsMetadata};

    #[test]
    fn tool_names_round_trip() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("web_search"), None);
        assert_eq!(ToolKind::from_name("News_Retriever"), None);
    }

    #[test]
    fn observation_text_joins_page_contents() {
        let docs = vec![
            RetrievedDocument::news("Content ID: 1\nHeadline: A\nBody", NewsMetadata::default()),
            RetrievedDocument::guideline("Section text", GuidelineMetadata::default()),
        ];
        assert_eq!(
            render_documents(&docs),
            "Content ID: 1\nHeadline: A\nBody\n\nSection text"
        );
        assert_eq!(render_documents(&[]), "");
    }
}
