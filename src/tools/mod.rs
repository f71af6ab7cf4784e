pub mod retriever;

use async_trait::async_trait;

use crate::core::errors::ApiError;
use crate::rag::RetrievedDocument;

pub use retriever::{render_documents, RetrieverTool, ToolKind, ToolRegistry};

/// Free-text query to documents, the contract shared by the retrieval tools
/// and the attribution fallback.
#[async_trait]
pub trait DocumentLookup: Send + Sync {
    async fn lookup(&self, query: &str) -> Result<Vec<RetrievedDocument>, ApiError>;
}
