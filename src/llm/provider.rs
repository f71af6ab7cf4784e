use async_trait::async_trait;

use crate::core::errors::ApiError;
use super::types::{AssistantTurn, ChatRequest};

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "openai")
    fn name(&self) -> &str;

    /// chat completion with optional tool calling (non-streaming)
    async fn complete(&self, request: ChatRequest, model_id: &str) -> Result<AssistantTurn, ApiError>;

    /// generate embeddings
    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, ApiError>;
}
