pub mod embedding;
pub mod openai;
pub mod provider;
pub mod types;

pub use embedding::{Embedder, ProviderEmbedder};
pub use openai::OpenAiProvider;
pub use provider::LlmProvider;
pub use types::{AssistantTurn, ChatMessage, ChatRequest, ToolCall, ToolSpec};
