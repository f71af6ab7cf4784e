use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to initialize LLM client: {0}")]
    Llm(#[source] anyhow::Error),

    #[error("Embedding service is not usable: {0}")]
    Embedding(#[source] anyhow::Error),

    #[error("Failed to open vector collection: {0}")]
    Collection(#[source] anyhow::Error),

    #[error("Failed to build agent: {0}")]
    Agent(#[source] anyhow::Error),
}
