use std::sync::Arc;
use std::time::Duration;

use crate::agent::{PromptTemplate, ToolCallingAgent};
use crate::chat::ChatService;
use crate::core::config::{AppPaths, AppSettings, ConfigService};
use crate::llm::{Embedder, LlmProvider, OpenAiProvider, ProviderEmbedder};
use crate::rag::VectorCollection;
use crate::session::SessionStore;
use crate::tools::{RetrieverTool, ToolKind, ToolRegistry};

pub mod error;

use error::InitializationError;

/// LLM client plus the two opened collections. Shared by the server and the
/// ingestion CLI so both embed with the same model.
pub struct Backends {
    pub provider: Arc<dyn LlmProvider>,
    pub news: Arc<VectorCollection>,
    pub guidelines: Arc<VectorCollection>,
}

impl Backends {
    /// Builds the provider, probes the embedding service once and opens both
    /// collections. Any failure here is fatal.
    pub async fn open(paths: &AppPaths, settings: &AppSettings) -> Result<Self, InitializationError> {
        let llm = &settings.llm;
        let provider: Arc<dyn LlmProvider> = Arc::new(
            OpenAiProvider::new(
                llm.base_url.clone(),
                llm.api_key.clone(),
                Duration::from_secs(llm.request_timeout_secs),
            )
            .map_err(|e| InitializationError::Llm(e.into()))?,
        );
        if llm.api_key.is_none() {
            tracing::warn!("No API key configured for {}; requests will be unauthenticated", llm.base_url);
        }
        tracing::info!("Using {} provider at {}", provider.name(), llm.base_url);

        let embedder = ProviderEmbedder::new(
            provider.clone(),
            settings.embedding.model.clone(),
            settings.embedding.dimension,
            settings.embedding.batch_size,
        );
        embedder
            .probe()
            .await
            .map_err(|e| InitializationError::Embedding(e.into()))?;
        tracing::info!(
            "Embedding service ready ({}, dimension {})",
            settings.embedding.model,
            settings.embedding.dimension
        );
        let embedder: Arc<dyn Embedder> = Arc::new(embedder);

        let collections = &settings.collections;
        let news = VectorCollection::open_sqlite(
            "news",
            paths.resolve_data_path(&collections.news_path),
            embedder.clone(),
        )
        .await
        .map_err(|e| InitializationError::Collection(e.into()))?;
        let guidelines = VectorCollection::open_sqlite(
            "guidelines",
            paths.resolve_data_path(&collections.guideline_path),
            embedder,
        )
        .await
        .map_err(|e| InitializationError::Collection(e.into()))?;

        Ok(Self {
            provider,
            news: Arc::new(news),
            guidelines: Arc::new(guidelines),
        })
    }
}

/// Shared state for all routes.
#[derive(Clone)]
pub struct AppState {
    pub config: ConfigService,
    pub settings: Arc<AppSettings>,
    pub sessions: Arc<SessionStore>,
    pub chat: Arc<ChatService>,
}

impl AppState {
    /// 1. load and validate configuration
    /// 2. open the LLM client and vector collections
    /// 3. wire retrieval tools, the agent and the chat service
    pub async fn initialize_with(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone());
        let settings = config
            .load_settings()
            .map_err(|e| InitializationError::Config(e.into()))?;

        let backends = Backends::open(&paths, &settings).await?;

        let retrieval = &settings.retrieval;
        let news_tool = Arc::new(RetrieverTool::new(
            ToolKind::News,
            backends.news.clone(),
            retrieval.top_k,
            retrieval.score_threshold,
        ));
        let guideline_tool = Arc::new(RetrieverTool::new(
            ToolKind::Guideline,
            backends.guidelines.clone(),
            retrieval.top_k,
            retrieval.score_threshold,
        ));

        let prompt_path = paths.resolve_input_path(&settings.agent.system_prompt_path);
        let prompt = PromptTemplate::load(&prompt_path).map_err(|e| InitializationError::Agent(e.into()))?;

        let agent = ToolCallingAgent::new(
            backends.provider.clone(),
            settings.llm.chat_model.clone(),
            prompt,
            ToolRegistry::new(news_tool.clone(), guideline_tool.clone()),
        )
        .with_max_steps(settings.agent.max_steps)
        .with_temperature(settings.llm.temperature);

        let sessions = Arc::new(SessionStore::new(settings.session.clone()));
        let chat = Arc::new(ChatService::new(
            Arc::new(agent),
            news_tool,
            guideline_tool,
            sessions.clone(),
            Duration::from_secs(settings.agent.timeout_secs),
        ));

        Ok(Self::from_parts(config, settings, sessions, chat))
    }

    pub fn from_parts(
        config: ConfigService,
        settings: AppSettings,
        sessions: Arc<SessionStore>,
        chat: Arc<ChatService>,
    ) -> Arc<Self> {
        Arc::new(AppState {
            config,
            settings: Arc::new(settings),
            sessions,
            chat,
        })
    }
}
