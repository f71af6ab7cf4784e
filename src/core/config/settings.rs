//! Typed view over the merged configuration value.
//!
//! Every section and field has a default, so an empty `config.yml` yields a
//! working (if unauthenticated) setup.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub server: ServerSettings,
    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub retrieval: RetrievalSettings,
    pub collections: CollectionSettings,
    pub ingestion: IngestionSettings,
    pub agent: AgentSettings,
    pub session: SessionSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub chat_model: String,
    pub temperature: Option<f64>,
    pub request_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: None,
            chat_model: "gpt-4o".to_string(),
            temperature: None,
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model: String,
    pub dimension: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
            batch_size: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub score_threshold: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            score_threshold: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionSettings {
    pub news_path: String,
    pub guideline_path: String,
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self {
            news_path: "news.db".to_string(),
            guideline_path: "guidelines.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionSettings {
    pub news_chunk_size: usize,
    pub news_chunk_overlap: usize,
    pub guideline_chunk_size: usize,
    pub guideline_chunk_overlap: usize,
    pub page_timeout_secs: u64,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            news_chunk_size: 500,
            news_chunk_overlap: 100,
            guideline_chunk_size: 5000,
            guideline_chunk_overlap: 100,
            page_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub system_prompt_path: String,
    pub max_steps: usize,
    pub timeout_secs: u64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            system_prompt_path: "system_prompt.txt".to_string(),
            max_steps: 6,
            timeout_secs: 120,
        }
    }
}

/// Session lifecycle. Both limits are off by default: sessions live for the
/// life of the process and keep their whole transcript.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub idle_ttl_secs: Option<u64>,
    pub max_messages: Option<usize>,
}
