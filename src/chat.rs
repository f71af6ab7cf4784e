use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::{AgentOutcome, AgentRunner};
use crate::attribution::{extract_sources, SourceCitation};
use crate::core::errors::ApiError;
use crate::session::SessionStore;
use crate::tools::DocumentLookup;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub sources: Vec<SourceCitation>,
}

impl ChatResponse {
    pub fn error(message: impl std::fmt::Display) -> Self {
        Self {
            answer: format!("Error: {}", message),
            sources: Vec::new(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| {
            String::from("{\"answer\": \"Error: response could not be serialized\", \"sources\": []}")
        })
    }
}

#[derive(Debug, Clone)]
pub struct ChatReply {
    pub session_id: String,
    pub response: ChatResponse,
}

/// Runs one user turn: agent, attribution, transcript update.
pub struct ChatService {
    agent: Arc<dyn AgentRunner>,
    news_lookup: Arc<dyn DocumentLookup>,
    guideline_lookup: Arc<dyn DocumentLookup>,
    sessions: Arc<SessionStore>,
    timeout: Duration,
}

impl ChatService {
    pub fn new(
        agent: Arc<dyn AgentRunner>,
        news_lookup: Arc<dyn DocumentLookup>,
        guideline_lookup: Arc<dyn DocumentLookup>,
        sessions: Arc<SessionStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            agent,
            news_lookup,
            guideline_lookup,
            sessions,
            timeout,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Always produces a response. Failures become an `"Error: ..."` answer
    /// with no sources and leave the transcript untouched.
    pub async fn chat(&self, message: &str, session_id: Option<&str>) -> ChatReply {
        let session_id = match session_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => Uuid::new_v4().to_string(),
        };

        let response = match self.answer(message, &session_id).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!("Chat turn failed for session {}: {}", session_id, err);
                ChatResponse::error(&err)
            }
        };

        ChatReply {
            session_id,
            response,
        }
    }

    async fn answer(&self, message: &str, session_id: &str) -> Result<ChatResponse, ApiError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ApiError::BadRequest("message must not be empty".to_string()));
        }

        let session = self.sessions.get(session_id).await;
        let mut session = session.lock().await;
        session.touch();
        let history = session.messages().to_vec();

        let AgentOutcome {
            output,
            intermediate_steps,
        } = tokio::time::timeout(self.timeout, self.agent.run(message, &history))
            .await
            .map_err(|_| {
                ApiError::Timeout(format!("agent did not finish within {:?}", self.timeout))
            })??;

        tracing::info!(
            "Session {}: agent used {} tool call(s)",
            session_id,
            intermediate_steps.len()
        );

        let sources = extract_sources(
            &intermediate_steps,
            self.news_lookup.as_ref(),
            self.guideline_lookup.as_ref(),
            message,
        )
        .await;

        session.record_turn(message, &output);

        Ok(ChatResponse {
            answer: output,
            sources,
        })
    }
}
