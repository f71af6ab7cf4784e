use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use newsroom_agent::agent::{AgentOutcome, AgentRunner, Observation, ToolInvocationRecord, ToolName};
use newsroom_agent::attribution::SourceCitation;
use newsroom_agent::chat::ChatService;
use newsroom_agent::core::config::settings::SessionSettings;
use newsroom_agent::core::errors::ApiError;
use newsroom_agent::rag::{NewsMetadata, RetrievedDocument};
use newsroom_agent::session::{SessionMessage, SessionStore};
use newsroom_agent::tools::{DocumentLookup, ToolKind};

/// Replays a fixed trace regardless of input.
struct ReplayAgent {
    output: String,
    trace: Vec<ToolInvocationRecord>,
}

#[async_trait]
impl AgentRunner for ReplayAgent {
    async fn run(&self, _input: &str, _history: &[SessionMessage]) -> Result<AgentOutcome, ApiError> {
        Ok(AgentOutcome {
            output: self.output.clone(),
            intermediate_steps: self.trace.clone(),
        })
    }
}

struct FailingAgent;

#[async_trait]
impl AgentRunner for FailingAgent {
    async fn run(&self, _input: &str, _history: &[SessionMessage]) -> Result<AgentOutcome, ApiError> {
        Err(ApiError::ServiceUnavailable("completion request failed".to_string()))
    }
}

#[derive(Default)]
struct RecordingLookup {
    documents: Vec<RetrievedDocument>,
    queries: Mutex<Vec<String>>,
}

#[async_trait]
impl DocumentLookup for RecordingLookup {
    async fn lookup(&self, query: &str) -> Result<Vec<RetrievedDocument>, ApiError> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self.documents.clone())
    }
}

fn article(id: &str, headline: &str) -> RetrievedDocument {
    RetrievedDocument::news(
        format!("Content ID: {}\nHeadline: {}\nBody", id, headline),
        NewsMetadata {
            content_id: id.to_string(),
            content_headline: headline.to_string(),
            ..Default::default()
        },
    )
}

fn service(agent: Arc<dyn AgentRunner>, news: Arc<RecordingLookup>) -> ChatService {
    ChatService::new(
        agent,
        news,
        Arc::new(RecordingLookup::default()),
        Arc::new(SessionStore::new(SessionSettings::default())),
        Duration::from_secs(5),
    )
}

#[tokio::test]
async fn seo_headline_request_cites_the_article() {
    let agent = ReplayAgent {
        output: "Suggested headline: Budget day brings new spending".to_string(),
        trace: vec![ToolInvocationRecord::new(
            ToolName::Known(ToolKind::News),
            json!({ "query": "1.6590078" }),
            Observation::from_documents(vec![article("1.6590078", "Budget day")]),
        )],
    };
    let news = Arc::new(RecordingLookup::default());
    let chat = service(Arc::new(agent), news.clone());

    let reply = chat
        .chat("Suggest SEO headline for article: 1.6590078", None)
        .await;

    assert_eq!(
        reply.response.sources,
        vec![SourceCitation::News {
            content_id: "1.6590078".to_string(),
            content_headline: "Budget day".to_string(),
        }]
    );
    assert!(news.queries.lock().unwrap().is_empty());

    let body: serde_json::Value = serde_json::from_str(&reply.response.to_json()).unwrap();
    assert_eq!(body["sources"][0]["type"], "news");
    assert_eq!(body["sources"][0]["content_id"], "1.6590078");
}

#[tokio::test]
async fn raw_text_trace_uses_the_user_question_for_fallback() {
    let agent = ReplayAgent {
        output: "Here is what I found".to_string(),
        trace: vec![ToolInvocationRecord::from_value(&json!({
            "tool": "news_retriever",
            "tool_input": { "query": "rewritten by model" },
            "observation": "Content ID: 2\nHeadline: Flood warning"
        }))],
    };
    let news = Arc::new(RecordingLookup {
        documents: vec![article("2", "Flood warning")],
        ..Default::default()
    });
    let chat = service(Arc::new(agent), news.clone());

    let reply = chat.chat("  any flood news?  ", Some("reader-1")).await;

    assert_eq!(reply.session_id, "reader-1");
    assert_eq!(news.queries.lock().unwrap().as_slice(), ["any flood news?"]);
    assert_eq!(reply.response.sources.len(), 1);
}

#[tokio::test]
async fn agent_failure_yields_error_answer_and_no_sources() {
    let chat = service(Arc::new(FailingAgent), Arc::new(RecordingLookup::default()));
    let reply = chat.chat("hello", Some("s")).await;

    assert_eq!(
        reply.response.answer,
        "Error: service unavailable: completion request failed"
    );
    assert!(reply.response.sources.is_empty());
    assert_eq!(chat.sessions().history("s").await.unwrap().len(), 0);
}
