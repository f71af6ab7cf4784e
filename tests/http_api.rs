use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use newsroom_agent::agent::{AgentOutcome, AgentRunner};
use newsroom_agent::chat::ChatService;
use newsroom_agent::core::config::{AppPaths, ConfigService};
use newsroom_agent::core::errors::ApiError;
use newsroom_agent::rag::RetrievedDocument;
use newsroom_agent::server::handlers::chat::SESSION_HEADER;
use newsroom_agent::server::router::router;
use newsroom_agent::session::{SessionMessage, SessionStore};
use newsroom_agent::state::AppState;
use newsroom_agent::tools::DocumentLookup;

struct EchoAgent;

#[async_trait]
impl AgentRunner for EchoAgent {
    async fn run(&self, input: &str, _history: &[SessionMessage]) -> Result<AgentOutcome, ApiError> {
        Ok(AgentOutcome {
            output: format!("echo: {}", input),
            intermediate_steps: Vec::new(),
        })
    }
}

struct NoDocuments;

#[async_trait]
impl DocumentLookup for NoDocuments {
    async fn lookup(&self, _query: &str) -> Result<Vec<RetrievedDocument>, ApiError> {
        Ok(Vec::new())
    }
}

struct Harness {
    _root: tempfile::TempDir,
    _data: tempfile::TempDir,
    state: Arc<AppState>,
}

fn harness() -> Harness {
    let root = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    std::fs::write(
        data.path().join("config.yml"),
        "llm:\n  base_url: https://llm.example\n  api_key: sk-very-secret\nretrieval:\n  top_k: 4\n",
    )
    .unwrap();

    let paths = Arc::new(AppPaths::from_dirs(
        root.path().to_path_buf(),
        data.path().to_path_buf(),
    ));
    let config = ConfigService::new(paths);
    let settings = config.load_settings().unwrap();
    let sessions = Arc::new(SessionStore::new(settings.session.clone()));
    let chat = Arc::new(ChatService::new(
        Arc::new(EchoAgent),
        Arc::new(NoDocuments),
        Arc::new(NoDocuments),
        sessions.clone(),
        Duration::from_secs(5),
    ));

    Harness {
        _root: root,
        _data: data,
        state: AppState::from_parts(config, settings, sessions, chat),
    }
}

fn post_chat(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn chat_returns_answer_and_session_header() {
    let harness = harness();
    let app = router(harness.state.clone());

    let response = app
        .clone()
        .oneshot(post_chat(json!({ "message": "hello", "session_id": "desk-7" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[SESSION_HEADER], "desk-7");
    let body = json_body(response).await;
    assert_eq!(body["answer"], "echo: hello");
    assert_eq!(body["sources"], json!([]));

    let response = app.oneshot(post_chat(json!({ "message": "hi" }))).await.unwrap();
    let generated = response.headers()[SESSION_HEADER].to_str().unwrap().to_string();
    assert!(!generated.is_empty());
    assert_ne!(generated, "desk-7");
}

#[tokio::test]
async fn invalid_session_id_is_rejected_before_the_turn_runs() {
    let harness = harness();
    let app = router(harness.state.clone());

    let response = app
        .oneshot(post_chat(json!({ "message": "hello", "session_id": "bad\nid" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("session_id"));
    assert_eq!(harness.state.sessions.len().await, 0);
}

#[tokio::test]
async fn session_transcript_is_served_and_unknown_ids_are_404() {
    let harness = harness();
    let app = router(harness.state.clone());

    app.clone()
        .oneshot(post_chat(json!({ "message": "first", "session_id": "s1" })))
        .await
        .unwrap();

    let response = app.clone().oneshot(get("/api/sessions/s1/messages")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["session_id"], "s1");
    assert_eq!(body["messages"][0]["role"], "human");
    assert_eq!(body["messages"][0]["content"], "first");
    assert_eq!(body["messages"][1]["content"], "echo: first");

    let response = app.oneshot(get("/api/sessions/nobody/messages")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn config_endpoint_redacts_secrets() {
    let harness = harness();
    let app = router(harness.state.clone());

    let response = app.oneshot(get("/api/config")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["llm"]["api_key"], "****");
    assert_eq!(body["llm"]["base_url"], "https://llm.example");
    assert_eq!(body["retrieval"]["top_k"], 4);
    assert!(!body.to_string().contains("sk-very-secret"));
}
