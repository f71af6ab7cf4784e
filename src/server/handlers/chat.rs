use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderName, HeaderValue};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub const SESSION_HEADER: &str = "x-session-id";

#[derive(Debug, Deserialize)]
pub struct ChatPayload {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// The answer body is always `{answer, sources}`; agent failures are reported
/// inside `answer` rather than as an HTTP error.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatPayload>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(session_id) = &payload.session_id {
        HeaderValue::from_str(session_id)
            .map_err(|_| ApiError::BadRequest("session_id contains invalid characters".to_string()))?;
    }

    let reply = state
        .chat
        .chat(&payload.message, payload.session_id.as_deref())
        .await;

    let session_header = HeaderValue::from_str(&reply.session_id).map_err(ApiError::internal)?;

    Ok((
        [(HeaderName::from_static(SESSION_HEADER), session_header)],
        Json(reply.response),
    ))
}
