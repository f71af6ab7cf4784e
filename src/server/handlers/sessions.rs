use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn get_session_messages(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = state
        .sessions
        .history(&session_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("session {}", session_id)))?;

    Ok(Json(json!({
        "session_id": session_id,
        "messages": messages,
    })))
}
