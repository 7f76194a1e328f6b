//! HTTP API endpoint handlers for health and session inspection.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Map;

use crate::{
    domain::SessionId,
    infrastructure::dto::http::{ErrorResponse, SessionResponse, SketchResponse},
    ui::{fanout::editor_info, state::AppState},
    usecase::GameSession,
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

async fn find_session(state: &AppState, raw_id: String) -> Result<Arc<GameSession>, Response> {
    let not_found = || error_response(StatusCode::NOT_FOUND, "Session not found");
    let session_id = SessionId::new(raw_id).map_err(|_| not_found())?;
    state.registry.get(&session_id).await.ok_or_else(not_found)
}

/// Current value of every slot of a session
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, Response> {
    let session = find_session(&state, session_id).await?;

    let mut slots = Map::new();
    for (slot, value) in session.state().snapshot().await {
        slots.insert(slot.as_str().to_string(), value);
    }
    Ok(Json(SessionResponse {
        session_id: session.session_id().to_string(),
        state: slots,
        editor: editor_info(session.editor_state().await),
    }))
}

/// Running code of a session, repaired for the sandboxed renderer
pub async fn get_sketch(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SketchResponse>, Response> {
    let session = find_session(&state, session_id).await?;
    let sketch = session.sketch().await.map_err(|e| {
        tracing::error!("Failed to read sketch of '{}': {}", session.session_id(), e);
        error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    Ok(Json(SketchResponse {
        code: sketch.code,
        repairs: sketch.actions.iter().map(ToString::to_string).collect(),
        fallback_reason: sketch.fallback.map(|reason| reason.to_string()),
    }))
}

/// Fallback for routes that exist but not for the request's method
pub async fn method_not_allowed() -> Response {
    error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}
