//! `POST /api/chat`: the completion endpoint.
//!
//! Streams the configured provider's reply as raw text chunks.

use std::sync::Arc;

use axum::{
    Json,
    body::{Body, Bytes},
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use futures_util::StreamExt;

use crate::{domain::CompletionRequest, ui::state::AppState};

use super::http::error_response;

pub async fn chat_completion(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CompletionRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    tracing::info!(
        "Completion request with {} message(s), code state: {}",
        request.messages.len(),
        request.code_state.is_some()
    );

    match state.completion_provider.stream(request).await {
        Ok(stream) => {
            let body = Body::from_stream(stream.map(|chunk| chunk.map(Bytes::from)));
            (
                [
                    (header::CONTENT_TYPE, "text/event-stream"),
                    (header::CACHE_CONTROL, "no-cache"),
                ],
                body,
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Completion request failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
