//! Anthropic Messages API provider.
//!
//! Builds the game-assistant request itself (system prompt, last few
//! transcript messages) and turns the SSE response into text deltas.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt, future};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use super::prompt::create_system_prompt;
use crate::domain::{
    CompletionError, CompletionMessage, CompletionProvider, CompletionRequest, TextStream,
};

const API_BASE_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

pub const DEFAULT_MODEL: &str = "claude-3-7-sonnet-20250219";
const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 16000;
/// Only the tail of the transcript is sent.
const HISTORY_WINDOW: usize = 3;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: String,
    messages: &'a [CompletionMessage],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ContentBlockDelta {
    delta: Delta,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Delta {
    TextDelta {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

pub struct AnthropicProvider {
    client: reqwest::Client,
    model: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(
        api_key: &str,
        model: impl Into<String>,
        connect_timeout: Duration,
    ) -> Result<Self, CompletionError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key).map_err(|e| {
                CompletionError::Configuration(format!("invalid API key header value: {}", e))
            })?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| CompletionError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            model: model.into(),
            base_url: API_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    async fn stream(&self, request: CompletionRequest) -> Result<TextStream, CompletionError> {
        let start = request.messages.len().saturating_sub(HISTORY_WINDOW);
        let body = MessagesRequest {
            model: &self.model,
            system: create_system_prompt(request.code_state.as_deref()),
            messages: &request.messages[start..],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            stream: true,
        };

        let response = self
            .client
            .post(&self.base_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_error) => format!("Anthropic API error: {}", api_error.error.message),
                Err(_) => format!("Anthropic API returned {}: {}", status, body),
            };
            tracing::warn!("{}", message);
            return Err(CompletionError::Transport(message));
        }

        tracing::debug!(model = %self.model, "Anthropic stream opened");
        Ok(text_deltas(response.bytes_stream()))
    }
}

/// Parse an SSE byte stream and keep only the text deltas.
///
/// Unknown event types are skipped; an `error` event ends up as a stream error.
pub fn text_deltas<S, B, E>(bytes: S) -> TextStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + 'static,
    E: fmt::Display + 'static,
{
    let deltas = bytes.eventsource().filter_map(|event| {
        future::ready(match event {
            Ok(event) => match event.event.as_str() {
                "content_block_delta" => {
                    match serde_json::from_str::<ContentBlockDelta>(&event.data) {
                        Ok(ContentBlockDelta {
                            delta: Delta::TextDelta { text },
                        }) => Some(Ok(text)),
                        Ok(_) => None,
                        Err(e) => Some(Err(CompletionError::Stream(format!(
                            "failed to parse content_block_delta: {}",
                            e
                        )))),
                    }
                }
                "error" => {
                    let message = serde_json::from_str::<ApiErrorResponse>(&event.data)
                        .map(|api_error| api_error.error.message)
                        .unwrap_or(event.data);
                    Some(Err(CompletionError::Stream(message)))
                }
                _ => None,
            },
            Err(e) => Some(Err(CompletionError::Stream(format!("SSE stream error: {}", e)))),
        })
    });
    Box::pin(deltas)
}
