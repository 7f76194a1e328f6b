//! Completion provider trait 定義
//!
//! The LLM is an opaque source of text: one request in, a stream of text
//! chunks out. Chunks carry no framing and are simply concatenated.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use serde::{Deserialize, Serialize};

use super::{entity::Role, error::CompletionError};

/// One transcript entry as sent to the model (attribution stripped).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionMessage {
    pub role: Role,
    pub content: String,
}

/// Body of the completion endpoint: `{messages: [{role, content}], codeState?}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<CompletionMessage>,
    #[serde(
        rename = "codeState",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub code_state: Option<String>,
}

/// Incremental response text.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, CompletionError>> + Send>>;

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Start a completion. Errors returned here are transport errors; errors
    /// yielded by the stream are mid-stream failures.
    async fn stream(&self, request: CompletionRequest) -> Result<TextStream, CompletionError>;
}
