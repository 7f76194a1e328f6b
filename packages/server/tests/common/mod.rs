//! Helpers shared by the server integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::stream;
use gamejam_server::{
    domain::{CompletionError, CompletionProvider, CompletionRequest, TextStream},
    infrastructure::{
        message_pusher::WebSocketMessagePusher, repository::InMemoryGameRepository,
        state_channel::InMemoryStateChannel,
    },
    ui::AppState,
    usecase::ChatSessionConfig,
};
use gamejam_shared::time::FixedClock;

/// Replies to every request with the same chunks and records the requests.
pub struct CannedProvider {
    chunks: Vec<String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl CannedProvider {
    pub fn new(chunks: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for CannedProvider {
    async fn stream(&self, request: CompletionRequest) -> Result<TextStream, CompletionError> {
        self.requests.lock().unwrap().push(request);
        let chunks = self.chunks.clone().into_iter().map(Ok);
        Ok(Box::pin(stream::iter(chunks)))
    }
}

/// Fails every request before any text is produced.
pub struct UnreachableProvider;

#[async_trait]
impl CompletionProvider for UnreachableProvider {
    async fn stream(&self, _request: CompletionRequest) -> Result<TextStream, CompletionError> {
        Err(CompletionError::Transport("connection refused".to_string()))
    }
}

pub fn app_state(provider: Arc<dyn CompletionProvider>) -> Arc<AppState> {
    AppState::new(
        Arc::new(InMemoryStateChannel::new()),
        provider,
        Arc::new(WebSocketMessagePusher::new()),
        Arc::new(InMemoryGameRepository::new()),
        Arc::new(FixedClock::new(1_700_000_000_000)),
        ChatSessionConfig::default(),
    )
}
