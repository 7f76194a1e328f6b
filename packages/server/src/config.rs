//! Command line configuration of the server binary.

use std::{sync::Arc, time::Duration};

use clap::Parser;

use crate::{
    domain::{CompletionError, CompletionProvider},
    infrastructure::completion::{AnthropicProvider, HttpCompletionProvider, anthropic},
    usecase::ChatSessionConfig,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser, Debug, Clone)]
#[command(name = "gamejam-server")]
#[command(about = "Collaborative game-jam server with batched LLM prompts", long_about = None)]
pub struct ServerConfig {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    pub port: u16,

    /// Completion endpoint to forward prompts to. Takes precedence over the API key.
    #[arg(long, env = "GAMEJAM_COMPLETION_URL")]
    pub completion_url: Option<String>,

    /// Call the Anthropic Messages API directly with this key
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,

    #[arg(long, default_value = anthropic::DEFAULT_MODEL)]
    pub model: String,

    /// Upper bound on one response, from dispatch to the last chunk
    #[arg(long, default_value = "300")]
    pub request_timeout_secs: u64,

    /// Minimum spacing of transcript updates while streaming (0 = every chunk)
    #[arg(long, default_value = "0")]
    pub stream_debounce_ms: u64,
}

impl ServerConfig {
    pub fn chat_session_config(&self) -> ChatSessionConfig {
        ChatSessionConfig {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            publish_interval: Duration::from_millis(self.stream_debounce_ms),
        }
    }

    /// Pick the completion provider: an explicit endpoint wins over the API key.
    pub fn completion_provider(&self) -> Result<Arc<dyn CompletionProvider>, CompletionError> {
        if let Some(url) = &self.completion_url {
            tracing::info!("Using completion endpoint {}", url);
            return Ok(Arc::new(HttpCompletionProvider::new(
                url.clone(),
                CONNECT_TIMEOUT,
            )?));
        }
        if let Some(api_key) = &self.anthropic_api_key {
            tracing::info!("Using Anthropic Messages API with model {}", self.model);
            return Ok(Arc::new(AnthropicProvider::new(
                api_key,
                self.model.clone(),
                CONNECT_TIMEOUT,
            )?));
        }
        Err(CompletionError::Configuration(
            "set --completion-url or --anthropic-api-key".to_string(),
        ))
    }
}
