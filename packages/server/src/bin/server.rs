//! Game-jam server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin gamejam-server -- --completion-url http://127.0.0.1:3000/api/chat
//! ANTHROPIC_API_KEY=... cargo run --bin gamejam-server -- --host 0.0.0.0 --port 3000
//! ```

use std::sync::Arc;

use clap::Parser;
use gamejam_server::{
    config::ServerConfig,
    infrastructure::{
        message_pusher::WebSocketMessagePusher, repository::InMemoryGameRepository,
        state_channel::InMemoryStateChannel,
    },
    ui::{AppState, Server},
};
use gamejam_shared::{logger::setup_logger, time::SystemClock};

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let config = ServerConfig::parse();

    // Initialize dependencies in order:
    // 1. Completion provider
    // 2. State channel, MessagePusher and Repository
    // 3. AppState (use cases and session registry)
    // 4. Server
    let completion_provider = match config.completion_provider() {
        Ok(provider) => provider,
        Err(e) => {
            tracing::error!("Failed to configure completion provider: {}", e);
            std::process::exit(1);
        }
    };

    let app_state = AppState::new(
        Arc::new(InMemoryStateChannel::new()),
        completion_provider,
        Arc::new(WebSocketMessagePusher::new()),
        Arc::new(InMemoryGameRepository::new()),
        Arc::new(SystemClock),
        config.chat_session_config(),
    );

    let server = Server::new(app_state);
    if let Err(e) = server.run(config.host, config.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
