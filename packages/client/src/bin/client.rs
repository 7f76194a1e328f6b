//! Game-jam terminal client with reconnection support.
//!
//! Joins a session, prints the shared transcript as it changes and submits
//! prompts typed at the `>` prompt. Duplicate user ids within a session are
//! rejected by the server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin gamejam-client -- --session-id jam --user-id alice
//! cargo run --bin gamejam-client -- -s jam -u bob --username "Bob"
//! ```

use clap::Parser;

use gamejam_client::{SessionConfig, run_client};
use gamejam_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "gamejam-client")]
#[command(about = "Terminal participant for a game-jam session", long_about = None)]
struct Args {
    /// Session to join
    #[arg(short = 's', long)]
    session_id: String,

    /// User id (must be unique within the session)
    #[arg(short = 'u', long)]
    user_id: String,

    /// Display name, defaults to the user id
    #[arg(short = 'n', long)]
    username: Option<String>,

    /// WebSocket server URL
    #[arg(long, default_value = "ws://127.0.0.1:8080/ws", env = "GAMEJAM_WS_URL")]
    url: String,

    /// Base URL of the HTTP API
    #[arg(long, default_value = "http://127.0.0.1:8080/api", env = "GAMEJAM_API_URL")]
    api_url: String,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    let config = SessionConfig {
        url: args.url,
        api_url: args.api_url,
        session_id: args.session_id,
        username: args.username.unwrap_or_else(|| args.user_id.clone()),
        user_id: args.user_id,
    };

    if let Err(e) = run_client(config).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
