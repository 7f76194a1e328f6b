//! Server execution logic.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use super::{
    handler::{
        chat_completion, create_game, delete_game, get_game, get_session, get_sketch,
        health_check, list_games, method_not_allowed, update_game, websocket_handler,
    },
    signal::shutdown_signal,
    state::AppState,
};

/// Every route of the game-jam server.
///
/// Routes that exist but do not accept the request's method answer 405
/// with an `{error}` body.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        // WebSocket エンドポイント
        .route("/ws", get(websocket_handler))
        // HTTP エンドポイント
        .route("/api/health", get(health_check))
        .route(
            "/api/chat",
            post(chat_completion).fallback(method_not_allowed),
        )
        .route(
            "/api/games",
            get(list_games)
                .post(create_game)
                .fallback(method_not_allowed),
        )
        .route(
            "/api/games/{id}",
            get(get_game)
                .patch(update_game)
                .delete(delete_game)
                .fallback(method_not_allowed),
        )
        .route("/api/sessions/{session_id}", get(get_session))
        .route("/api/sessions/{session_id}/sketch", get(get_sketch))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Game-jam server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(app_state);
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    app_state: Arc<AppState>,
}

impl Server {
    pub fn new(app_state: Arc<AppState>) -> Self {
        Self { app_state }
    }

    /// Run the server until ctrl-c or SIGTERM
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 8080)
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let app = build_router(self.app_state);

        // Bind the server to the host and port
        let bind_addr = format!("{}:{}", host, port);
        let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

        tracing::info!("Game-jam server listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws?session_id=<id>&user_id=<id>", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
