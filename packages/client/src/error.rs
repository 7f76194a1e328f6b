//! Error types for the game-jam client.

use thiserror::Error;

/// Session connection errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The user id is already connected to the session
    #[error("User '{0}' is already connected to this session")]
    DuplicateUser(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

/// Errors of the game record API
#[derive(Debug, Error)]
pub enum GameApiError {
    /// The request never produced a response
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with an `{error}` body
    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },
}

impl GameApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, GameApiError::Api { status: 404, .. })
    }
}
