//! UseCase 層のエラー型

use thiserror::Error;

use crate::domain::{CompletionError, RepositoryError, StateChannelError};

/// Typing & Batch Coordinator のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("message must not be empty")]
    EmptyMessage,

    #[error(transparent)]
    State(#[from] StateChannelError),
}

/// Chat/Completion Session のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("message must not be empty")]
    EmptyMessage,

    /// A response is already streaming in this session
    #[error("a response is already in progress")]
    Busy,

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    State(#[from] StateChannelError),
}

/// Code Reconciliation Sink のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeSinkError {
    /// Code is still arriving; the editor is read-only
    #[error("code is still being received")]
    ReadOnly,

    #[error(transparent)]
    State(#[from] StateChannelError),
}

/// GameSession のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A batch is being processed or a response is streaming
    #[error("the assistant is busy, wait for the current response")]
    Busy,

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error(transparent)]
    CodeSink(#[from] CodeSinkError),

    #[error(transparent)]
    State(#[from] StateChannelError),
}

/// 参加者接続のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("user '{0}' is already connected to this session")]
    DuplicateUser(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// ゲーム記録 CRUD のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("Author ID is required")]
    MissingAuthor,

    #[error("Missing required fields")]
    MissingFields,

    #[error("Game not found")]
    NotFound,

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for GameError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::GameNotFound(_) => GameError::NotFound,
            other => GameError::Repository(other),
        }
    }
}
