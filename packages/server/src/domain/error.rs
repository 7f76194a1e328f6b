//! Domain-level error types.

use thiserror::Error;

/// Value object validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{kind} must be at most {max} characters")]
    TooLong { kind: &'static str, max: usize },

    #[error("{0} may only contain ASCII letters, digits, '-', '_' and '.'")]
    InvalidCharacters(&'static str),
}

/// Shared State Channel errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateChannelError {
    /// A replicated value could not be decoded into the expected type
    #[error("failed to decode '{slot}' value: {message}")]
    Decode { slot: &'static str, message: String },

    /// A value could not be encoded for replication
    #[error("failed to encode '{slot}' value: {message}")]
    Encode { slot: &'static str, message: String },
}

/// Game record store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("game '{0}' not found")]
    GameNotFound(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

/// Completion provider errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    /// Network failure or non-2xx response before the stream started
    #[error("completion request failed: {0}")]
    Transport(String),

    /// Failure while reading an already-started stream
    #[error("{0}")]
    Stream(String),

    /// Provider could not be configured (missing key, invalid header)
    #[error("completion provider misconfigured: {0}")]
    Configuration(String),
}

/// Message push (fan-out) errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("connection '{0}' not found")]
    ClientNotFound(String),

    #[error("failed to push message: {0}")]
    PushFailed(String),
}

/// Lookup of a built-in example game by name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown example '{0}', expected one of: bouncing, platformer, shooter")]
pub struct UnknownExample(pub String);
