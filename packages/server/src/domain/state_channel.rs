//! Shared State Channel trait 定義
//!
//! A keyed, replicated value store: every key maps to one JSON value that is
//! visible to all participants of a session, and every write is broadcast to
//! all subscribers. The concrete transport lives in the infrastructure layer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use super::{error::StateChannelError, value_object::SessionId};

/// The replicated slots every session owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateSlot {
    ChatHistory,
    PendingMessages,
    TypingParticipants,
    BatchInProgress,
    StreamingMessage,
    CodeArtifacts,
    ActiveArtifact,
    SyncedCode,
    RestartCounter,
    ActivePlayers,
}

impl StateSlot {
    pub const ALL: [StateSlot; 10] = [
        StateSlot::ChatHistory,
        StateSlot::PendingMessages,
        StateSlot::TypingParticipants,
        StateSlot::BatchInProgress,
        StateSlot::StreamingMessage,
        StateSlot::CodeArtifacts,
        StateSlot::ActiveArtifact,
        StateSlot::SyncedCode,
        StateSlot::RestartCounter,
        StateSlot::ActivePlayers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StateSlot::ChatHistory => "chat_history",
            StateSlot::PendingMessages => "pending_messages",
            StateSlot::TypingParticipants => "typing_participants",
            StateSlot::BatchInProgress => "batch_in_progress",
            StateSlot::StreamingMessage => "streaming_message",
            StateSlot::CodeArtifacts => "code_artifacts",
            StateSlot::ActiveArtifact => "active_artifact",
            StateSlot::SyncedCode => "synced_code",
            StateSlot::RestartCounter => "restart_counter",
            StateSlot::ActivePlayers => "active_players",
        }
    }
}

/// A slot namespaced by its session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateKey {
    pub session: SessionId,
    pub slot: StateSlot,
}

impl StateKey {
    pub fn new(session: SessionId, slot: StateSlot) -> Self {
        Self { session, slot }
    }
}

/// A published write.
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    pub key: StateKey,
    pub value: Value,
}

/// Read-modify-write function. Receives the current value (`None` if the key
/// was never written) and returns the replacement.
pub type Updater<'a> =
    Box<dyn FnOnce(Option<&Value>) -> Result<Value, StateChannelError> + Send + 'a>;

/// Shared State Channel
///
/// Last-write-wins per key. `update` is atomic with respect to other writes
/// of the same key; there is no cross-key transaction.
#[async_trait]
pub trait SharedStateChannel: Send + Sync {
    /// Current value of a key, `None` if never written
    async fn get(&self, key: &StateKey) -> Option<Value>;

    /// Overwrite a key and broadcast the change
    async fn set(&self, key: &StateKey, value: Value) -> Result<(), StateChannelError>;

    /// Atomically replace a key with `updater(current)` and broadcast the
    /// result, which is also returned. If the updater fails nothing is written.
    async fn update(&self, key: &StateKey, updater: Updater<'_>)
    -> Result<Value, StateChannelError>;

    /// Subscribe to every subsequent change on the channel
    fn subscribe(&self) -> broadcast::Receiver<StateChange>;
}

/// Subscription filtered to one session.
pub struct StateSubscription {
    session: SessionId,
    receiver: broadcast::Receiver<StateChange>,
}

impl StateSubscription {
    pub fn new(session: SessionId, receiver: broadcast::Receiver<StateChange>) -> Self {
        Self { session, receiver }
    }

    /// Next change for this session; `None` once the channel is gone.
    ///
    /// A lagging subscriber skips the missed changes and keeps going. Every
    /// write carries the full slot value, so the next change re-converges it.
    pub async fn next(&mut self) -> Option<StateChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) if change.key.session == self.session => return Some(change),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        "State subscription for session '{}' lagged, skipped {} changes",
                        self.session,
                        skipped
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
