//! Typed view of one session's slots in the Shared State Channel.

use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use super::{
    entity::{ActivePlayer, ChatMessage, CodeArtifact, PendingMessage, TypingParticipant},
    error::StateChannelError,
    state_channel::{SharedStateChannel, StateKey, StateSlot, StateSubscription},
    value_object::{ArtifactId, MessageId, SessionId},
};

fn decode<T: DeserializeOwned + Default>(
    slot: StateSlot,
    value: Option<&Value>,
) -> Result<T, StateChannelError> {
    match value {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => {
            T::deserialize(value).map_err(|e| StateChannelError::Decode {
                slot: slot.as_str(),
                message: e.to_string(),
            })
        }
    }
}

fn encode<T: Serialize>(slot: StateSlot, value: &T) -> Result<Value, StateChannelError> {
    serde_json::to_value(value).map_err(|e| StateChannelError::Encode {
        slot: slot.as_str(),
        message: e.to_string(),
    })
}

/// Session-scoped, typed access to the replicated slots.
///
/// Missing values read as the type's default (empty list, `false`, `None`, 0).
#[derive(Clone)]
pub struct SessionState {
    session: SessionId,
    channel: Arc<dyn SharedStateChannel>,
}

impl SessionState {
    pub fn new(session: SessionId, channel: Arc<dyn SharedStateChannel>) -> Self {
        Self { session, channel }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session
    }

    pub fn subscribe(&self) -> StateSubscription {
        StateSubscription::new(self.session.clone(), self.channel.subscribe())
    }

    fn key(&self, slot: StateSlot) -> StateKey {
        StateKey::new(self.session.clone(), slot)
    }

    pub async fn read<T: DeserializeOwned + Default>(
        &self,
        slot: StateSlot,
    ) -> Result<T, StateChannelError> {
        let value = self.channel.get(&self.key(slot)).await;
        decode(slot, value.as_ref())
    }

    pub async fn write<T: Serialize + Sync>(
        &self,
        slot: StateSlot,
        value: &T,
    ) -> Result<(), StateChannelError> {
        let encoded = encode(slot, value)?;
        self.channel.set(&self.key(slot), encoded).await
    }

    /// Atomic read-modify-write of one slot; returns whatever `f` returns.
    pub async fn modify<T, R, F>(&self, slot: StateSlot, f: F) -> Result<R, StateChannelError>
    where
        T: Serialize + DeserializeOwned + Default,
        R: Send,
        F: FnOnce(&mut T) -> R + Send,
    {
        let mut output = None;
        let out = &mut output;
        self.channel
            .update(
                &self.key(slot),
                Box::new(move |current: Option<&Value>| {
                    let mut value: T = decode(slot, current)?;
                    *out = Some(f(&mut value));
                    encode(slot, &value)
                }),
            )
            .await?;
        output.ok_or(StateChannelError::Decode {
            slot: slot.as_str(),
            message: "update did not run".to_string(),
        })
    }

    /// Raw JSON of every slot, defaults filled in. Used for join snapshots.
    pub async fn snapshot(&self) -> Vec<(StateSlot, Value)> {
        let mut entries = Vec::with_capacity(StateSlot::ALL.len());
        for slot in StateSlot::ALL {
            let value = match self.channel.get(&self.key(slot)).await {
                Some(value) => value,
                None => default_value(slot),
            };
            entries.push((slot, value));
        }
        entries
    }

    pub async fn chat_history(&self) -> Result<Vec<ChatMessage>, StateChannelError> {
        self.read(StateSlot::ChatHistory).await
    }

    pub async fn pending_messages(&self) -> Result<Vec<PendingMessage>, StateChannelError> {
        self.read(StateSlot::PendingMessages).await
    }

    pub async fn typing_participants(
        &self,
    ) -> Result<Vec<TypingParticipant>, StateChannelError> {
        self.read(StateSlot::TypingParticipants).await
    }

    pub async fn batch_in_progress(&self) -> Result<bool, StateChannelError> {
        self.read(StateSlot::BatchInProgress).await
    }

    pub async fn streaming_message(&self) -> Result<Option<MessageId>, StateChannelError> {
        self.read(StateSlot::StreamingMessage).await
    }

    pub async fn set_streaming_message(
        &self,
        id: Option<&MessageId>,
    ) -> Result<(), StateChannelError> {
        self.write(StateSlot::StreamingMessage, &id).await
    }

    pub async fn code_artifacts(&self) -> Result<Vec<CodeArtifact>, StateChannelError> {
        self.read(StateSlot::CodeArtifacts).await
    }

    pub async fn active_artifact(&self) -> Result<Option<ArtifactId>, StateChannelError> {
        self.read(StateSlot::ActiveArtifact).await
    }

    pub async fn synced_code(&self) -> Result<String, StateChannelError> {
        self.read(StateSlot::SyncedCode).await
    }

    pub async fn restart_counter(&self) -> Result<u64, StateChannelError> {
        self.read(StateSlot::RestartCounter).await
    }

    pub async fn active_players(&self) -> Result<Vec<ActivePlayer>, StateChannelError> {
        self.read(StateSlot::ActivePlayers).await
    }
}

fn default_value(slot: StateSlot) -> Value {
    match slot {
        StateSlot::ChatHistory
        | StateSlot::PendingMessages
        | StateSlot::TypingParticipants
        | StateSlot::CodeArtifacts
        | StateSlot::ActivePlayers => Value::Array(Vec::new()),
        StateSlot::BatchInProgress => Value::Bool(false),
        StateSlot::StreamingMessage | StateSlot::ActiveArtifact => Value::Null,
        StateSlot::SyncedCode => Value::String(String::new()),
        StateSlot::RestartCounter => Value::from(0u64),
    }
}
