//! Domain logic for client-side operations.
//!
//! Pure functions and the local replica of the session, kept free of I/O so
//! they can be tested directly.

use std::collections::HashSet;

use gamejam_server::{
    domain::{ActivePlayer, ChatMessage, MessageId, Role, StateSlot, TypingParticipant},
    infrastructure::dto::websocket::{EditorInfo, ServerMessage, SlotEntry},
};
use serde_json::Value;

use crate::error::ClientError;

/// Check if the client should exit immediately based on the error type.
pub fn should_exit_immediately(error: &ClientError) -> bool {
    matches!(error, ClientError::DuplicateUser(_))
}

/// Check if the client should attempt to reconnect.
///
/// # Arguments
///
/// * `error` - The client error that occurred
/// * `current_attempt` - The current reconnection attempt count (0-indexed)
/// * `max_attempts` - The maximum number of reconnection attempts allowed
pub fn should_attempt_reconnect(
    error: &ClientError,
    current_attempt: u32,
    max_attempts: u32,
) -> bool {
    if should_exit_immediately(error) {
        return false;
    }
    current_attempt < max_attempts
}

/// Something worth showing to the user after a server message.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Joined {
        session_id: String,
        players: Vec<ActivePlayer>,
    },
    PlayerJoined(ActivePlayer),
    PlayerLeft(ActivePlayer),
    /// A transcript entry that will not change any more
    Message(ChatMessage),
    ReplyStarted,
    /// Other participants currently composing
    Typing(Vec<String>),
    Queued(usize),
    SketchRestarted(u64),
    Editor(EditorInfo),
    Error(String),
}

/// Local replica of the session this client has joined.
#[derive(Debug, Default)]
pub struct SessionView {
    own_id: String,
    players: Vec<ActivePlayer>,
    history: Vec<ChatMessage>,
    /// Number of leading transcript entries already reported
    shown: usize,
    streaming: Option<MessageId>,
    announced: Option<MessageId>,
    typing: Vec<String>,
    pending: usize,
    restarts: u64,
    editor: Option<EditorInfo>,
}

impl SessionView {
    pub fn new(own_id: impl Into<String>) -> Self {
        Self {
            own_id: own_id.into(),
            ..Self::default()
        }
    }

    /// Code currently in the editor panel
    pub fn editor_code(&self) -> Option<&str> {
        self.editor
            .as_ref()
            .map(|editor| editor.code.as_str())
            .filter(|code| !code.trim().is_empty())
    }

    pub fn players(&self) -> &[ActivePlayer] {
        &self.players
    }

    pub fn apply(&mut self, message: ServerMessage) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        match message {
            ServerMessage::Snapshot {
                session_id,
                entries,
                editor,
            } => {
                self.load_snapshot(entries);
                events.push(SessionEvent::Joined {
                    session_id,
                    players: self.players.clone(),
                });
                self.editor = Some(editor);
                self.report_history(&mut events);
            }
            ServerMessage::StateChanged { slot, value } => {
                self.apply_slot(slot, value, &mut events);
            }
            ServerMessage::Editor(editor) => {
                let changed = self.editor.as_ref().is_none_or(|current| {
                    current.view_mode != editor.view_mode
                        || current.is_receiving != editor.is_receiving
                });
                if changed {
                    events.push(SessionEvent::Editor(editor.clone()));
                }
                self.editor = Some(editor);
            }
            ServerMessage::Error { message } => events.push(SessionEvent::Error(message)),
        }
        events
    }

    fn load_snapshot(&mut self, entries: Vec<SlotEntry>) {
        for SlotEntry { slot, value } in entries {
            match slot {
                StateSlot::ActivePlayers => self.players = decode(value).unwrap_or_default(),
                StateSlot::ChatHistory => self.history = decode(value).unwrap_or_default(),
                StateSlot::StreamingMessage => self.streaming = decode(value).unwrap_or_default(),
                StateSlot::TypingParticipants => self.typing = self.typing_names(value),
                StateSlot::PendingMessages => self.pending = count(&value),
                StateSlot::RestartCounter => self.restarts = decode(value).unwrap_or_default(),
                _ => {}
            }
        }
        self.shown = 0;
    }

    fn apply_slot(&mut self, slot: StateSlot, value: Value, events: &mut Vec<SessionEvent>) {
        match slot {
            StateSlot::ActivePlayers => {
                let players: Vec<ActivePlayer> = decode(value).unwrap_or_default();
                let before: HashSet<_> = self.players.iter().map(|p| p.id.clone()).collect();
                let after: HashSet<_> = players.iter().map(|p| p.id.clone()).collect();
                for player in players.iter().filter(|p| !before.contains(&p.id)) {
                    events.push(SessionEvent::PlayerJoined(player.clone()));
                }
                for player in self.players.iter().filter(|p| !after.contains(&p.id)) {
                    events.push(SessionEvent::PlayerLeft(player.clone()));
                }
                self.players = players;
            }
            StateSlot::ChatHistory => {
                self.history = decode(value).unwrap_or_default();
                if self.shown > self.history.len() {
                    self.shown = 0;
                }
                self.report_history(events);
            }
            StateSlot::StreamingMessage => {
                self.streaming = decode(value).unwrap_or_default();
                self.report_history(events);
            }
            StateSlot::TypingParticipants => {
                let typing = self.typing_names(value);
                if typing != self.typing {
                    events.push(SessionEvent::Typing(typing.clone()));
                    self.typing = typing;
                }
            }
            StateSlot::PendingMessages => {
                let pending = count(&value);
                if pending > 0 && pending != self.pending {
                    events.push(SessionEvent::Queued(pending));
                }
                self.pending = pending;
            }
            StateSlot::RestartCounter => {
                let restarts = decode(value).unwrap_or_default();
                if restarts > self.restarts {
                    events.push(SessionEvent::SketchRestarted(restarts));
                }
                self.restarts = restarts;
            }
            _ => {}
        }
    }

    /// Report every entry that can no longer change, stopping at the reply
    /// that is still streaming.
    fn report_history(&mut self, events: &mut Vec<SessionEvent>) {
        while let Some(message) = self.history.get(self.shown) {
            let streaming = message.role == Role::Assistant
                && message.is_incomplete()
                && self.streaming.as_ref() == Some(&message.id);
            if streaming {
                if self.announced.as_ref() != Some(&message.id) {
                    self.announced = Some(message.id.clone());
                    events.push(SessionEvent::ReplyStarted);
                }
                break;
            }
            events.push(SessionEvent::Message(message.clone()));
            self.shown += 1;
        }
    }

    fn typing_names(&self, value: Value) -> Vec<String> {
        let typing: Vec<TypingParticipant> = decode(value).unwrap_or_default();
        typing
            .into_iter()
            .filter(|t| t.id.as_str() != self.own_id)
            .map(|t| t.display_name)
            .collect()
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            tracing::warn!("Ignoring undecodable slot value: {}", e);
            None
        }
    }
}

fn count(value: &Value) -> usize {
    value.as_array().map(Vec::len).unwrap_or(0)
}
