//! WebSocket message DTOs.
//!
//! Every frame is one JSON object tagged by `type`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{ExampleGame, StateSlot, ViewMode};

/// Participant → server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Composer focus and draft, sent on every change
    TypingStatus {
        is_composing: bool,
        #[serde(default)]
        draft: String,
    },
    Submit {
        text: String,
    },
    SetViewMode {
        mode: ViewMode,
    },
    /// Local edit of the code editor
    EditCode {
        code: String,
    },
    /// Promote the edited code to the running sketch
    ApplyCode,
    /// Load a saved game into the session
    LoadCode {
        code: String,
    },
    /// Load one of the built-in example games
    LoadExample {
        name: ExampleGame,
    },
}

/// One replicated slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotEntry {
    pub slot: StateSlot,
    pub value: Value,
}

/// Editor panel state of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorInfo {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub is_receiving: bool,
    pub dirty: bool,
    pub view_mode: ViewMode,
}

/// Server → participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Every slot of the session, sent once on join
    Snapshot {
        session_id: String,
        entries: Vec<SlotEntry>,
        editor: EditorInfo,
    },
    /// A single slot was written
    StateChanged { slot: StateSlot, value: Value },
    /// The session's code editor changed
    Editor(EditorInfo),
    /// A request from this participant was rejected
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}
