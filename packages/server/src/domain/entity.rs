//! Domain entities.
//!
//! Everything except [`Game`] lives in the Shared State Channel and is
//! replicated as JSON to every participant of a session.

use serde::{Deserialize, Serialize};

use super::value_object::{ArtifactId, GameId, MessageId, SessionId, Timestamp, UserId};

/// A participant's public identity (author of a message, composer, player).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: UserId,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl Participant {
    pub fn new(id: UserId, display_name: impl Into<String>, avatar: Option<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            avatar,
        }
    }
}

/// A participant who is focused on the composer or has a non-empty draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingParticipant {
    pub id: UserId,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub last_activity: Timestamp,
}

impl TypingParticipant {
    pub fn from_participant(participant: &Participant, last_activity: Timestamp) -> Self {
        Self {
            id: participant.id.clone(),
            display_name: participant.display_name.clone(),
            avatar: participant.avatar.clone(),
            last_activity,
        }
    }
}

/// A submitted message waiting for the next batch flush.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMessage {
    pub id: MessageId,
    pub user_id: UserId,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub text: String,
    pub submitted_at: Timestamp,
}

impl PendingMessage {
    pub fn sender(&self) -> Participant {
        Participant {
            id: self.user_id.clone(),
            display_name: self.display_name.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the replicated, append-only transcript.
///
/// Assistant messages are appended empty with `complete = Some(false)` and
/// their `content` is replaced wholesale while the response streams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<Participant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complete: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_batched_message: Option<bool>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>, sender: Option<Participant>) -> Self {
        Self {
            id: MessageId::generate(),
            role: Role::User,
            content: content.into(),
            sender,
            complete: None,
            is_batched_message: None,
        }
    }

    /// Transcript entry for one contributor of a multi-message batch.
    pub fn batched(pending: &PendingMessage) -> Self {
        Self {
            id: MessageId::generate(),
            role: Role::User,
            content: pending.text.clone(),
            sender: Some(pending.sender()),
            complete: None,
            is_batched_message: Some(true),
        }
    }

    pub fn assistant_placeholder(id: MessageId) -> Self {
        Self {
            id,
            role: Role::Assistant,
            content: String::new(),
            sender: None,
            complete: Some(false),
            is_batched_message: None,
        }
    }

    pub fn is_incomplete(&self) -> bool {
        self.complete == Some(false)
    }
}

/// A finalized code block extracted from a completed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeArtifact {
    pub id: ArtifactId,
    pub code: String,
}

/// A participant currently connected to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivePlayer {
    pub id: UserId,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub session_id: SessionId,
    pub joined_at: Timestamp,
}

/// Whether the session is looking at the running sketch or at the editor.
///
/// In play mode freshly completed code is promoted straight to the renderer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Play,
    Edit,
}

/// A persisted, finished game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub title: String,
    pub description: String,
    pub code: String,
    pub author_id: String,
    pub author_username: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Fields accepted when creating a game record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGame {
    pub title: String,
    pub description: String,
    pub code: String,
    pub author_id: String,
    pub author_username: String,
}

/// Partial update of a game record; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamePatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub author_username: Option<String>,
}

impl GamePatch {
    pub fn apply_to(self, game: &mut Game, updated_at: Timestamp) {
        if let Some(title) = self.title {
            game.title = title;
        }
        if let Some(description) = self.description {
            game.description = description;
        }
        if let Some(code) = self.code {
            game.code = code;
        }
        if let Some(author_id) = self.author_id {
            game.author_id = author_id;
        }
        if let Some(author_username) = self.author_username {
            game.author_username = author_username;
        }
        game.updated_at = updated_at;
    }
}
