//! Message formatting utilities for client display.

use gamejam_server::{
    domain::{ActivePlayer, ChatMessage, Role, ViewMode},
    infrastructure::dto::{http::GameDto, websocket::EditorInfo},
};
use gamejam_shared::time::timestamp_to_local_clock;

use crate::domain::SessionEvent;

const RULE: &str = "============================================================";
const THIN_RULE: &str = "------------------------------------------------------------";

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Render one session event, marking `own_id` as "me" where it appears.
    pub fn format_event(event: &SessionEvent, own_id: &str) -> String {
        match event {
            SessionEvent::Joined {
                session_id,
                players,
            } => Self::format_session_joined(session_id, players, own_id),
            SessionEvent::PlayerJoined(player) => format!(
                "\n+ {} joined at {}\n",
                player.username,
                timestamp_to_local_clock(player.joined_at.value())
            ),
            SessionEvent::PlayerLeft(player) => format!("\n- {} left\n", player.username),
            SessionEvent::Message(message) => Self::format_chat_message(message, own_id),
            SessionEvent::ReplyStarted => "\n… assistant is writing a reply\n".to_string(),
            SessionEvent::Typing(names) if names.is_empty() => "\n(nobody is typing)\n".to_string(),
            SessionEvent::Typing(names) => format!("\n✎ {} typing\n", names.join(", ")),
            SessionEvent::Queued(count) => format!("\n{} message(s) waiting for the batch\n", count),
            SessionEvent::SketchRestarted(count) => {
                format!("\n▶ sketch restarted (run #{})\n", count)
            }
            SessionEvent::Editor(editor) => Self::format_editor(editor),
            SessionEvent::Error(message) => format!("\n! {}\n", message),
        }
    }

    pub fn format_session_joined(
        session_id: &str,
        players: &[ActivePlayer],
        own_id: &str,
    ) -> String {
        let mut output = format!("\n\n{}\nSession {}\nPlayers:\n", RULE, session_id);
        if players.is_empty() {
            output.push_str("(No players)\n");
        }
        for player in players {
            let me_suffix = if player.id.as_str() == own_id { " (me)" } else { "" };
            output.push_str(&format!(
                "{}{} - joined at {}\n",
                player.username,
                me_suffix,
                timestamp_to_local_clock(player.joined_at.value())
            ));
        }
        output.push_str(RULE);
        output.push('\n');
        output
    }

    pub fn format_chat_message(message: &ChatMessage, own_id: &str) -> String {
        let author = match (message.role, &message.sender) {
            (Role::Assistant, _) => "assistant".to_string(),
            (Role::User, Some(sender)) if sender.id.as_str() == own_id => {
                format!("{} (me)", sender.display_name)
            }
            (Role::User, Some(sender)) => sender.display_name.clone(),
            (Role::User, None) => "someone".to_string(),
        };
        let batched = if message.is_batched_message == Some(true) {
            " [batched]"
        } else {
            ""
        };
        format!(
            "\n{}\n@{}{}:\n{}\n{}\n",
            THIN_RULE, author, batched, message.content, THIN_RULE
        )
    }

    pub fn format_editor(editor: &EditorInfo) -> String {
        let mode = match editor.view_mode {
            ViewMode::Play => "play",
            ViewMode::Edit => "edit",
        };
        let status = if editor.is_receiving {
            "receiving code"
        } else if editor.dirty {
            "unapplied edits"
        } else {
            "idle"
        };
        format!("\n[editor] {} mode, {}\n", mode, status)
    }

    pub fn format_games(games: &[GameDto]) -> String {
        if games.is_empty() {
            return "\n(No saved games)\n".to_string();
        }
        let mut output = String::from("\n");
        for game in games {
            output.push_str(&format!(
                "{}  {} (updated {})\n",
                game.id, game.title, game.updated_at
            ));
        }
        output
    }

    pub fn format_raw_message(text: &str) -> String {
        format!("\n← Received: {}\n", text)
    }
}
