//! Per-session fan-out: every state change and editor update of a session is
//! pushed to all of its connections.

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::{
    domain::{MessagePusher, SessionId},
    infrastructure::dto::websocket::{EditorInfo, ServerMessage},
    usecase::{EditorState, GameSession},
};

pub(crate) fn editor_info(editor: EditorState) -> EditorInfo {
    EditorInfo {
        code: editor.code,
        language: editor.language,
        is_receiving: editor.is_receiving,
        dirty: editor.dirty,
        view_mode: editor.view_mode,
    }
}

pub(crate) fn to_json<T: Serialize>(message: &T) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::error!("Failed to serialize outbound message: {}", e);
            None
        }
    }
}

async fn push_all(pusher: &dyn MessagePusher, session: &SessionId, message: &ServerMessage) {
    let Some(json) = to_json(message) else {
        return;
    };
    let targets = pusher.connections_in(session).await;
    if targets.is_empty() {
        return;
    }
    if let Err(e) = pusher.broadcast(targets, &json).await {
        tracing::warn!("Fan-out to session '{}' failed: {}", session, e);
    }
}

/// Start the fan-out task of `session`. Subscriptions are taken before this
/// returns, so no change made afterwards is missed.
pub fn spawn_fanout(session: &Arc<GameSession>, pusher: Arc<dyn MessagePusher>) -> JoinHandle<()> {
    let mut changes = session.state().subscribe();
    let mut editor = session.subscribe_editor();
    let session_id = session.session_id().clone();

    tokio::spawn(async move {
        let mut editor_open = true;
        loop {
            tokio::select! {
                change = changes.next() => {
                    let Some(change) = change else {
                        break;
                    };
                    let message = ServerMessage::StateChanged {
                        slot: change.key.slot,
                        value: change.value,
                    };
                    push_all(pusher.as_ref(), &session_id, &message).await;
                }
                changed = editor.changed(), if editor_open => {
                    if changed.is_err() {
                        editor_open = false;
                        continue;
                    }
                    let info = editor_info(editor.borrow_and_update().clone());
                    push_all(pusher.as_ref(), &session_id, &ServerMessage::Editor(info)).await;
                }
            }
        }
        tracing::debug!("Fan-out for session '{}' stopped", session_id);
    })
}
