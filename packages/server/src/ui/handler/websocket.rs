//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    domain::{ConnectionKey, Participant, SessionId, UserId},
    infrastructure::dto::websocket::{ClientMessage, ServerMessage, SlotEntry},
    ui::{
        fanout::{editor_info, to_json},
        state::AppState,
    },
    usecase::{ConnectError, Dispatch, GameSession, SessionError},
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub session_id: String,
    pub user_id: String,
    /// Display name; defaults to the user id
    pub username: Option<String>,
    pub avatar: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    // Convert String -> Domain Model
    let session_id = SessionId::new(query.session_id.clone()).map_err(|e| {
        tracing::warn!("Invalid session_id '{}': {}", query.session_id, e);
        StatusCode::BAD_REQUEST
    })?;
    let user_id = UserId::new(query.user_id.clone()).map_err(|e| {
        tracing::warn!("Invalid user_id '{}': {}", query.user_id, e);
        StatusCode::BAD_REQUEST
    })?;
    let display_name = query
        .username
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| user_id.to_string());
    let participant = Participant::new(user_id, display_name, query.avatar);

    let session = state.registry.get_or_create(&session_id).await;

    // Create a channel for this connection to receive messages
    let (tx, rx) = mpsc::unbounded_channel();

    // register_client is called inside the UseCase
    let connected = state
        .connect_participant_usecase
        .execute(&session, participant.clone(), tx)
        .await;
    let status = match connected {
        Ok(_) => {
            tracing::info!(
                "'{}' connected to session '{}'",
                participant.id,
                session_id
            );
            return Ok(ws.on_upgrade(move |socket| {
                handle_socket(socket, state, session, participant, rx)
            }));
        }
        Err(ConnectError::DuplicateUser(user)) => {
            tracing::warn!(
                "User '{}' is already connected to session '{}'. Rejecting connection.",
                user,
                session_id
            );
            StatusCode::CONFLICT
        }
        Err(ConnectError::Session(e)) => {
            tracing::error!("Failed to join session '{}': {}", session_id, e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    state.registry.release(session).await;
    Err(status)
}

/// Spawns a task that forwards queued messages to the WebSocket sender.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn snapshot_message(session: &GameSession) -> ServerMessage {
    let entries = session
        .state()
        .snapshot()
        .await
        .into_iter()
        .map(|(slot, value)| SlotEntry { slot, value })
        .collect();
    ServerMessage::Snapshot {
        session_id: session.session_id().to_string(),
        entries,
        editor: editor_info(session.editor_state().await),
    }
}

/// Apply one participant intent to the session.
async fn apply_client_message(
    session: &Arc<GameSession>,
    participant: &Participant,
    message: ClientMessage,
) -> Result<(), SessionError> {
    let dispatch = match message {
        ClientMessage::TypingStatus {
            is_composing,
            draft,
        } => {
            session
                .set_typing_status(participant, is_composing, &draft)
                .await?
        }
        ClientMessage::Submit { text } => session.submit(participant, &text).await?,
        ClientMessage::SetViewMode { mode } => {
            session.set_view_mode(mode).await?;
            Dispatch::Waiting
        }
        ClientMessage::EditCode { code } => {
            session.edit_code(&code).await?;
            Dispatch::Waiting
        }
        ClientMessage::ApplyCode => {
            session.apply_edited_code().await?;
            Dispatch::Waiting
        }
        ClientMessage::LoadCode { code } => {
            session.load_code(&code).await?;
            Dispatch::Waiting
        }
        ClientMessage::LoadExample { name } => {
            session.load_example(name).await?;
            Dispatch::Waiting
        }
    };
    if dispatch.is_started() {
        tracing::debug!(
            "'{}' closed a batch in session '{}'",
            participant.id,
            session.session_id()
        );
    }
    Ok(())
}

async fn reply_error(state: &AppState, key: &ConnectionKey, message: String) {
    let Some(json) = to_json(&ServerMessage::error(message)) else {
        return;
    };
    if let Err(e) = state.message_pusher.push_to(key, &json).await {
        tracing::warn!("Failed to send error to '{}': {}", key, e);
    }
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    session: Arc<GameSession>,
    participant: Participant,
    rx: mpsc::UnboundedReceiver<String>,
) {
    let (mut sender, mut receiver) = socket.split();
    let key = ConnectionKey::new(session.session_id().clone(), participant.id.clone());

    // Send every slot of the session to the newly connected participant
    if let Some(json) = to_json(&snapshot_message(&session).await) {
        if let Err(e) = sender.send(Message::Text(json.into())).await {
            tracing::error!("Failed to send snapshot to '{}': {}", key, e);
        }
    }

    let state_clone = state.clone();
    let session_clone = session.clone();
    let participant_clone = participant.clone();
    let key_clone = key.clone();

    // Spawn a task to receive intents from this participant
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::error!("WebSocket error: {}", e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    let message = match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(message) => message,
                        Err(e) => {
                            tracing::warn!("Failed to parse message from '{}': {}", key_clone, e);
                            reply_error(&state_clone, &key_clone, format!("invalid message: {}", e))
                                .await;
                            continue;
                        }
                    };
                    if let Err(e) =
                        apply_client_message(&session_clone, &participant_clone, message).await
                    {
                        tracing::info!("Rejected intent from '{}': {}", key_clone, e);
                        reply_error(&state_clone, &key_clone, e.to_string()).await;
                    }
                }
                Message::Ping(_) => {
                    tracing::debug!("Received ping");
                }
                Message::Close(_) => {
                    tracing::info!("'{}' requested close", key_clone);
                    break;
                }
                _ => {}
            }
        }
    });

    // Spawn a task to forward fan-out messages to this participant
    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    let dispatch = match state
        .disconnect_participant_usecase
        .execute(&session, &participant.id)
        .await
    {
        Ok(dispatch) => {
            tracing::info!("'{}' disconnected", key);
            dispatch
        }
        Err(e) => {
            tracing::warn!("Failed to disconnect '{}': {}", key, e);
            Dispatch::Waiting
        }
    };

    match dispatch {
        Dispatch::Started(reply) => {
            tokio::spawn(async move {
                let _ = reply.await;
                state.registry.release(session).await;
            });
        }
        Dispatch::Waiting => {
            state.registry.release(session).await;
        }
    }
}
