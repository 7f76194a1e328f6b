//! UseCase: Game Session runtime
//!
//! One runtime per session id. Participant intents (composer status, submit,
//! editor actions) arrive here; the batch coordinator decides when a round of
//! input closes and the chat session streams the reply.
//!
//! ### どのような状況を想定しているか
//! - 正常系：誰も入力していない状態で送信すると即座にバッチが送られる
//! - 正常系：他の参加者の入力終了を待ってからバッチが送られる
//! - 異常系：応答中の送信は Busy で拒否される
//! - エッジケース：入力中のまま切断した参加者はバッチを塞がない

use std::sync::Arc;

use tokio::{sync::watch, task::JoinHandle};

use gamejam_shared::time::Clock;

use crate::domain::{
    ActivePlayer, CompletionProvider, ExampleGame, Participant, PendingMessage, PreparedSketch,
    SessionId, SessionState, SharedStateChannel, StateSlot, UserId, ViewMode, prepare_sketch,
};

use super::{
    batch_coordinator::BatchCoordinator,
    chat_session::{ChatSession, ChatSessionConfig, merge_batch_prompt},
    code_sink::{CodeSink, EditorState},
    error::SessionError,
};

/// What a participant intent did to the batch cycle.
#[derive(Debug)]
pub enum Dispatch {
    /// Nothing to send yet (someone is still composing, or the queue is empty)
    Waiting,
    /// A batch closed; the handle resolves once its reply and any follow-up
    /// batches have finished
    Started(JoinHandle<()>),
}

impl Dispatch {
    pub fn is_started(&self) -> bool {
        matches!(self, Dispatch::Started(_))
    }
}

pub struct GameSession {
    state: SessionState,
    coordinator: BatchCoordinator,
    chat: ChatSession,
    sink: Arc<CodeSink>,
}

impl GameSession {
    pub fn new(
        session_id: SessionId,
        channel: Arc<dyn SharedStateChannel>,
        provider: Arc<dyn CompletionProvider>,
        clock: Arc<dyn Clock>,
        config: ChatSessionConfig,
    ) -> Arc<Self> {
        let state = SessionState::new(session_id, channel);
        let sink = Arc::new(CodeSink::new(state.clone()));
        let chat = ChatSession::new(state.clone(), provider, sink.clone(), config);
        Arc::new(Self {
            coordinator: BatchCoordinator::new(state.clone(), clock),
            state,
            chat,
            sink,
        })
    }

    pub fn session_id(&self) -> &SessionId {
        self.state.session_id()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Pick up the running code left in the channel, or start the default
    /// example when there is none.
    pub async fn initialize(&self) -> Result<(), SessionError> {
        let synced = self.state.synced_code().await?;
        if synced.trim().is_empty() {
            self.sink.seed(ExampleGame::default().code()).await?;
        } else {
            self.sink.seed(&synced).await?;
        }
        Ok(())
    }

    /// A batch is being answered or a reply is streaming.
    pub async fn is_busy(&self) -> Result<bool, SessionError> {
        Ok(self.coordinator.is_processing()
            || self.chat.is_loading()
            || self.state.streaming_message().await?.is_some())
    }

    pub async fn set_typing_status(
        self: &Arc<Self>,
        participant: &Participant,
        is_composing: bool,
        draft: &str,
    ) -> Result<Dispatch, SessionError> {
        self.coordinator
            .set_typing_status(participant, is_composing, draft)
            .await?;
        let flushed = self.coordinator.try_flush().await?;
        self.dispatch(flushed).await
    }

    pub async fn submit(
        self: &Arc<Self>,
        participant: &Participant,
        text: &str,
    ) -> Result<Dispatch, SessionError> {
        if self.is_busy().await? {
            return Err(SessionError::Busy);
        }
        let flushed = self.coordinator.enqueue(participant, text).await?;
        self.dispatch(flushed).await
    }

    pub async fn join(&self, player: ActivePlayer) -> Result<(), SessionError> {
        tracing::info!(
            "Player '{}' joined session '{}'",
            player.id,
            self.session_id()
        );
        self.state
            .modify(StateSlot::ActivePlayers, |players: &mut Vec<ActivePlayer>| {
                players.retain(|p| p.id != player.id);
                players.push(player);
            })
            .await?;
        Ok(())
    }

    /// Remove a player and their typing entry; may close a waiting batch.
    pub async fn leave(self: &Arc<Self>, user: &UserId) -> Result<Dispatch, SessionError> {
        tracing::info!("Player '{}' left session '{}'", user, self.session_id());
        self.state
            .modify(StateSlot::ActivePlayers, |players: &mut Vec<ActivePlayer>| {
                players.retain(|p| &p.id != user)
            })
            .await?;
        self.coordinator.remove_typing(user).await?;
        let flushed = self.coordinator.try_flush().await?;
        self.dispatch(flushed).await
    }

    pub async fn set_view_mode(&self, mode: ViewMode) -> Result<(), SessionError> {
        Ok(self.sink.set_view_mode(mode).await?)
    }

    pub async fn edit_code(&self, code: &str) -> Result<(), SessionError> {
        Ok(self.sink.edit(code).await?)
    }

    pub async fn apply_edited_code(&self) -> Result<(), SessionError> {
        self.sink.apply_edited_code().await?;
        Ok(())
    }

    pub async fn load_code(&self, code: &str) -> Result<(), SessionError> {
        Ok(self.sink.load_code(code).await?)
    }

    pub async fn load_example(&self, example: ExampleGame) -> Result<(), SessionError> {
        tracing::info!(
            "Loading example '{}' in session '{}'",
            example,
            self.session_id()
        );
        self.load_code(example.code()).await
    }

    pub async fn editor_state(&self) -> EditorState {
        self.sink.editor_state().await
    }

    pub fn subscribe_editor(&self) -> watch::Receiver<EditorState> {
        self.sink.subscribe()
    }

    /// Running code, repaired for the renderer.
    pub async fn sketch(&self) -> Result<PreparedSketch, SessionError> {
        let code = self.state.synced_code().await?;
        Ok(prepare_sketch(&code))
    }

    async fn dispatch(self: &Arc<Self>, flushed: bool) -> Result<Dispatch, SessionError> {
        if !flushed {
            return Ok(Dispatch::Waiting);
        }
        match self.coordinator.drain_batch().await {
            Ok(batch) => Ok(Dispatch::Started(self.spawn_batch(batch))),
            Err(e) => {
                self.coordinator.reset_processing_state();
                Err(e.into())
            }
        }
    }

    /// Answer `batch`, then keep answering whatever closed in the meantime.
    fn spawn_batch(self: &Arc<Self>, batch: Vec<PendingMessage>) -> JoinHandle<()> {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            let mut batch = batch;
            loop {
                session.run_batch(&batch).await;
                session.coordinator.reset_processing_state();
                match session.take_ready_batch().await {
                    Ok(Some(next)) => batch = next,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!(
                            "Failed to check for the next batch in session '{}': {}",
                            session.session_id(),
                            e
                        );
                        break;
                    }
                }
            }
        })
    }

    async fn take_ready_batch(&self) -> Result<Option<Vec<PendingMessage>>, SessionError> {
        if !self.coordinator.try_flush().await? {
            return Ok(None);
        }
        match self.coordinator.drain_batch().await {
            Ok(batch) => Ok(Some(batch)),
            Err(e) => {
                self.coordinator.reset_processing_state();
                Err(e.into())
            }
        }
    }

    async fn run_batch(&self, batch: &[PendingMessage]) {
        let Some(first) = batch.first() else {
            return;
        };
        tracing::info!(
            "Sending batch of {} message(s) in session '{}'",
            batch.len(),
            self.session_id()
        );
        let prompt = merge_batch_prompt(batch);
        match self
            .chat
            .send_batch(&prompt, Some(first.sender()), batch)
            .await
        {
            Ok(outcome) => tracing::info!(
                "Reply in session '{}' finished: {:?}",
                self.session_id(),
                outcome
            ),
            Err(e) => tracing::warn!("Reply in session '{}' failed: {}", self.session_id(), e),
        }
    }
}
