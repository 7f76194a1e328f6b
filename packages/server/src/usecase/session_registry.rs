//! UseCase: Session registry
//!
//! Game sessions are created lazily on first use. Every `get_or_create` takes
//! a lease; once the last lease is released and no reply is in flight the
//! session is evicted. The state left in the channel is picked up again if the
//! session is recreated.

use std::{collections::HashMap, sync::Arc};

use tokio::{sync::Mutex, task::JoinHandle};

use gamejam_shared::time::Clock;

use crate::domain::{CompletionProvider, SessionId, SharedStateChannel};

use super::{chat_session::ChatSessionConfig, game_session::GameSession};

/// Called once for every newly created session, before it is handed out.
/// A returned task lives as long as the session and is aborted on eviction.
pub type OnCreated = Box<dyn Fn(&Arc<GameSession>) -> Option<JoinHandle<()>> + Send + Sync>;

struct Entry {
    session: Arc<GameSession>,
    task: Option<JoinHandle<()>>,
    leases: usize,
}

pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, Entry>>,
    channel: Arc<dyn SharedStateChannel>,
    provider: Arc<dyn CompletionProvider>,
    clock: Arc<dyn Clock>,
    config: ChatSessionConfig,
    on_created: Option<OnCreated>,
}

impl SessionRegistry {
    pub fn new(
        channel: Arc<dyn SharedStateChannel>,
        provider: Arc<dyn CompletionProvider>,
        clock: Arc<dyn Clock>,
        config: ChatSessionConfig,
    ) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            channel,
            provider,
            clock,
            config,
            on_created: None,
        }
    }

    /// Hook run under the registry lock for each new session (e.g. to start
    /// its fan-out task).
    pub fn with_on_created<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Arc<GameSession>) -> Option<JoinHandle<()>> + Send + Sync + 'static,
    {
        self.on_created = Some(Box::new(hook));
        self
    }

    pub fn channel(&self) -> Arc<dyn SharedStateChannel> {
        self.channel.clone()
    }

    pub async fn get(&self, session_id: &SessionId) -> Option<Arc<GameSession>> {
        self.sessions
            .lock()
            .await
            .get(session_id)
            .map(|entry| entry.session.clone())
    }

    /// Look up or create a session, taking a lease on it.
    pub async fn get_or_create(&self, session_id: &SessionId) -> Arc<GameSession> {
        let mut sessions = self.sessions.lock().await;
        if let Some(entry) = sessions.get_mut(session_id) {
            entry.leases += 1;
            return entry.session.clone();
        }

        tracing::info!("Creating game session '{}'", session_id);
        let session = GameSession::new(
            session_id.clone(),
            self.channel.clone(),
            self.provider.clone(),
            self.clock.clone(),
            self.config,
        );
        if let Err(e) = session.initialize().await {
            tracing::warn!("Failed to initialize session '{}': {}", session_id, e);
        }
        let task = self.on_created.as_ref().and_then(|hook| hook(&session));
        sessions.insert(
            session_id.clone(),
            Entry {
                session: session.clone(),
                task,
                leases: 1,
            },
        );
        session
    }

    /// Give back a lease taken by [`get_or_create`](Self::get_or_create).
    /// Returns whether the session was evicted.
    pub async fn release(&self, session: Arc<GameSession>) -> bool {
        let mut sessions = self.sessions.lock().await;
        let session_id = session.session_id().clone();
        drop(session);

        let Some(entry) = sessions.get_mut(&session_id) else {
            return false;
        };
        entry.leases = entry.leases.saturating_sub(1);
        if entry.leases > 0 {
            return false;
        }
        match entry.session.is_busy().await {
            Ok(false) => {}
            Ok(true) => {
                tracing::debug!("Session '{}' is idle but still answering", session_id);
                return false;
            }
            Err(e) => {
                tracing::warn!("Failed to check session '{}': {}", session_id, e);
                return false;
            }
        }

        if let Some(task) = sessions.remove(&session_id).and_then(|entry| entry.task) {
            task.abort();
        }
        tracing::info!("Evicted idle game session '{}'", session_id);
        true
    }

    pub async fn session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}
