//! Shared application state.

use std::sync::Arc;

use gamejam_shared::time::Clock;

use crate::{
    domain::{CompletionProvider, GameRepository, MessagePusher, SharedStateChannel},
    usecase::{
        ChatSessionConfig, ConnectParticipantUseCase, DisconnectParticipantUseCase, GameUseCase,
        SessionRegistry,
    },
};

use super::fanout::spawn_fanout;

pub struct AppState {
    /// Game sessions, created on first connection
    pub registry: Arc<SessionRegistry>,
    /// MessagePusher（メッセージ通知の抽象化）
    pub message_pusher: Arc<dyn MessagePusher>,
    pub completion_provider: Arc<dyn CompletionProvider>,
    pub connect_participant_usecase: Arc<ConnectParticipantUseCase>,
    pub disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
    pub game_usecase: Arc<GameUseCase>,
}

impl AppState {
    /// Wire every use case. Each new session gets a fan-out task that pushes
    /// its state changes to the session's connections until it is evicted.
    pub fn new(
        channel: Arc<dyn SharedStateChannel>,
        completion_provider: Arc<dyn CompletionProvider>,
        message_pusher: Arc<dyn MessagePusher>,
        game_repository: Arc<dyn GameRepository>,
        clock: Arc<dyn Clock>,
        config: ChatSessionConfig,
    ) -> Arc<Self> {
        let registry = {
            let message_pusher = message_pusher.clone();
            SessionRegistry::new(channel, completion_provider.clone(), clock.clone(), config)
                .with_on_created(move |session| {
                    Some(spawn_fanout(session, message_pusher.clone()))
                })
        };

        Arc::new(Self {
            registry: Arc::new(registry),
            connect_participant_usecase: Arc::new(ConnectParticipantUseCase::new(
                message_pusher.clone(),
                clock,
            )),
            disconnect_participant_usecase: Arc::new(DisconnectParticipantUseCase::new(
                message_pusher.clone(),
            )),
            game_usecase: Arc::new(GameUseCase::new(game_repository)),
            message_pusher,
            completion_provider,
        })
    }
}
