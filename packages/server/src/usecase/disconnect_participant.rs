//! UseCase: 参加者切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectParticipantUseCase::execute() メソッド
//! - 参加者の切断処理（接続の登録解除、ActivePlayers・入力中リストからの削除）
//!
//! ### なぜこのテストが必要か
//! - 入力中のまま切断した参加者がバッチを永久に塞がないことを保証
//! - 残りの参加者数が正しく数えられることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加者の切断
//! - エッジケース：入力中の参加者の切断で待機中のバッチが送信される
//! - エッジケース：未登録の参加者の切断（何もしない）

use std::sync::Arc;

use crate::domain::{ConnectionKey, MessagePusher, UserId};

use super::{
    error::SessionError,
    game_session::{Dispatch, GameSession},
};

/// 参加者切断のユースケース
pub struct DisconnectParticipantUseCase {
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl DisconnectParticipantUseCase {
    pub fn new(message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self { message_pusher }
    }

    /// 参加者切断を実行
    ///
    /// 参加者が入力中だった場合、その入力で止まっていたバッチが送信されることがある。
    pub async fn execute(
        &self,
        session: &Arc<GameSession>,
        user: &UserId,
    ) -> Result<Dispatch, SessionError> {
        let key = ConnectionKey::new(session.session_id().clone(), user.clone());
        self.message_pusher.unregister_client(&key).await;
        session.leave(user).await
    }

    /// セッションに残っている接続数
    pub async fn count_remaining_participants(&self, session: &GameSession) -> usize {
        self.message_pusher
            .connections_in(session.session_id())
            .await
            .len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use futures_util::stream;
    use gamejam_shared::time::FixedClock;

    use super::*;
    use crate::{
        domain::{
            CompletionError, CompletionProvider, CompletionRequest, Participant, SessionId,
            TextStream,
        },
        infrastructure::{
            message_pusher::WebSocketMessagePusher, state_channel::InMemoryStateChannel,
        },
        usecase::{chat_session::ChatSessionConfig, connect_participant::ConnectParticipantUseCase},
    };

    #[derive(Default)]
    struct CountingProvider {
        requests: Mutex<usize>,
    }

    #[async_trait]
    impl CompletionProvider for CountingProvider {
        async fn stream(&self, _request: CompletionRequest) -> Result<TextStream, CompletionError> {
            *self.requests.lock().unwrap() += 1;
            Ok(Box::pin(stream::iter(vec![Ok("ok".to_string())])))
        }
    }

    fn participant(name: &str) -> Participant {
        Participant::new(UserId::new(name.to_string()).unwrap(), name, None)
    }

    struct Fixture {
        session: Arc<GameSession>,
        provider: Arc<CountingProvider>,
        connect: ConnectParticipantUseCase,
        disconnect: DisconnectParticipantUseCase,
    }

    fn create_fixture() -> Fixture {
        let provider = Arc::new(CountingProvider::default());
        let session = GameSession::new(
            SessionId::new("pong".to_string()).unwrap(),
            Arc::new(InMemoryStateChannel::new()),
            provider.clone(),
            Arc::new(FixedClock::new(1_000)),
            ChatSessionConfig::default(),
        );
        let message_pusher = Arc::new(WebSocketMessagePusher::new());
        Fixture {
            session,
            provider,
            connect: ConnectParticipantUseCase::new(
                message_pusher.clone(),
                Arc::new(FixedClock::new(1_000)),
            ),
            disconnect: DisconnectParticipantUseCase::new(message_pusher),
        }
    }

    #[tokio::test]
    async fn test_disconnect_participant_success() {
        // テスト項目: 参加者が正常に切断でき、残りの接続数が減る
        // given (前提条件):
        let fixture = create_fixture();
        let (tx1, _rx1) = tokio::sync::mpsc::unbounded_channel();
        let (tx2, _rx2) = tokio::sync::mpsc::unbounded_channel();
        fixture
            .connect
            .execute(&fixture.session, participant("alice"), tx1)
            .await
            .unwrap();
        fixture
            .connect
            .execute(&fixture.session, participant("bob"), tx2)
            .await
            .unwrap();

        // when (操作): alice を切断
        let alice = UserId::new("alice".to_string()).unwrap();
        let result = fixture.disconnect.execute(&fixture.session, &alice).await;

        // then (期待する結果):
        assert!(!result.unwrap().is_started());
        assert_eq!(
            fixture
                .disconnect
                .count_remaining_participants(&fixture.session)
                .await,
            1
        );
        let players = fixture.session.state().active_players().await.unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].id.as_str(), "bob");
    }

    #[tokio::test]
    async fn test_disconnecting_composer_flushes_waiting_batch() {
        // テスト項目: 入力中の参加者が切断すると、待機していたバッチが送信される
        // given (前提条件):
        let fixture = create_fixture();
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let bob = participant("bob");
        fixture
            .connect
            .execute(&fixture.session, bob.clone(), tx)
            .await
            .unwrap();
        fixture
            .session
            .set_typing_status(&bob, true, "")
            .await
            .unwrap();
        fixture
            .session
            .submit(&participant("alice"), "make pong")
            .await
            .unwrap();

        // when (操作):
        let dispatch = fixture.disconnect.execute(&fixture.session, &bob.id).await;

        // then (期待する結果):
        match dispatch.unwrap() {
            Dispatch::Started(handle) => handle.await.unwrap(),
            Dispatch::Waiting => panic!("batch should have been released"),
        }
        assert_eq!(*fixture.provider.requests.lock().unwrap(), 1);
        assert!(fixture
            .session
            .state()
            .typing_participants()
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_unknown_participant_is_noop() {
        // テスト項目: 接続していない参加者の切断は何も変えない
        // given (前提条件):
        let fixture = create_fixture();

        // when (操作):
        let ghost = UserId::new("ghost".to_string()).unwrap();
        let result = fixture.disconnect.execute(&fixture.session, &ghost).await;

        // then (期待する結果):
        assert!(!result.unwrap().is_started());
        assert_eq!(
            fixture
                .disconnect
                .count_remaining_participants(&fixture.session)
                .await,
            0
        );
    }
}
