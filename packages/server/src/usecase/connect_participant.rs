//! UseCase: 参加者接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectParticipantUseCase::execute() メソッド
//! - 参加者の接続処理（重複チェック、接続登録、ActivePlayers への追加）
//!
//! ### なぜこのテストが必要か
//! - 同じセッションに同じユーザーが二重に接続できないことを保証
//! - 別セッションであれば同じユーザーでも接続できることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規参加者の接続
//! - 異常系：同じ user_id での重複接続

use std::sync::Arc;

use gamejam_shared::time::Clock;

use crate::domain::{
    ActivePlayer, ConnectionKey, MessagePusher, Participant, PusherChannel, Timestamp,
};

use super::{error::ConnectError, game_session::GameSession};

/// 参加者接続のユースケース
pub struct ConnectParticipantUseCase {
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl ConnectParticipantUseCase {
    pub fn new(message_pusher: Arc<dyn MessagePusher>, clock: Arc<dyn Clock>) -> Self {
        Self {
            message_pusher,
            clock,
        }
    }

    /// 参加者接続を実行
    ///
    /// # Returns
    ///
    /// * `Ok(ActivePlayer)` - 接続成功（ActivePlayers に追加されたエントリ）
    /// * `Err(ConnectError)` - 重複接続、または共有状態の更新失敗
    pub async fn execute(
        &self,
        session: &GameSession,
        participant: Participant,
        sender: PusherChannel,
    ) -> Result<ActivePlayer, ConnectError> {
        // 1. 重複チェック
        let key = ConnectionKey::new(session.session_id().clone(), participant.id.clone());
        if self.message_pusher.is_registered(&key).await {
            return Err(ConnectError::DuplicateUser(participant.id.into_string()));
        }

        // 2. MessagePusher に接続を登録
        self.message_pusher.register_client(key.clone(), sender).await;

        // 3. ActivePlayers に追加
        let player = ActivePlayer {
            id: participant.id,
            username: participant.display_name,
            avatar: participant.avatar,
            session_id: session.session_id().clone(),
            joined_at: Timestamp::new(self.clock.now_millis()),
        };
        if let Err(e) = session.join(player.clone()).await {
            self.message_pusher.unregister_client(&key).await;
            return Err(e.into());
        }

        Ok(player)
    }
}
