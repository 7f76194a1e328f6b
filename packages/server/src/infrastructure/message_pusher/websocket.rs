//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - 接続ごとの `UnboundedSender` を `ConnectionKey`（セッション + ユーザー）で管理
//! - 接続へのメッセージ送信（push_to, broadcast）
//! - セッション単位の配信先一覧（`connections_in`）
//!
//! WebSocket の生成は UI 層（`ui/handler/websocket.rs`）で行われます。
//! この実装は生成された sender を受け取り、メッセージ送信に使用します。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ConnectionKey, MessagePushError, MessagePusher, PusherChannel, SessionId};

/// WebSocket を使った MessagePusher 実装
pub struct WebSocketMessagePusher {
    /// 接続中のクライアントの WebSocket sender
    clients: Mutex<HashMap<ConnectionKey, PusherChannel>>,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for WebSocketMessagePusher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_client(&self, key: ConnectionKey, sender: PusherChannel) {
        let mut clients = self.clients.lock().await;
        tracing::debug!("Connection '{}' registered to MessagePusher", key);
        clients.insert(key, sender);
    }

    async fn unregister_client(&self, key: &ConnectionKey) {
        let mut clients = self.clients.lock().await;
        clients.remove(key);
        tracing::debug!("Connection '{}' unregistered from MessagePusher", key);
    }

    async fn is_registered(&self, key: &ConnectionKey) -> bool {
        let clients = self.clients.lock().await;
        clients.contains_key(key)
    }

    async fn connections_in(&self, session: &SessionId) -> Vec<ConnectionKey> {
        let clients = self.clients.lock().await;
        clients
            .keys()
            .filter(|key| &key.session == session)
            .cloned()
            .collect()
    }

    async fn push_to(&self, key: &ConnectionKey, content: &str) -> Result<(), MessagePushError> {
        let clients = self.clients.lock().await;

        let sender = clients
            .get(key)
            .ok_or_else(|| MessagePushError::ClientNotFound(key.to_string()))?;
        sender
            .send(content.to_string())
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))?;
        tracing::trace!("Pushed message to '{}'", key);
        Ok(())
    }

    async fn broadcast(
        &self,
        targets: Vec<ConnectionKey>,
        content: &str,
    ) -> Result<(), MessagePushError> {
        let clients = self.clients.lock().await;

        for target in targets {
            match clients.get(&target) {
                Some(sender) => {
                    // ブロードキャストでは一部の送信失敗を許容
                    if let Err(e) = sender.send(content.to_string()) {
                        tracing::warn!("Failed to push message to '{}': {}", target, e);
                    }
                }
                None => {
                    tracing::warn!("Connection '{}' not found during broadcast, skipping", target);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;
    use tokio::sync::mpsc;

    fn key(session: &str, user: &str) -> ConnectionKey {
        ConnectionKey::new(
            SessionId::new(session.to_string()).unwrap(),
            UserId::new(user.to_string()).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_push_to_success() {
        // テスト項目: 特定の接続にメッセージを送信できる
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let alice = key("pong", "alice");
        pusher.register_client(alice.clone(), tx).await;

        // when (操作):
        let result = pusher.push_to(&alice, "Hello").await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(rx.recv().await, Some("Hello".to_string()));
    }

    #[tokio::test]
    async fn test_push_to_client_not_found() {
        // テスト項目: 存在しない接続への送信はエラーを返す
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();

        // when (操作):
        let result = pusher.push_to(&key("pong", "nobody"), "Hello").await;

        // then (期待する結果):
        assert!(matches!(result, Err(MessagePushError::ClientNotFound(_))));
    }

    #[tokio::test]
    async fn test_same_user_in_two_sessions_is_two_connections() {
        // テスト項目: 同じユーザーでもセッションが異なれば別の接続として扱われる
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        pusher.register_client(key("pong", "alice"), tx1).await;
        pusher.register_client(key("snake", "alice"), tx2).await;

        // when (操作):
        let targets = pusher
            .connections_in(&SessionId::new("pong".to_string()).unwrap())
            .await;
        pusher.broadcast(targets, "pong only").await.unwrap();

        // then (期待する結果):
        assert_eq!(rx1.recv().await, Some("pong only".to_string()));
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_partial_failure() {
        // テスト項目: ブロードキャスト時、一部の接続が存在しなくても成功する
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let alice = key("pong", "alice");
        pusher.register_client(alice.clone(), tx1).await;

        // when (操作):
        let result = pusher
            .broadcast(vec![alice, key("pong", "nobody")], "Broadcast message")
            .await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(rx1.recv().await, Some("Broadcast message".to_string()));
    }

    #[tokio::test]
    async fn test_unregister_client() {
        // テスト項目: 登録解除した接続は登録済みとみなされない
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let alice = key("pong", "alice");
        pusher.register_client(alice.clone(), tx).await;

        // when (操作):
        pusher.unregister_client(&alice).await;

        // then (期待する結果):
        assert!(!pusher.is_registered(&alice).await);
        assert!(pusher
            .connections_in(&SessionId::new("pong".to_string()).unwrap())
            .await
            .is_empty());
    }
}
