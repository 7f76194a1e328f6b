//! MessagePusher trait 定義
//!
//! Delivery of serialized messages to connected participants. The WebSocket
//! implementation lives in the infrastructure layer.

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{
    error::MessagePushError,
    value_object::{SessionId, UserId},
};

/// Outbound queue of one connection.
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// A participant's connection within a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionKey {
    pub session: SessionId,
    pub user: UserId,
}

impl ConnectionKey {
    pub fn new(session: SessionId, user: UserId) -> Self {
        Self { session, user }
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.session, self.user)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePusher: Send + Sync {
    async fn register_client(&self, key: ConnectionKey, sender: PusherChannel);

    async fn unregister_client(&self, key: &ConnectionKey);

    async fn is_registered(&self, key: &ConnectionKey) -> bool;

    /// Every live connection of one session
    async fn connections_in(&self, session: &SessionId) -> Vec<ConnectionKey>;

    async fn push_to(&self, key: &ConnectionKey, content: &str) -> Result<(), MessagePushError>;

    /// Push to many connections; individual failures are logged, not returned
    async fn broadcast(
        &self,
        targets: Vec<ConnectionKey>,
        content: &str,
    ) -> Result<(), MessagePushError>;
}
