//! InMemory Shared State Channel 実装
//!
//! 全セッションのスロットを一つの HashMap に保持し、書き込みを
//! `tokio::sync::broadcast` で購読者に配信します。

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, broadcast};

use crate::domain::{SharedStateChannel, StateChange, StateChannelError, StateKey, Updater};

/// Default capacity of the change broadcast.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// インメモリ Shared State Channel 実装
///
/// Changes are sent while the store lock is held, so every subscriber sees
/// the writes of one key in the order they were applied.
pub struct InMemoryStateChannel {
    values: Mutex<HashMap<StateKey, Value>>,
    changes: broadcast::Sender<StateChange>,
}

impl InMemoryStateChannel {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity);
        Self {
            values: Mutex::new(HashMap::new()),
            changes,
        }
    }

    fn publish(&self, key: &StateKey, value: &Value) {
        // No subscribers is not an error
        let _ = self.changes.send(StateChange {
            key: key.clone(),
            value: value.clone(),
        });
    }
}

impl Default for InMemoryStateChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SharedStateChannel for InMemoryStateChannel {
    async fn get(&self, key: &StateKey) -> Option<Value> {
        let values = self.values.lock().await;
        values.get(key).cloned()
    }

    async fn set(&self, key: &StateKey, value: Value) -> Result<(), StateChannelError> {
        let mut values = self.values.lock().await;
        self.publish(key, &value);
        values.insert(key.clone(), value);
        tracing::trace!("State '{}/{}' set", key.session, key.slot.as_str());
        Ok(())
    }

    async fn update(
        &self,
        key: &StateKey,
        updater: Updater<'_>,
    ) -> Result<Value, StateChannelError> {
        let mut values = self.values.lock().await;
        let next = updater(values.get(key))?;
        self.publish(key, &next);
        values.insert(key.clone(), next.clone());
        tracing::trace!("State '{}/{}' updated", key.session, key.slot.as_str());
        Ok(next)
    }

    fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.changes.subscribe()
    }
}
