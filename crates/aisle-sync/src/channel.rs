//! # Shared Channel
//!
//! The key-value bus the basket shares with its hardware: the mode switch,
//! the scale, the display and the drive controller all read and write plain
//! JSON values under string keys.
//!
//! ```text
//!   hardware                    SharedChannel                    engine
//!   ────────                    ─────────────                    ──────
//!   mode switch ──write──►  Shopping_Basket/Modes  ──subscribe──► ModeChannelListener
//!   display     ──write──►  Shopping_Basket/Product_Name ◄─read── CartStateMachine
//!   scale       ──write──►  Shopping_Basket/Weight       ◄─read── checkout
//!   display     ◄──read───  Shopping_Basket/Product_Weight ◄write─ CartStateMachine
//!   drive/LEDs  ◄──read───  Shopping_Basket/Direction    ◄write── FeedbackPublisher
//! ```
//!
//! Code above this layer goes through [`TopicBus`](crate::topics::TopicBus)
//! and never touches raw keys or JSON.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tokio::sync::broadcast;
use tracing::trace;

use crate::config::ChannelSettings;
use crate::error::{SyncError, SyncResult};

/// Buffered updates per key before a slow subscriber starts lagging.
pub const DEFAULT_SUBSCRIPTION_CAPACITY: usize = 64;

/// A remote key-value store with change notifications.
#[async_trait]
pub trait SharedChannel: Send + Sync {
    /// Current value under `key`, `None` if never written.
    async fn read(&self, key: &str) -> SyncResult<Option<Value>>;

    /// Replaces the value under `key` and notifies subscribers.
    async fn write(&self, key: &str, value: Value) -> SyncResult<()>;

    /// Receives every value written to `key` after this call.
    fn subscribe(&self, key: &str) -> SyncResult<broadcast::Receiver<Value>>;
}

/// In-process channel for tests, demos and single-node deployments.
///
/// Every write is broadcast, including a write of the value already stored.
pub struct InMemoryChannel {
    values: RwLock<HashMap<String, Value>>,
    senders: RwLock<HashMap<String, broadcast::Sender<Value>>>,
    capacity: usize,
    offline: AtomicBool,
}

impl InMemoryChannel {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SUBSCRIPTION_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        InMemoryChannel {
            values: RwLock::new(HashMap::new()),
            senders: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            offline: AtomicBool::new(false),
        }
    }

    /// Channel sized by the `[channel]` config section.
    pub fn from_settings(settings: &ChannelSettings) -> Self {
        Self::with_capacity(settings.subscription_capacity)
    }

    /// While offline every write fails, as if the connection dropped.
    /// Reads keep serving the last known values.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Snapshot of every key, sorted. Used by the node console.
    pub fn dump(&self) -> SyncResult<Vec<(String, Value)>> {
        let values = self.values.read().map_err(|_| poisoned())?;
        let mut entries: Vec<_> = values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }

    fn sender(&self, key: &str) -> SyncResult<broadcast::Sender<Value>> {
        if let Some(sender) = self.senders.read().map_err(|_| poisoned())?.get(key) {
            return Ok(sender.clone());
        }
        let mut senders = self.senders.write().map_err(|_| poisoned())?;
        let sender = senders
            .entry(key.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        Ok(sender.clone())
    }
}

impl Default for InMemoryChannel {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> SyncError {
    SyncError::Internal("channel lock poisoned".into())
}

#[async_trait]
impl SharedChannel for InMemoryChannel {
    async fn read(&self, key: &str) -> SyncResult<Option<Value>> {
        let values = self.values.read().map_err(|_| poisoned())?;
        Ok(values.get(key).cloned())
    }

    async fn write(&self, key: &str, value: Value) -> SyncResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(SyncError::Persistence(format!(
                "channel offline, write to {key} dropped"
            )));
        }

        {
            let mut values = self.values.write().map_err(|_| poisoned())?;
            values.insert(key.to_string(), value.clone());
        }

        // No subscribers is fine; the value is still stored.
        let receivers = self.sender(key)?.send(value).unwrap_or(0);
        trace!(key, receivers, "Channel write");
        Ok(())
    }

    fn subscribe(&self, key: &str) -> SyncResult<broadcast::Receiver<Value>> {
        Ok(self.sender(key)?.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_read_missing_key() {
        let channel = InMemoryChannel::new();
        assert_eq!(channel.read("Shopping_Basket/Weight").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_subscriber_sees_every_write() {
        let channel = InMemoryChannel::new();
        let mut rx = channel.subscribe("Modes").unwrap();

        channel.write("Modes", json!(1)).await.unwrap();
        channel.write("Modes", json!(1)).await.unwrap();
        channel.write("Other", json!("x")).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), json!(1));
        assert_eq!(rx.recv().await.unwrap(), json!(1));
        assert!(rx.try_recv().is_err());
        assert_eq!(channel.read("Modes").await.unwrap(), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_configured_capacity_bounds_subscriber_buffer() {
        let settings = ChannelSettings {
            subscription_capacity: 2,
            ..ChannelSettings::default()
        };
        let channel = InMemoryChannel::from_settings(&settings);
        let mut rx = channel.subscribe("Modes").unwrap();

        for value in 1..=3 {
            channel.write("Modes", json!(value)).await.unwrap();
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
        assert_eq!(rx.recv().await.unwrap(), json!(2));
        assert_eq!(rx.recv().await.unwrap(), json!(3));
    }

    #[tokio::test]
    async fn test_offline_rejects_writes() {
        let channel = InMemoryChannel::new();
        channel.write("Direction", json!("S")).await.unwrap();

        channel.set_offline(true);
        let err = channel.write("Direction", json!("E")).await.unwrap_err();
        assert!(matches!(err, SyncError::Persistence(_)));
        assert_eq!(channel.read("Direction").await.unwrap(), Some(json!("S")));

        channel.set_offline(false);
        channel.write("Direction", json!("E")).await.unwrap();
        assert_eq!(channel.dump().unwrap(), vec![("Direction".to_string(), json!("E"))]);
    }
}
