//! Channel registry: at most one live [`StreamChannel`] per logical key.

use super::{ChannelStatus, Connector, Feed, StreamChannel, WsConfig};

use futures_util::future::BoxFuture;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Type-erased lifecycle operations over any `StreamChannel<F>`.
trait ChannelOps: Send + Sync {
    fn status(&self) -> ChannelStatus;
    fn restart(&self);
    fn shutdown(&self) -> BoxFuture<'_, ()>;
}

impl<F: Feed> ChannelOps for StreamChannel<F> {
    fn status(&self) -> ChannelStatus {
        StreamChannel::status(self)
    }

    fn restart(&self) {
        StreamChannel::restart(self)
    }

    fn shutdown(&self) -> BoxFuture<'_, ()> {
        Box::pin(StreamChannel::shutdown(self))
    }
}

struct Entry {
    any: Arc<dyn Any + Send + Sync>,
    ops: Arc<dyn ChannelOps>,
}

impl Entry {
    fn new<F: Feed>(channel: &Arc<StreamChannel<F>>) -> Self {
        Self {
            any: channel.clone(),
            ops: channel.clone(),
        }
    }
}

/// Owns every open channel, keyed by a logical name such as `"trades"` or
/// `"explorer"`.
pub struct ChannelRegistry {
    connector: Arc<dyn Connector>,
    config: WsConfig,
    channels: Mutex<HashMap<String, Entry>>,
}

impl ChannelRegistry {
    pub fn new(connector: Arc<dyn Connector>, config: WsConfig) -> Self {
        Self {
            connector,
            config,
            channels: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &WsConfig {
        &self.config
    }

    /// Connect `key` to `(url, params)`.
    ///
    /// Returns the existing channel when the key is already bound to the
    /// same feed type and target (restarting it if it went idle or failed).
    /// A channel for a different target is shut down before the new one is
    /// spawned.
    pub async fn connect<F: Feed>(
        &self,
        key: impl Into<String>,
        url: impl Into<String>,
        feed: F,
        params: F::Params,
    ) -> Arc<StreamChannel<F>> {
        let key = key.into();
        let url = url.into();

        let previous = {
            let mut channels = self.lock();
            if let Some(existing) = Self::matching(&channels, &key, &url, &params) {
                return existing;
            }
            channels.remove(&key)
        };

        if let Some(previous) = previous {
            tracing::info!(channel = %key, "closing channel bound to a previous target");
            previous.ops.shutdown().await;
        }

        tracing::debug!(channel = %key, url = %url, ?params, "opening channel");
        let channel = Arc::new(StreamChannel::connect(
            key.clone(),
            url,
            feed,
            params,
            Arc::clone(&self.connector),
            self.config.clone(),
        ));

        let raced = self.lock().insert(key, Entry::new(&channel));
        if let Some(raced) = raced {
            raced.ops.shutdown().await;
        }
        channel
    }

    /// Typed lookup; `None` if absent or bound to a different feed type.
    /// The channel under `key` if it already serves `url` with `params`,
    /// restarted when parked.
    pub fn reuse<F: Feed>(
        &self,
        key: &str,
        url: &str,
        params: &F::Params,
    ) -> Option<Arc<StreamChannel<F>>> {
        Self::matching(&self.lock(), key, url, params)
    }

    fn matching<F: Feed>(
        channels: &HashMap<String, Entry>,
        key: &str,
        url: &str,
        params: &F::Params,
    ) -> Option<Arc<StreamChannel<F>>> {
        let existing = Arc::clone(&channels.get(key)?.any)
            .downcast::<StreamChannel<F>>()
            .ok()?;
        if existing.params() != params || existing.url() != url {
            return None;
        }
        if existing.status().is_parked() {
            existing.restart();
        }
        Some(existing)
    }

    pub fn get<F: Feed>(&self, key: &str) -> Option<Arc<StreamChannel<F>>> {
        let any = Arc::clone(&self.lock().get(key)?.any);
        any.downcast::<StreamChannel<F>>().ok()
    }

    pub fn status(&self, key: &str) -> Option<ChannelStatus> {
        self.lock().get(key).map(|e| e.ops.status())
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Close and forget `key`. Returns `false` (and does nothing) if absent.
    pub async fn disconnect(&self, key: &str) -> bool {
        let entry = self.lock().remove(key);
        match entry {
            Some(entry) => {
                entry.ops.shutdown().await;
                true
            }
            None => false,
        }
    }

    pub async fn disconnect_all(&self) {
        let entries: Vec<(String, Entry)> = self.lock().drain().collect();
        for (key, entry) in entries {
            tracing::debug!(channel = %key, "closing channel");
            entry.ops.shutdown().await;
        }
    }

    /// Reset the attempt counter of `key` and reconnect now.
    pub fn restart(&self, key: &str) -> bool {
        match self.lock().get(key) {
            Some(entry) => {
                entry.ops.restart();
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::super::channel::tests::{EchoFeed, MockConnector};
    use super::*;
    use crate::ws::{ConnectionState, Frame};

    fn registry(connector: Arc<MockConnector>) -> ChannelRegistry {
        ChannelRegistry::new(connector, WsConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_target_reuses_channel() {
        let (connector, mut accepted) = MockConnector::new([], true);
        let registry = registry(connector.clone());

        let a = registry
            .connect("trades", "wss://mock", EchoFeed, "HYPE".to_string())
            .await;
        let _server = accepted.recv().await.unwrap();
        let b = registry
            .connect("trades", "wss://mock", EchoFeed, "HYPE".to_string())
            .await;

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(connector.connect_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reuse_requires_same_target() {
        let (connector, mut accepted) = MockConnector::new([], true);
        let registry = registry(connector.clone());
        let hype = "HYPE".to_string();

        assert!(registry.reuse::<EchoFeed>("trades", "wss://mock", &hype).is_none());
        let a = registry
            .connect("trades", "wss://mock", EchoFeed, hype.clone())
            .await;
        let _server = accepted.recv().await.unwrap();

        let b = registry.reuse::<EchoFeed>("trades", "wss://mock", &hype).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(registry
            .reuse::<EchoFeed>("trades", "wss://mock", &"BTC".to_string())
            .is_none());
        assert!(registry.reuse::<EchoFeed>("trades", "wss://other", &hype).is_none());
        assert_eq!(connector.connect_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_target_closes_previous_first() {
        let (connector, mut accepted) = MockConnector::new([], true);
        let registry = registry(connector.clone());

        let old = registry
            .connect("trades", "wss://mock", EchoFeed, "HYPE".to_string())
            .await;
        let mut old_server = accepted.recv().await.unwrap();
        let _ = old_server.next_text().await;

        let new = registry
            .connect("trades", "wss://mock", EchoFeed, "BTC".to_string())
            .await;

        // The old socket was closed before the new channel existed.
        assert!(matches!(
            old_server.from_client.recv().await,
            Some(Frame::Close(Some((1000, _))))
        ));
        assert_eq!(old.state(), ConnectionState::Idle);

        let mut new_server = accepted.recv().await.unwrap();
        assert!(new_server.next_text().await.contains("BTC"));
        assert_eq!(new.params(), "BTC");
        assert_eq!(registry.len(), 1);
        assert!(registry.get::<EchoFeed>("trades").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_is_idempotent() {
        let (connector, mut accepted) = MockConnector::new([], true);
        let registry = registry(connector);

        registry
            .connect("trades", "wss://mock", EchoFeed, "HYPE".to_string())
            .await;
        let _server = accepted.recv().await.unwrap();

        assert!(registry.disconnect("trades").await);
        assert!(!registry.disconnect("trades").await);
        assert!(!registry.disconnect("never-opened").await);
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_all_and_restart() {
        let (connector, mut accepted) = MockConnector::new([], true);
        let registry = registry(connector.clone());

        let trades = registry
            .connect("trades", "wss://mock", EchoFeed, "HYPE".to_string())
            .await;
        registry
            .connect("book", "wss://mock", EchoFeed, "BTC".to_string())
            .await;
        let _a = accepted.recv().await.unwrap();
        let _b = accepted.recv().await.unwrap();
        assert_eq!(registry.keys(), vec!["book".to_string(), "trades".to_string()]);

        assert!(registry.restart("trades"));
        let _c = accepted.recv().await.unwrap();
        assert_eq!(connector.connect_count(), 3);
        assert!(!registry.restart("missing"));

        registry.disconnect_all().await;
        assert!(registry.is_empty());
        assert_eq!(trades.state(), ConnectionState::Idle);
        assert_eq!(registry.status("trades"), None);
    }
}
