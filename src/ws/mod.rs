//! WebSocket layer: envelopes, connection state, one reconnecting channel
//! generic over the feed it carries, and a registry keyed by channel name.
//!
//! - [`connector`]: the transport seam (`tokio-tungstenite` under `ws-native`)
//! - [`channel`]: [`StreamChannel`], connection lifecycle and backoff
//! - [`feed`]: the [`Feed`] trait each domain feed implements
//! - [`registry`]: at most one live channel per key

pub mod channel;
pub mod connector;
pub mod feed;
pub mod registry;
pub mod subscriptions;

pub use channel::StreamChannel;
pub use connector::{Connection, Connector, Frame, FrameSink, FrameStream};
pub use feed::Feed;
pub use registry::ChannelRegistry;
pub use subscriptions::Subscription;

#[cfg(feature = "ws-native")]
pub use connector::TungsteniteConnector;

use crate::error::WsError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Close code used for client-initiated disconnects. Any other code, or a
/// transport error, counts as abnormal and triggers a reconnect.
pub const NORMAL_CLOSE: u16 = 1000;

// ─── Outbound messages ───────────────────────────────────────────────────────

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum MessageOut {
    Subscribe { subscription: Subscription },
    Unsubscribe { subscription: Subscription },
    Ping,
}

impl MessageOut {
    pub fn to_json(&self) -> Result<String, WsError> {
        serde_json::to_string(self).map_err(|e| WsError::SendFailed(e.to_string()))
    }
}

// ─── Inbound messages ────────────────────────────────────────────────────────

/// Inbound envelope. `data` is decoded by the feed that owns `channel`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope {
    pub channel: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Envelope {
    /// Keepalive replies and subscription acknowledgements.
    pub fn is_control(&self) -> bool {
        matches!(self.channel.as_str(), "pong" | "subscriptionResponse")
    }
}

// ─── Connection state ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Reconnecting,
    /// Reconnect attempts exhausted. Only a manual restart leaves this state.
    Failed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Latest connection status, published on a watch channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelStatus {
    pub state: ConnectionState,
    /// Reconnect attempts since the last successful open.
    pub attempts: u32,
    /// Cause of the last disconnect; cleared on open.
    pub error: Option<WsError>,
}

impl Default for ChannelStatus {
    fn default() -> Self {
        Self {
            state: ConnectionState::Idle,
            attempts: 0,
            error: None,
        }
    }
}

impl ChannelStatus {
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Idle or Failed: nothing happens until a command arrives.
    pub fn is_parked(&self) -> bool {
        matches!(self.state, ConnectionState::Idle | ConnectionState::Failed)
    }
}

/// Lifecycle transitions, broadcast to any interested consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Connected,
    Disconnected { code: Option<u16>, reason: String },
    ReconnectScheduled { attempt: u32, delay: Duration },
    Failed { attempts: u32 },
}

// ─── Config ──────────────────────────────────────────────────────────────────

/// Configuration shared by every channel in a registry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WsConfig {
    pub max_reconnect_attempts: u32,
    pub base_reconnect_delay_ms: u64,
    pub max_reconnect_delay_ms: u64,
    pub connect_timeout_ms: u64,
    /// Application-level keepalive interval; 0 disables pings.
    pub ping_interval_ms: u64,
    pub event_capacity: usize,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: 5,
            base_reconnect_delay_ms: 1000,
            max_reconnect_delay_ms: 30_000,
            connect_timeout_ms: 15_000,
            ping_interval_ms: 30_000,
            event_capacity: 256,
        }
    }
}

impl WsConfig {
    /// `base * 2^(attempt-1)`, capped. `attempt` starts at 1.
    pub fn reconnect_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(20);
        let ms = self
            .base_reconnect_delay_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_reconnect_delay_ms);
        Duration::from_millis(ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_out_wire_format() {
        let sub = MessageOut::Subscribe {
            subscription: Subscription::trades("HYPE"),
        };
        assert_eq!(
            serde_json::to_value(&sub).unwrap(),
            json!({"method": "subscribe", "subscription": {"type": "trades", "coin": "HYPE"}})
        );
        assert_eq!(MessageOut::Ping.to_json().unwrap(), r#"{"method":"ping"}"#);
    }

    #[test]
    fn test_envelope_parse() {
        let env: Envelope =
            serde_json::from_str(r#"{"channel":"trades","data":[{"coin":"HYPE"}]}"#).unwrap();
        assert_eq!(env.channel, "trades");
        assert!(env.data.is_array());
        assert!(!env.is_control());

        let pong: Envelope = serde_json::from_str(r#"{"channel":"pong"}"#).unwrap();
        assert!(pong.is_control());
        assert!(pong.data.is_null());
    }

    #[test]
    fn test_reconnect_delay_doubles_and_caps() {
        let config = WsConfig::default();
        assert_eq!(config.reconnect_delay(1), Duration::from_millis(1000));
        assert_eq!(config.reconnect_delay(2), Duration::from_millis(2000));
        assert_eq!(config.reconnect_delay(3), Duration::from_millis(4000));
        assert_eq!(config.reconnect_delay(10), Duration::from_millis(30_000));
    }

    #[test]
    fn test_config_deserialize_partial() {
        let config: WsConfig =
            serde_json::from_str(r#"{"max_reconnect_attempts": 2, "ping_interval_ms": 0}"#)
                .unwrap();
        assert_eq!(config.max_reconnect_attempts, 2);
        assert_eq!(config.ping_interval_ms, 0);
        assert_eq!(config.base_reconnect_delay_ms, 1000);
    }
}
