//! Client configuration.
//!
//! Every section has a `Default` and deserializes from JSON with missing
//! fields filled in, so a host can ship a partial config file:
//!
//! ```rust,ignore
//! let config = SyncConfig::from_json_str(r#"{ "cache": { "ttl_ms": 5000 } }"#)?;
//! ```

use crate::cache::CacheConfig;
use crate::domain::explorer::{DEFAULT_BLOCK_CAPACITY, DEFAULT_TX_CAPACITY};
use crate::domain::orderbook::{DEFAULT_BOOK_DEPTH, DEFAULT_BOOK_HISTORY};
use crate::domain::trade::DEFAULT_TRADE_CAPACITY;
use crate::error::SyncError;
use crate::fetch::FetchOptions;
use crate::http::RetryConfig;
use crate::network;
use crate::ws::WsConfig;
use serde::Deserialize;
use std::time::Duration;

/// Top-level configuration for a [`SyncClient`](crate::client::SyncClient).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Explorer REST backend.
    pub api_url: String,
    /// Market-data info endpoint.
    pub info_url: String,
    /// Market-data WebSocket.
    pub ws_url: String,
    /// Explorer WebSocket.
    pub explorer_ws_url: String,
    /// Per-request timeout for the default transport.
    pub request_timeout_ms: u64,
    pub cache: CacheConfig,
    pub retry: RetryConfig,
    /// Defaults for orchestrators started through the client.
    pub fetch: FetchOptions,
    pub ws: WsConfig,
    pub feeds: FeedConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: network::DEFAULT_API_URL.to_string(),
            info_url: network::DEFAULT_INFO_URL.to_string(),
            ws_url: network::DEFAULT_WS_URL.to_string(),
            explorer_ws_url: network::DEFAULT_EXPLORER_WS_URL.to_string(),
            request_timeout_ms: 30_000,
            cache: CacheConfig::default(),
            retry: RetryConfig::default(),
            fetch: FetchOptions::default(),
            ws: WsConfig::default(),
            feeds: FeedConfig::default(),
        }
    }
}

impl SyncConfig {
    pub fn from_json_str(json: &str) -> Result<Self, SyncError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Bounds on the in-memory views kept by each feed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub trade_capacity: usize,
    pub book_depth: usize,
    /// Number of top-of-book snapshots retained.
    pub book_history: usize,
    pub block_capacity: usize,
    pub tx_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            trade_capacity: DEFAULT_TRADE_CAPACITY,
            book_depth: DEFAULT_BOOK_DEPTH,
            book_history: DEFAULT_BOOK_HISTORY,
            block_capacity: DEFAULT_BLOCK_CAPACITY,
            tx_capacity: DEFAULT_TX_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_default() {
        let config = SyncConfig::from_json_str("{}").unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.cache.ttl_ms, 30_000);
        assert_eq!(config.ws.max_reconnect_attempts, 5);
        assert_eq!(config.fetch.max_retries, 3);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = SyncConfig::from_json_str(
            r#"{
                "api_url": "http://explorer.local",
                "cache": { "ttl_ms": 5000 },
                "ws": { "max_reconnect_attempts": 2 },
                "fetch": { "refresh_interval_ms": 10000 },
                "feeds": { "trade_capacity": 10 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.api_url, "http://explorer.local");
        assert_eq!(config.ws_url, network::DEFAULT_WS_URL);
        assert_eq!(config.cache.ttl_ms, 5000);
        assert_eq!(config.cache.max_size, 500);
        assert_eq!(config.ws.max_reconnect_attempts, 2);
        assert_eq!(config.ws.base_reconnect_delay_ms, 1000);
        assert_eq!(config.fetch.refresh_interval, Some(Duration::from_secs(10)));
        assert_eq!(config.feeds.trade_capacity, 10);
        assert_eq!(config.feeds.book_depth, DEFAULT_BOOK_DEPTH);
    }

    #[test]
    fn test_malformed_json_is_serde_error() {
        let err = SyncConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, SyncError::Serde(_)));
    }
}
