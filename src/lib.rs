//! # explorer-sync
//!
//! Data-synchronization layer for a blockchain market-data explorer: cached
//! HTTP with single-flight auth refresh, polling fetches with backoff, and
//! reconnecting WebSocket feeds for trades, order books, explorer blocks and
//! asset contexts.
//!
//! ## Architecture
//!
//! The crate is organized in layers:
//!
//! 1. **Core**: shared newtypes, bounded buffers, errors, configuration
//! 2. **Auth**: `TokenProvider` seam plus `TokenRefreshCoordinator`
//! 3. **HTTP**: `HttpGateway` over a `Transport`, with `ResponseCache` and retry policies
//! 4. **Fetch**: `FetchOrchestrator` (initial load, polling, retry, stale-result guard)
//! 5. **WebSocket**: generic `StreamChannel<F: Feed>` and `ChannelRegistry`
//! 6. **High-Level Client**: `SyncClient` with nested sub-clients
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use explorer_sync::prelude::*;
//!
//! let client = SyncClient::builder()
//!     .base_url("http://localhost:3001")
//!     .build()?;
//!
//! let blocks = client.explorer().recent_blocks(20).await?;
//! let trades = client.trades().subscribe("HYPE").await;
//! let mut view = trades.watch_view();
//! ```

// ── Layer 1: Core ────────────────────────────────────────────────────────────

/// Shared newtypes and the bounded ring buffer.
pub mod shared;

/// Feed domains (vertical slices): types, wire types, views, sub-clients.
pub mod domain;

/// Error taxonomy.
pub mod error;

/// Network URL constants.
pub mod network;

/// Deserializable configuration sections.
pub mod config;

// ── Layer 2: Auth ────────────────────────────────────────────────────────────

/// Token provider seam and single-flight refresh.
pub mod auth;

// ── Layer 3: HTTP API ────────────────────────────────────────────────────────

/// Short-TTL response cache.
pub mod cache;

/// HTTP gateway with caching, auth replay and retry policies.
pub mod http;

// ── Layer 4: Fetch ───────────────────────────────────────────────────────────

/// Fetch orchestration: state machine, polling, retry.
pub mod fetch;

// ── Layer 5: WebSocket ───────────────────────────────────────────────────────

/// Reconnecting channels and the channel registry.
pub mod ws;

// ── Layer 6: High-Level Client ───────────────────────────────────────────────

/// `SyncClient`, the primary entry point.
pub mod client;

// ── Prelude ──────────────────────────────────────────────────────────────────

pub mod prelude {
    // Shared
    pub use crate::shared::{BoundedBuffer, Coin, Side};

    // Domain types
    pub use crate::domain::asset_ctx::{AssetCtx, AssetCtxFeed, AssetCtxParams, AssetCtxView};
    pub use crate::domain::explorer::{Block, ExplorerFeed, ExplorerView, Transaction};
    pub use crate::domain::orderbook::{BookFeed, BookParams, BookTop, BookView, L2Book, Level};
    pub use crate::domain::trade::{Trade, TradeFeed, TradeView};

    // Errors
    pub use crate::error::{AuthError, HttpError, SyncError, WsError};

    // Network + config
    pub use crate::config::{FeedConfig, SyncConfig};
    pub use crate::network::{
        DEFAULT_API_URL, DEFAULT_EXPLORER_WS_URL, DEFAULT_INFO_URL, DEFAULT_WS_URL,
    };

    // Auth
    pub use crate::auth::{AuthScheme, StaticTokenProvider, TokenProvider, TokenRefreshCoordinator};

    // Cache + HTTP
    pub use crate::cache::{CacheConfig, RequestDescriptor, ResponseCache};
    pub use crate::http::{
        HttpGateway, RequestConfig, RequestOptions, RetryConfig, RetryPolicy, Transport,
    };

    // Fetch
    pub use crate::fetch::{FetchError, FetchOptions, FetchOrchestrator, FetchState, Phase};

    // WebSocket
    pub use crate::ws::{
        ChannelEvent, ChannelRegistry, ChannelStatus, ConnectionState, Connector, Feed,
        StreamChannel, Subscription, WsConfig,
    };

    // Client + sub-clients
    pub use crate::client::{
        ExplorerClient, MarketsClient, OrderbooksClient, SyncClient, SyncClientBuilder,
        TradesClient,
    };
}
