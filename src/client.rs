//! High-level client: `SyncClient` with nested sub-client accessors.
//!
//! Each domain has its own sub-client in `domain/<name>/client.rs`. This
//! module owns the builder and the shared pieces every sub-client reaches
//! through: the response cache, the token refresh coordinator, the HTTP
//! gateway and the channel registry. Nothing here is process-global; two
//! clients never share a cache or a socket.

use crate::auth::{StaticTokenProvider, TokenProvider, TokenRefreshCoordinator};
use crate::cache::{CacheConfig, ResponseCache};
use crate::config::{FeedConfig, SyncConfig};
use crate::domain::asset_ctx::client::Markets;
use crate::domain::explorer::client::Explorer;
use crate::domain::orderbook::client::Orderbooks;
use crate::domain::trade::client::Trades;
use crate::error::SyncError;
use crate::fetch::{FetchOptions, FetchOrchestrator};
use crate::http::{HttpGateway, RetryConfig, Transport};
use crate::ws::{ChannelRegistry, Connector, WsConfig};

use std::future::Future;
use std::sync::Arc;

// Re-export sub-client types for convenience.
pub use crate::domain::asset_ctx::client::Markets as MarketsClient;
pub use crate::domain::explorer::client::Explorer as ExplorerClient;
pub use crate::domain::orderbook::client::Orderbooks as OrderbooksClient;
pub use crate::domain::trade::client::Trades as TradesClient;

/// The primary entry point.
///
/// Cloning is cheap and the clones share cache, auth state and sockets.
#[derive(Clone)]
pub struct SyncClient {
    config: Arc<SyncConfig>,
    http: HttpGateway,
    registry: Arc<ChannelRegistry>,
}

impl SyncClient {
    pub fn builder() -> SyncClientBuilder {
        SyncClientBuilder::default()
    }

    // ── Sub-client accessors ─────────────────────────────────────────────

    pub fn trades(&self) -> Trades<'_> {
        Trades { client: self }
    }

    pub fn orderbooks(&self) -> Orderbooks<'_> {
        Orderbooks { client: self }
    }

    pub fn explorer(&self) -> Explorer<'_> {
        Explorer { client: self }
    }

    pub fn markets(&self) -> Markets<'_> {
        Markets { client: self }
    }

    // ── Shared state ─────────────────────────────────────────────────────

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn http(&self) -> &HttpGateway {
        &self.http
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        self.http.cache()
    }

    pub fn refresher(&self) -> &Arc<TokenRefreshCoordinator> {
        self.http.refresher()
    }

    pub fn ws_url(&self) -> &str {
        &self.config.ws_url
    }

    pub fn explorer_ws_url(&self) -> &str {
        &self.config.explorer_ws_url
    }

    /// Start an orchestrator with the client's default [`FetchOptions`].
    pub fn fetch<D, T, F, Fut>(&self, fetch_fn: F, deps: D) -> FetchOrchestrator<D, T>
    where
        D: Clone + PartialEq + Send + Sync + 'static,
        T: Clone + Send + Sync + 'static,
        F: Fn(D) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, SyncError>> + Send + 'static,
    {
        self.fetch_with(fetch_fn, deps, self.config.fetch.clone())
    }

    pub fn fetch_with<D, T, F, Fut>(
        &self,
        fetch_fn: F,
        deps: D,
        options: FetchOptions,
    ) -> FetchOrchestrator<D, T>
    where
        D: Clone + PartialEq + Send + Sync + 'static,
        T: Clone + Send + Sync + 'static,
        F: Fn(D) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, SyncError>> + Send + 'static,
    {
        FetchOrchestrator::start(fetch_fn, deps, options)
    }

    /// Clear all HTTP caches.
    pub async fn clear_all_caches(&self) {
        self.cache().clear(None).await;
    }

    /// Close every open channel.
    pub async fn disconnect_all(&self) {
        self.registry.disconnect_all().await;
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// Builder
// ═════════════════════════════════════════════════════════════════════════════

#[derive(Default)]
pub struct SyncClientBuilder {
    config: SyncConfig,
    token_provider: Option<Arc<dyn TokenProvider>>,
    transport: Option<Arc<dyn Transport>>,
    connector: Option<Arc<dyn Connector>>,
}

impl SyncClientBuilder {
    pub fn base_url(mut self, url: &str) -> Self {
        self.config.api_url = url.to_string();
        self
    }

    pub fn info_url(mut self, url: &str) -> Self {
        self.config.info_url = url.to_string();
        self
    }

    pub fn ws_url(mut self, url: &str) -> Self {
        self.config.ws_url = url.to_string();
        self
    }

    pub fn explorer_ws_url(mut self, url: &str) -> Self {
        self.config.explorer_ws_url = url.to_string();
        self
    }

    /// Replace the whole configuration. URLs and sections set earlier are
    /// overwritten.
    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn cache_config(mut self, cache: CacheConfig) -> Self {
        self.config.cache = cache;
        self
    }

    pub fn retry_config(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn fetch_options(mut self, fetch: FetchOptions) -> Self {
        self.config.fetch = fetch;
        self
    }

    pub fn ws_config(mut self, ws: WsConfig) -> Self {
        self.config.ws = ws;
        self
    }

    pub fn feed_config(mut self, feeds: FeedConfig) -> Self {
        self.config.feeds = feeds;
        self
    }

    /// Identity provider used for `Authorization` headers and 401 refresh.
    pub fn token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = Some(provider);
        self
    }

    /// Fixed token that cannot be refreshed.
    pub fn token(self, token: &str) -> Self {
        self.token_provider(Arc::new(StaticTokenProvider::new(Some(token.to_string()))))
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn build(self) -> Result<SyncClient, SyncError> {
        let config = self.config;

        let transport = match self.transport {
            Some(t) => t,
            None => default_transport(&config)?,
        };
        let connector = match self.connector {
            Some(c) => c,
            None => default_connector()?,
        };
        let provider: Arc<dyn TokenProvider> = match self.token_provider {
            Some(p) => p,
            None => Arc::new(StaticTokenProvider::new(None)),
        };

        let cache = Arc::new(ResponseCache::new(config.cache.clone()));
        let refresher = Arc::new(TokenRefreshCoordinator::new(provider));
        let http = HttpGateway::new(
            &config.api_url,
            &config.info_url,
            transport,
            cache,
            refresher,
            config.retry.clone(),
        );
        let registry = Arc::new(ChannelRegistry::new(connector, config.ws.clone()));

        Ok(SyncClient {
            config: Arc::new(config),
            http,
            registry,
        })
    }
}

#[cfg(feature = "http")]
fn default_transport(config: &SyncConfig) -> Result<Arc<dyn Transport>, SyncError> {
    let transport = crate::http::ReqwestTransport::new(config.request_timeout())?;
    Ok(Arc::new(transport))
}

#[cfg(not(feature = "http"))]
fn default_transport(_: &SyncConfig) -> Result<Arc<dyn Transport>, SyncError> {
    Err(SyncError::Other(
        "no HTTP transport configured (enable the `http` feature or call `transport()`)".into(),
    ))
}

#[cfg(feature = "ws-native")]
fn default_connector() -> Result<Arc<dyn Connector>, SyncError> {
    Ok(Arc::new(crate::ws::TungsteniteConnector))
}

#[cfg(not(feature = "ws-native"))]
fn default_connector() -> Result<Arc<dyn Connector>, SyncError> {
    Err(SyncError::Other(
        "no WebSocket connector configured (enable the `ws-native` feature or call `connector()`)"
            .into(),
    ))
}
