//! `HttpGateway`: every outbound REST call goes through here.
//!
//! Per request: cache read for GETs, auth header injection, one
//! refresh-and-replay cycle on 401, bounded exponential-backoff retry of
//! transient failures, and response classification into [`HttpError`].

use crate::auth::{AuthScheme, TokenRefreshCoordinator};
use crate::cache::{RequestDescriptor, ResponseCache};
use crate::error::HttpError;
use crate::http::retry::{RetryConfig, RetryPolicy};
use crate::http::transport::{Body, Method, PreparedRequest, RawResponse, Transport};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// What to send.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestConfig {
    pub method: Method,
    /// Absolute URL, or a path joined onto the gateway's base URL.
    pub url: String,
    pub params: Vec<(String, String)>,
    pub body: Option<Body>,
    pub headers: Vec<(String, String)>,
    pub auth: AuthScheme,
}

impl RequestConfig {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: Vec::new(),
            body: None,
            headers: Vec::new(),
            auth: AuthScheme::Bearer,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::Put, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((name.into(), value.to_string()));
        self
    }

    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self, HttpError> {
        let value = serde_json::to_value(body).map_err(|e| HttpError::Unknown(e.to_string()))?;
        self.body = Some(Body::Json(value));
        Ok(self)
    }

    pub fn bytes(mut self, data: Vec<u8>, content_type: Option<String>) -> Self {
        self.body = Some(Body::Bytes { data, content_type });
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn auth(mut self, scheme: AuthScheme) -> Self {
        self.auth = scheme;
        self
    }
}

/// How to send it.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Serve GETs from the response cache and store fresh responses in it.
    pub use_cache: bool,
    /// Retry transient failures (`RetryPolicy::None` disables).
    pub retry: RetryPolicy,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            retry: RetryPolicy::Default,
        }
    }
}

impl RequestOptions {
    pub fn uncached() -> Self {
        Self {
            use_cache: false,
            ..Self::default()
        }
    }

    pub fn no_retry(mut self) -> Self {
        self.retry = RetryPolicy::None;
        self
    }
}

/// `{success:false, message, code}` error convention.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    code: Option<Value>,
}

/// Outbound HTTP gateway shared by all fetches of one client.
#[derive(Clone)]
pub struct HttpGateway {
    base_url: String,
    info_url: String,
    transport: Arc<dyn Transport>,
    cache: Arc<ResponseCache>,
    refresher: Arc<TokenRefreshCoordinator>,
    retry: RetryConfig,
}

impl HttpGateway {
    pub fn new(
        base_url: &str,
        info_url: &str,
        transport: Arc<dyn Transport>,
        cache: Arc<ResponseCache>,
        refresher: Arc<TokenRefreshCoordinator>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            info_url: info_url.to_string(),
            transport,
            cache,
            refresher,
            retry,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn refresher(&self) -> &Arc<TokenRefreshCoordinator> {
        &self.refresher
    }

    // ── Convenience ──────────────────────────────────────────────────────

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, HttpError> {
        let mut config = RequestConfig::get(path);
        for (k, v) in params {
            config = config.param(*k, v);
        }
        self.request(config, RequestOptions::default()).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, HttpError> {
        let config = RequestConfig::post(path).json(body)?;
        self.request(config, RequestOptions::default()).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, HttpError> {
        let config = RequestConfig::put(path).json(body)?;
        self.request(config, RequestOptions::default()).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, HttpError> {
        self.request(RequestConfig::delete(path), RequestOptions::default()).await
    }

    /// POST a `{type: ...}` query to the market-data info endpoint. The
    /// endpoint is public, so no auth header is sent.
    pub async fn post_info<T: DeserializeOwned, B: Serialize>(
        &self,
        body: &B,
    ) -> Result<T, HttpError> {
        let config = RequestConfig::post(self.info_url.clone())
            .json(body)?
            .auth(AuthScheme::None);
        self.request(config, RequestOptions::default()).await
    }

    // ── Core ─────────────────────────────────────────────────────────────

    /// Send `config` and decode the JSON response into `T`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        config: RequestConfig,
        options: RequestOptions,
    ) -> Result<T, HttpError> {
        let value = self.request_value(config, options).await?;
        serde_json::from_value(value).map_err(|e| HttpError::Decode(e.to_string()))
    }

    /// Send `config` and return the raw JSON response.
    pub async fn request_value(
        &self,
        config: RequestConfig,
        options: RequestOptions,
    ) -> Result<Value, HttpError> {
        let url = self.resolve(&config.url);
        let cacheable = options.use_cache && config.method == Method::Get;
        let descriptor = RequestDescriptor::new(
            config.method.as_str(),
            &config.url,
            config.params.iter().cloned(),
            config.body.as_ref().and_then(Body::as_json),
        );

        if cacheable {
            if let Some(hit) = self.cache.get(descriptor.cache_key()).await {
                tracing::debug!(key = descriptor.cache_key(), "cache hit");
                return Ok(hit);
            }
        }

        let retry = match options.retry {
            RetryPolicy::None => RetryConfig::none(),
            RetryPolicy::Default => self.retry.clone(),
            RetryPolicy::Custom(c) => c,
        };

        let mut replayed = false;
        let mut attempt = 0;
        let value = loop {
            match self.send_authorized(&config, &url, &mut replayed).await {
                Ok(value) => break value,
                Err(e) if attempt < retry.max_retries && retry.should_retry(&e) => {
                    let mut delay = retry.delay_for_attempt(attempt);
                    if let HttpError::RateLimited {
                        retry_after_ms: Some(ms),
                    } = &e
                    {
                        delay = delay.max(Duration::from_millis(*ms));
                    }
                    attempt += 1;
                    tracing::debug!(
                        attempt,
                        max = retry.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying {} {}",
                        config.method,
                        url
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        };

        if cacheable {
            self.cache
                .set(descriptor.cache_key().to_string(), value.clone())
                .await;
        }
        Ok(value)
    }

    /// Dispatch once; on 401 run at most one refresh-and-replay cycle for
    /// the whole logical request (`replayed` persists across retries).
    async fn send_authorized(
        &self,
        config: &RequestConfig,
        url: &str,
        replayed: &mut bool,
    ) -> Result<Value, HttpError> {
        let provider = self.refresher.provider();
        let token = provider.token().await;

        match self.dispatch(config, url, token.as_deref()).await {
            Err(HttpError::Unauthorized) if config.auth != AuthScheme::None && !*replayed => {}
            Err(HttpError::Unauthorized) if *replayed => {
                return Err(self.session_expired(url));
            }
            other => return other,
        }
        *replayed = true;

        // Another request may have refreshed while this one was in flight.
        let current = provider.token().await;
        let fresh = if current.is_some() && current != token {
            current
        } else {
            match self.refresher.refresh().await {
                Ok(t) => Some(t),
                Err(e) => {
                    tracing::warn!("token refresh failed for {}: {}", url, e);
                    return Err(self.session_expired(url));
                }
            }
        };

        match self.dispatch(config, url, fresh.as_deref()).await {
            Err(HttpError::Unauthorized) => Err(self.session_expired(url)),
            other => other,
        }
    }

    fn session_expired(&self, url: &str) -> HttpError {
        tracing::warn!("session expired: replayed request to {} still unauthorized", url);
        self.refresher.provider().on_session_expired();
        HttpError::Unauthorized
    }

    async fn dispatch(
        &self,
        config: &RequestConfig,
        url: &str,
        token: Option<&str>,
    ) -> Result<Value, HttpError> {
        let mut headers = config.headers.clone();
        if let Some(value) = token.and_then(|t| config.auth.header_value(t)) {
            headers.push(("Authorization".to_string(), value));
        }
        match &config.body {
            Some(Body::Json(_)) => {
                headers.push(("Content-Type".to_string(), "application/json".to_string()));
            }
            Some(Body::Bytes {
                content_type: Some(ct),
                ..
            }) => headers.push(("Content-Type".to_string(), ct.clone())),
            _ => {}
        }

        let request = PreparedRequest {
            method: config.method,
            url: url.to_string(),
            query: config.params.clone(),
            headers,
            body: config.body.clone(),
        };

        let resp = self.transport.send(request).await?;
        classify(resp)
    }

    fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", self.base_url, url.trim_start_matches('/'))
        }
    }
}

fn classify(resp: RawResponse) -> Result<Value, HttpError> {
    if (200..300).contains(&resp.status) {
        if resp.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        return serde_json::from_str(&resp.body).map_err(|e| HttpError::Decode(e.to_string()));
    }

    let parsed = serde_json::from_str::<ErrorBody>(&resp.body).ok();
    let message = parsed
        .as_ref()
        .and_then(|b| b.message.clone().or_else(|| b.error.clone()))
        .unwrap_or_else(|| resp.body.clone());
    let code = parsed.and_then(|b| b.code).map(|c| match c {
        Value::String(s) => s,
        other => other.to_string(),
    });

    Err(match resp.status {
        401 => HttpError::Unauthorized,
        403 => HttpError::Forbidden(message),
        404 => HttpError::NotFound(message),
        408 => HttpError::Timeout,
        429 => HttpError::RateLimited {
            retry_after_ms: resp.retry_after_ms,
        },
        400..=499 => HttpError::Validation { message, code },
        500..=599 => HttpError::Server {
            status: resp.status,
            body: resp.body,
        },
        _ => HttpError::Unknown(format!("unexpected status {}: {}", resp.status, message)),
    })
}
