//! Transport seam between the gateway and the HTTP stack.
//!
//! The gateway builds a [`PreparedRequest`] (URL resolved, headers final)
//! and hands it to a [`Transport`]. The default implementation is backed by
//! `reqwest`; tests swap in scripted transports.

use crate::error::HttpError;
use futures_util::future::BoxFuture;
use serde_json::Value;

/// HTTP verbs the gateway issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Serialized as JSON; the gateway sets `Content-Type: application/json`.
    Json(Value),
    /// Binary or multipart payload. The gateway does not override the
    /// content type; `content_type` (e.g. a multipart boundary) is passed
    /// through when given.
    Bytes {
        data: Vec<u8>,
        content_type: Option<String>,
    },
}

impl Body {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Body::Json(v) => Some(v),
            Body::Bytes { .. } => None,
        }
    }
}

/// Fully-resolved request handed to a [`Transport`].
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Body>,
}

impl PreparedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status + body as received. Non-2xx statuses are not errors at this layer.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
    pub retry_after_ms: Option<u64>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            retry_after_ms: None,
        }
    }

    pub fn ok_json(value: &Value) -> Self {
        Self::new(200, value.to_string())
    }
}

/// Parses a `Retry-After` header given in whole seconds. HTTP-date values
/// are ignored.
#[cfg_attr(not(feature = "http"), allow(dead_code))]
pub(crate) fn retry_after_ms(value: &str) -> Option<u64> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| secs.saturating_mul(1000))
}

/// Sends prepared requests. Only transport-level failures (connect, timeout)
/// are returned as `Err`.
pub trait Transport: Send + Sync {
    fn send(&self, request: PreparedRequest) -> BoxFuture<'_, Result<RawResponse, HttpError>>;
}

// ─── reqwest ─────────────────────────────────────────────────────────────────

#[cfg(feature = "http")]
pub use reqwest_transport::ReqwestTransport;

#[cfg(feature = "http")]
mod reqwest_transport {
    use super::*;
    use reqwest::Client;
    use std::time::Duration;

    /// [`Transport`] backed by a pooled `reqwest::Client`.
    #[derive(Debug, Clone)]
    pub struct ReqwestTransport {
        client: Client,
    }

    impl ReqwestTransport {
        pub fn new(timeout: Duration) -> Result<Self, HttpError> {
            let client = Client::builder()
                .timeout(timeout)
                .pool_max_idle_per_host(10)
                .build()
                .map_err(|e| HttpError::Unknown(format!("failed to build HTTP client: {e}")))?;
            Ok(Self { client })
        }

        pub fn with_client(client: Client) -> Self {
            Self { client }
        }
    }

    impl Transport for ReqwestTransport {
        fn send(&self, request: PreparedRequest) -> BoxFuture<'_, Result<RawResponse, HttpError>> {
            Box::pin(async move {
                let method = match request.method {
                    Method::Get => reqwest::Method::GET,
                    Method::Post => reqwest::Method::POST,
                    Method::Put => reqwest::Method::PUT,
                    Method::Delete => reqwest::Method::DELETE,
                };
                let mut req = self.client.request(method, &request.url);
                if !request.query.is_empty() {
                    req = req.query(&request.query);
                }
                for (name, value) in &request.headers {
                    req = req.header(name.as_str(), value.as_str());
                }
                match request.body {
                    Some(Body::Json(v)) => req = req.body(v.to_string()),
                    Some(Body::Bytes { data, .. }) => req = req.body(data),
                    None => {}
                }

                let resp = req.send().await?;
                let status = resp.status().as_u16();
                let retry_after_ms = resp
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(retry_after_ms);
                let body = resp.text().await?;

                Ok(RawResponse {
                    status,
                    body,
                    retry_after_ms,
                })
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = PreparedRequest {
            method: Method::Get,
            url: "http://x".into(),
            query: vec![],
            headers: vec![("Authorization".into(), "Bearer t".into())],
            body: None,
        };
        assert_eq!(req.header("authorization"), Some("Bearer t"));
        assert_eq!(req.header("content-type"), None);
    }

    #[test]
    fn test_body_as_json() {
        assert!(Body::Json(serde_json::json!({})).as_json().is_some());
        let bytes = Body::Bytes {
            data: vec![1, 2],
            content_type: None,
        };
        assert!(bytes.as_json().is_none());
    }

    #[test]
    fn test_retry_after_seconds_saturate() {
        assert_eq!(retry_after_ms(" 2 "), Some(2000));
        assert_eq!(retry_after_ms(&u64::MAX.to_string()), Some(u64::MAX));
        assert_eq!(retry_after_ms("Wed, 21 Oct 2026 07:28:00 GMT"), None);
    }
}
