//! Unified error types.
//!
//! Every error here is `Clone`: a single refresh outcome is fanned out to all
//! queued waiters, and fetch errors live inside watchable state.

use thiserror::Error;

/// Backend code returned with HTTP 400 when a watched-wallet limit is hit.
pub const WALLET_LIMIT_EXCEEDED: &str = "WALLET_LIMIT_EXCEEDED";

/// Top-level error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("WebSocket error: {0}")]
    Ws(#[from] WsError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Serialization error: {0}")]
    Serde(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Serde(e.to_string())
    }
}

/// HTTP-layer errors, classified by how the gateway reacts to them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HttpError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {message}{}", .code.as_deref().map(|c| format!(" ({c})")).unwrap_or_default())]
    Validation {
        message: String,
        code: Option<String>,
    },

    #[error("Server error {status}: {body}")]
    Server { status: u16, body: String },

    #[error("Rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Timeout")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Response decode failed: {0}")]
    Decode(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl HttpError {
    /// Network failures, timeouts, 5xx and rate limits. Everything else is
    /// terminal for the retry loop.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            HttpError::Network(_)
                | HttpError::Timeout
                | HttpError::Server { .. }
                | HttpError::RateLimited { .. }
        )
    }

    /// Backend sub-code carried by a validation failure.
    pub fn code(&self) -> Option<&str> {
        match self {
            HttpError::Validation { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn is_wallet_limit(&self) -> bool {
        self.code() == Some(WALLET_LIMIT_EXCEEDED)
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            HttpError::Timeout
        } else if e.is_decode() {
            HttpError::Decode(e.to_string())
        } else if e.is_connect() || e.is_request() || e.is_body() {
            HttpError::Network(e.to_string())
        } else {
            HttpError::Unknown(e.to_string())
        }
    }
}

/// WebSocket errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WsError {
    #[error("Not connected")]
    NotConnected,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Connection closed: code={code:?} reason={reason}")]
    Closed { code: Option<u16>, reason: String },

    #[error("Gave up after {attempts} reconnect attempts")]
    ReconnectExhausted { attempts: u32 },
}

/// Authentication errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Token refresh was abandoned before it settled")]
    RefreshAbandoned,

    #[error("Session expired")]
    SessionExpired,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(HttpError::Timeout.is_transient());
        assert!(HttpError::Network("reset".into()).is_transient());
        assert!(HttpError::Server { status: 503, body: String::new() }.is_transient());
        assert!(HttpError::RateLimited { retry_after_ms: None }.is_transient());

        assert!(!HttpError::Unauthorized.is_transient());
        assert!(!HttpError::Forbidden(String::new()).is_transient());
        assert!(!HttpError::NotFound(String::new()).is_transient());
        assert!(!HttpError::Unknown(String::new()).is_transient());
    }

    #[test]
    fn test_wallet_limit_code() {
        let err = HttpError::Validation {
            message: "Too many wallets".into(),
            code: Some(WALLET_LIMIT_EXCEEDED.into()),
        };
        assert!(err.is_wallet_limit());
        assert_eq!(err.to_string(), "Validation failed: Too many wallets (WALLET_LIMIT_EXCEEDED)");

        let plain = HttpError::Validation { message: "bad".into(), code: None };
        assert!(!plain.is_wallet_limit());
        assert_eq!(plain.to_string(), "Validation failed: bad");
    }
}
