//! Authentication: token provider seam, header scheme, refresh coordination.
//!
//! The concrete identity provider lives outside this crate. It is reached
//! through [`TokenProvider`]: the gateway reads the current token before
//! every request and asks the [`TokenRefreshCoordinator`] for a new one on
//! a 401.

pub mod refresh;

pub use refresh::TokenRefreshCoordinator;

use crate::error::AuthError;
use async_lock::RwLock;
use futures_util::future::BoxFuture;

/// Source of access tokens.
pub trait TokenProvider: Send + Sync {
    /// The token to attach to the next request, if any.
    fn token(&self) -> BoxFuture<'_, Option<String>>;

    /// Obtain a fresh token. Implementations store it so later
    /// [`token`](Self::token) calls return it.
    fn refresh(&self) -> BoxFuture<'_, Result<String, AuthError>>;

    /// Called once a replayed request is still rejected with 401.
    fn on_session_expired(&self) {}
}

/// How the token is rendered into the `Authorization` header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Bearer <token>`.
    #[default]
    Bearer,
    /// `Authorization: <token>` (identity-token providers).
    Raw,
    /// No header.
    None,
}

impl AuthScheme {
    pub fn header_value(&self, token: &str) -> Option<String> {
        match self {
            AuthScheme::Bearer => Some(format!("Bearer {}", token)),
            AuthScheme::Raw => Some(token.to_string()),
            AuthScheme::None => None,
        }
    }
}

/// Provider for a fixed token (or none). Refresh always fails, so a 401 is
/// terminal.
#[derive(Debug, Default)]
pub struct StaticTokenProvider {
    token: RwLock<Option<String>>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }

    pub async fn set(&self, token: Option<String>) {
        *self.token.write().await = token;
    }
}

impl TokenProvider for StaticTokenProvider {
    fn token(&self) -> BoxFuture<'_, Option<String>> {
        Box::pin(async move { self.token.read().await.clone() })
    }

    fn refresh(&self) -> BoxFuture<'_, Result<String, AuthError>> {
        Box::pin(async { Err(AuthError::NotAuthenticated) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_value_per_scheme() {
        assert_eq!(AuthScheme::Bearer.header_value("abc").as_deref(), Some("Bearer abc"));
        assert_eq!(AuthScheme::Raw.header_value("abc").as_deref(), Some("abc"));
        assert_eq!(AuthScheme::None.header_value("abc"), None);
    }

    #[tokio::test]
    async fn test_static_provider() {
        let provider = StaticTokenProvider::new(Some("t1".into()));
        assert_eq!(provider.token().await.as_deref(), Some("t1"));
        provider.set(None).await;
        assert_eq!(provider.token().await, None);
        assert_eq!(provider.refresh().await, Err(AuthError::NotAuthenticated));
    }
}
