//! Single-flight token refresh.
//!
//! The first caller to [`TokenRefreshCoordinator::refresh`] becomes the
//! leader and calls the provider. Everyone arriving while that call is
//! pending is queued and receives the leader's outcome. The in-flight flag
//! is cleared by a drop guard, so a leader that errors, panics or is
//! cancelled never leaves later callers waiting forever.

use super::TokenProvider;
use crate::error::AuthError;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;

type Outcome = Result<String, AuthError>;

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    waiters: Vec<oneshot::Sender<Outcome>>,
}

pub struct TokenRefreshCoordinator {
    provider: Arc<dyn TokenProvider>,
    state: Mutex<RefreshState>,
    refresh_calls: AtomicU64,
}

impl TokenRefreshCoordinator {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            provider,
            state: Mutex::new(RefreshState::default()),
            refresh_calls: AtomicU64::new(0),
        }
    }

    pub fn provider(&self) -> &Arc<dyn TokenProvider> {
        &self.provider
    }

    /// Refresh the token, sharing one provider call among all concurrent
    /// callers.
    pub async fn refresh(&self) -> Outcome {
        let waiter = {
            let mut state = self.lock();
            if state.in_flight {
                let (tx, rx) = oneshot::channel();
                state.waiters.push(tx);
                Some(rx)
            } else {
                state.in_flight = true;
                None
            }
        };

        if let Some(rx) = waiter {
            tracing::debug!("token refresh already in flight, waiting");
            return rx.await.unwrap_or(Err(AuthError::RefreshAbandoned));
        }

        let guard = InFlight {
            coordinator: self,
            settled: false,
        };
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("refreshing auth token");

        let outcome = self.provider.refresh().await;
        if let Err(e) = &outcome {
            tracing::warn!("token refresh failed: {}", e);
        }
        guard.settle(outcome.clone());
        outcome
    }

    /// Whether a provider call is currently pending.
    pub fn is_refreshing(&self) -> bool {
        self.lock().in_flight
    }

    /// Number of provider refresh calls issued so far.
    pub fn refresh_count(&self) -> u64 {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    fn queued_waiters(&self) -> usize {
        self.lock().waiters.len()
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        // The lock is never held across an await or a user callback.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn drain(&self, outcome: Outcome) {
        let waiters = {
            let mut state = self.lock();
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };
        if !waiters.is_empty() {
            tracing::debug!(waiters = waiters.len(), "releasing queued refresh waiters");
        }
        for tx in waiters {
            let _ = tx.send(outcome.clone());
        }
    }
}

struct InFlight<'a> {
    coordinator: &'a TokenRefreshCoordinator,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(mut self, outcome: Outcome) {
        self.settled = true;
        self.coordinator.drain(outcome);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.coordinator.drain(Err(AuthError::RefreshAbandoned));
        }
    }
}
