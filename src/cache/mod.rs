//! Short-TTL response cache shared by every GET issued through the gateway.
//!
//! Entries are value copies: `get` clones out of the map, so callers never
//! hold a reference into the cache. Growth is bounded by a lazy cleanup
//! that runs from `set` at most once per `cleanup_interval`, and only once
//! the map has reached `cleanup_threshold` entries.

pub mod key;

pub use key::RequestDescriptor;

use async_lock::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Cache sizing and expiry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum age before an entry is considered invalid.
    pub ttl_ms: u64,
    /// Size the cache is trimmed back to during cleanup.
    pub max_size: usize,
    /// Minimum time between two cleanup passes.
    pub cleanup_interval_ms: u64,
    /// Cleanup is skipped while the cache holds fewer entries than this.
    pub cleanup_threshold: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 30_000,
            max_size: 500,
            cleanup_interval_ms: 60_000,
            cleanup_threshold: 100,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    payload: V,
    inserted_at: Instant,
}

#[derive(Debug)]
struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    last_cleanup: Instant,
}

/// Bounded TTL key/value store. Defaults to raw JSON payloads so responses
/// of different types can share one cache.
#[derive(Debug)]
pub struct ResponseCache<V = serde_json::Value> {
    config: CacheConfig,
    state: Mutex<CacheState<V>>,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                last_cleanup: Instant::now(),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Return a copy of the value stored under `key` if it is younger than
    /// the TTL. An expired entry is purged by this call.
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut state = self.state.lock().await;
        let expired = match state.entries.get(key) {
            None => return None,
            Some(entry) => entry.inserted_at.elapsed() >= self.config.ttl(),
        };
        if expired {
            state.entries.remove(key);
            tracing::debug!(key, "cache entry expired");
            return None;
        }
        state.entries.get(key).map(|entry| entry.payload.clone())
    }

    /// Insert (or overwrite) `key`. Concurrent writers to the same key are
    /// last-write-wins.
    pub async fn set(&self, key: impl Into<String>, value: V) {
        let mut state = self.state.lock().await;
        state.entries.insert(
            key.into(),
            CacheEntry {
                payload: value,
                inserted_at: Instant::now(),
            },
        );

        if state.last_cleanup.elapsed() >= self.config.cleanup_interval()
            && state.entries.len() >= self.config.cleanup_threshold
        {
            self.cleanup(&mut state);
        }
    }

    /// Remove one key, or everything when `key` is `None`.
    pub async fn clear(&self, key: Option<&str>) {
        let mut state = self.state.lock().await;
        match key {
            Some(k) => {
                state.entries.remove(k);
            }
            None => state.entries.clear(),
        }
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn cleanup(&self, state: &mut CacheState<V>) {
        let ttl = self.config.ttl();
        let before = state.entries.len();
        state
            .entries
            .retain(|_, entry| entry.inserted_at.elapsed() < ttl);
        let expired = before - state.entries.len();

        let len = state.entries.len();
        let mut evicted = 0;
        if len > self.config.max_size {
            // Oldest half, or more if half is not enough to get under max_size.
            evicted = (len / 2).max(len - self.config.max_size);
            let mut by_age: Vec<(String, Instant)> = state
                .entries
                .iter()
                .map(|(k, e)| (k.clone(), e.inserted_at))
                .collect();
            by_age.sort_by_key(|(_, inserted_at)| *inserted_at);
            for (k, _) in by_age.into_iter().take(evicted) {
                state.entries.remove(&k);
            }
        }

        state.last_cleanup = Instant::now();
        tracing::debug!(expired, evicted, remaining = state.entries.len(), "cache cleanup");
    }
}

impl<V: Clone> Default for ResponseCache<V> {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
