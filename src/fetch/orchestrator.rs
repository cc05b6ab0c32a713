//! `FetchOrchestrator`: polling, retry and teardown for one data source.
//!
//! Every spawned callback (fetch completion, retry timer, poll tick)
//! carries the generation it was started under and re-checks it, together
//! with the `active` flag, before touching state. Completions additionally
//! carry a request sequence number and are applied only if they belong to
//! the newest request issued, so a slow stale response can never overwrite
//! fresher state.

use super::state::{FetchError, FetchState, Transition};
use crate::error::SyncError;

use futures_util::future::BoxFuture;
use futures_util::Stream;
use serde::Deserialize;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Async producer of `T` for the given deps.
pub type FetchFn<D, T> = Arc<dyn Fn(D) -> BoxFuture<'static, Result<T, SyncError>> + Send + Sync>;

/// Polling and retry knobs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FetchOptions {
    /// `None` (or zero) disables polling: one fetch per cycle.
    #[serde(rename = "refresh_interval_ms", with = "opt_ms")]
    pub refresh_interval: Option<Duration>,
    pub max_retries: u32,
    #[serde(rename = "base_retry_delay_ms", with = "ms")]
    pub base_retry_delay: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            refresh_interval: None,
            max_retries: 3,
            base_retry_delay: Duration::from_millis(1000),
        }
    }
}

impl FetchOptions {
    /// Poll every `ms` milliseconds; `ms <= 0` means one-shot.
    pub fn polling_ms(ms: i64) -> Self {
        Self {
            refresh_interval: (ms > 0).then(|| Duration::from_millis(ms as u64)),
            ..Self::default()
        }
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn base_retry_delay(mut self, delay: Duration) -> Self {
        self.base_retry_delay = delay;
        self
    }

    /// `base * 2^retry_count`.
    pub fn retry_delay(&self, retry_count: u32) -> Duration {
        self.base_retry_delay
            .saturating_mul(2u32.saturating_pow(retry_count))
    }

    fn interval(&self) -> Option<Duration> {
        self.refresh_interval.filter(|d| !d.is_zero())
    }
}

struct Control<D> {
    deps: D,
    active: bool,
    generation: u64,
    /// Sequence number of the newest request issued.
    seq: u64,
    interval_task: Option<JoinHandle<()>>,
    retry_task: Option<JoinHandle<()>>,
}

impl<D> Control<D> {
    fn cancel_timers(&mut self) {
        if let Some(h) = self.interval_task.take() {
            h.abort();
        }
        if let Some(h) = self.retry_task.take() {
            h.abort();
        }
    }
}

struct Inner<D, T> {
    fetch_fn: FetchFn<D, T>,
    options: FetchOptions,
    state: watch::Sender<FetchState<T>>,
    control: Mutex<Control<D>>,
}

/// Controller for one logical data source. Dropping it tears it down.
pub struct FetchOrchestrator<D, T>
where
    D: Clone + PartialEq + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<Inner<D, T>>,
}

impl<D, T> FetchOrchestrator<D, T>
where
    D: Clone + PartialEq + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    /// Start fetching immediately. Must be called inside a tokio runtime.
    pub fn start<F, Fut>(fetch_fn: F, deps: D, options: FetchOptions) -> Self
    where
        F: Fn(D) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, SyncError>> + Send + 'static,
    {
        let fetch_fn: FetchFn<D, T> = Arc::new(move |deps| Box::pin(fetch_fn(deps)));
        let (state, _) = watch::channel(FetchState::default());
        let inner = Arc::new(Inner {
            fetch_fn,
            options,
            state,
            control: Mutex::new(Control {
                deps,
                active: true,
                generation: 0,
                seq: 0,
                interval_task: None,
                retry_task: None,
            }),
        });
        inner.begin_cycle(CycleKind::Foreground);
        Self { inner }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> FetchState<T> {
        self.inner.state.borrow().clone()
    }

    pub fn data(&self) -> Option<T> {
        self.inner.state.borrow().data.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.inner.state.subscribe()
    }

    /// Stream of state snapshots, starting with the current one.
    pub fn updates(&self) -> impl Stream<Item = FetchState<T>> + Send + 'static {
        let mut rx = self.inner.state.subscribe();
        async_stream::stream! {
            loop {
                let snapshot = rx.borrow_and_update().clone();
                yield snapshot;
                if rx.changed().await.is_err() {
                    break;
                }
            }
        }
    }

    /// Fetch now, outside the polling schedule. Keeps current data.
    pub fn refetch(&self) {
        self.inner.begin_cycle(CycleKind::Refetch);
    }

    /// Replace the deps. A different value cancels all timers and starts a
    /// fresh foreground cycle; an equal value is a no-op.
    pub fn set_deps(&self, deps: D) {
        {
            let mut control = self.inner.lock();
            if !control.active || control.deps == deps {
                return;
            }
            control.deps = deps;
        }
        self.inner.begin_cycle(CycleKind::DepsChanged);
    }

    /// Stop for good. Pending fetches still run to completion but their
    /// results are discarded.
    pub fn teardown(&self) {
        self.inner.teardown();
    }

    pub fn is_active(&self) -> bool {
        self.inner.lock().active
    }
}

impl<D, T> Drop for FetchOrchestrator<D, T>
where
    D: Clone + PartialEq + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.inner.teardown();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleKind {
    Foreground,
    DepsChanged,
    Refetch,
}

impl<D, T> Inner<D, T>
where
    D: Clone + PartialEq + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn lock(&self) -> MutexGuard<'_, Control<D>> {
        // Never held across an await.
        self.control.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin_cycle(self: &Arc<Self>, kind: CycleKind) {
        let mut control = self.lock();
        if !control.active {
            return;
        }
        control.cancel_timers();
        control.generation += 1;
        let generation = control.generation;

        self.state.send_modify(|s| {
            if kind == CycleKind::DepsChanged {
                s.data = None;
            }
            s.error = None;
            s.retry_count = 0;
            if let Some(phase) = s.phase.next(Transition::Start) {
                s.enter(phase);
            }
        });
        tracing::debug!(generation, ?kind, "fetch cycle started");

        self.issue_fetch(&mut control, generation);

        if let Some(period) = self.options.interval() {
            let inner = Arc::clone(self);
            control.interval_task = Some(tokio::spawn(async move {
                let mut interval = tokio::time::interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    interval.tick().await;
                    if !inner.poll_tick(generation) {
                        break;
                    }
                }
            }));
        }
    }

    fn issue_fetch(self: &Arc<Self>, control: &mut Control<D>, generation: u64) {
        control.seq += 1;
        let seq = control.seq;
        let deps = control.deps.clone();
        let fut = (self.fetch_fn)(deps);
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let result = fut.await;
            inner.complete(generation, seq, result);
        });
    }

    /// Returns `false` once the generation is stale, ending the poll loop.
    fn poll_tick(self: &Arc<Self>, generation: u64) -> bool {
        let mut control = self.lock();
        if !control.active || control.generation != generation {
            return false;
        }

        let mut accepted = false;
        self.state.send_if_modified(|s| {
            let tick = Transition::Tick {
                has_data: s.data.is_some(),
            };
            match s.phase.next(tick) {
                Some(phase) => {
                    s.enter(phase);
                    accepted = true;
                    true
                }
                None => false,
            }
        });

        if accepted {
            self.issue_fetch(&mut control, generation);
        } else {
            tracing::trace!(generation, "poll tick skipped: fetch or retry pending");
        }
        true
    }

    fn fire_retry(self: &Arc<Self>, generation: u64) {
        let mut control = self.lock();
        if !control.active || control.generation != generation {
            return;
        }
        control.retry_task = None;

        let mut accepted = false;
        self.state.send_if_modified(|s| {
            let fired = Transition::RetryFired {
                has_data: s.data.is_some(),
            };
            match s.phase.next(fired) {
                Some(phase) => {
                    s.enter(phase);
                    accepted = true;
                    true
                }
                None => false,
            }
        });

        if accepted {
            self.issue_fetch(&mut control, generation);
        }
    }

    fn complete(self: &Arc<Self>, generation: u64, seq: u64, result: Result<T, SyncError>) {
        let mut control = self.lock();
        if !control.active || control.generation != generation || control.seq != seq {
            tracing::debug!(generation, seq, "discarding stale fetch result");
            return;
        }

        let max = self.options.max_retries;
        let mut retry_delay = None;

        self.state.send_modify(|s| match result {
            Ok(data) => {
                s.data = Some(data);
                s.error = None;
                s.retry_count = 0;
                if let Some(phase) = s.phase.next(Transition::Succeeded) {
                    s.enter(phase);
                }
            }
            Err(cause) if s.retry_count < max => {
                let delay = self.options.retry_delay(s.retry_count);
                s.retry_count += 1;
                let attempt = s.retry_count;
                tracing::debug!(
                    attempt,
                    max,
                    delay_ms = delay.as_millis() as u64,
                    error = %cause,
                    "fetch failed, retrying"
                );
                s.error = Some(FetchError::Retrying { attempt, max, cause });
                if let Some(phase) = s.phase.next(Transition::Failed {
                    retry_attempt: Some(attempt),
                }) {
                    s.enter(phase);
                }
                retry_delay = Some(delay);
            }
            Err(cause) => {
                tracing::warn!(error = %cause, "fetch failed, retries exhausted");
                s.error = Some(FetchError::Failed(cause));
                s.retry_count = 0;
                if let Some(phase) = s.phase.next(Transition::Failed { retry_attempt: None }) {
                    s.enter(phase);
                }
                s.clear_flags();
            }
        });

        if let Some(delay) = retry_delay {
            if let Some(h) = control.retry_task.take() {
                h.abort();
            }
            let inner = Arc::clone(self);
            control.retry_task = Some(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                inner.fire_retry(generation);
            }));
        }
    }

    fn teardown(&self) {
        let mut control = self.lock();
        if !control.active {
            return;
        }
        control.active = false;
        control.cancel_timers();
        self.state.send_modify(|s| {
            if let Some(phase) = s.phase.next(Transition::Teardown) {
                s.phase = phase;
            }
        });
        tracing::debug!(generation = control.generation, "fetch orchestrator torn down");
    }
}

mod ms {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

mod opt_ms {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let ms = Option::<i64>::deserialize(d)?;
        Ok(ms.filter(|ms| *ms > 0).map(|ms| Duration::from_millis(ms as u64)))
    }
}
