//! Fetch state and the phase transition table that drives it.

use crate::error::SyncError;

/// Where an orchestrator is in its fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No fetch and no retry pending.
    Idle,
    /// Foreground fetch in flight (no data yet, or deps just changed).
    FetchingInitial,
    /// Background fetch in flight while previous data stays visible.
    Polling,
    /// Waiting for the retry timer.
    Retrying { attempt: u32 },
    /// Torn down; nothing will be written again.
    Stopped,
}

/// Inputs to the phase machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// First start, deps change or manual refetch.
    Start,
    /// Polling interval fired.
    Tick { has_data: bool },
    Succeeded,
    Failed { retry_attempt: Option<u32> },
    /// Retry timer fired.
    RetryFired { has_data: bool },
    Teardown,
}

impl Phase {
    /// Next phase, or `None` when `transition` is not accepted here (e.g. a
    /// poll tick while a fetch or retry is already pending). Callers drop
    /// rejected transitions.
    pub fn next(self, transition: Transition) -> Option<Phase> {
        use Phase::*;
        use Transition as T;

        match (self, transition) {
            (Stopped, _) => None,
            (_, T::Teardown) => Some(Stopped),
            (_, T::Start) => Some(FetchingInitial),

            (Idle, T::Tick { has_data: true }) => Some(Polling),
            (Idle, T::Tick { has_data: false }) => Some(FetchingInitial),
            (_, T::Tick { .. }) => None,

            (FetchingInitial | Polling, T::Succeeded) => Some(Idle),
            (FetchingInitial | Polling, T::Failed { retry_attempt: Some(attempt) }) => {
                Some(Retrying { attempt })
            }
            (FetchingInitial | Polling, T::Failed { retry_attempt: None }) => Some(Idle),
            (_, T::Succeeded | T::Failed { .. }) => None,

            (Retrying { .. }, T::RetryFired { has_data: true }) => Some(Polling),
            (Retrying { .. }, T::RetryFired { has_data: false }) => Some(FetchingInitial),
            (_, T::RetryFired { .. }) => None,
        }
    }

    pub fn is_fetching(&self) -> bool {
        matches!(self, Phase::FetchingInitial | Phase::Polling)
    }
}

/// Error surfaced to the consumer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    /// A retry is scheduled; `attempt` counts retries, starting at 1.
    #[error("retrying ({attempt}/{max}): {cause}")]
    Retrying {
        attempt: u32,
        max: u32,
        cause: SyncError,
    },
    /// Retries exhausted (or none configured).
    #[error("{0}")]
    Failed(SyncError),
}

impl FetchError {
    pub fn cause(&self) -> &SyncError {
        match self {
            FetchError::Retrying { cause, .. } => cause,
            FetchError::Failed(cause) => cause,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FetchError::Failed(_))
    }
}

/// Observable state of one logical data source.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    /// Last good value. Kept through background polls and failures.
    pub data: Option<T>,
    pub is_loading: bool,
    pub is_initial_loading: bool,
    pub is_refreshing: bool,
    pub error: Option<FetchError>,
    pub retry_count: u32,
    pub phase: Phase,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            is_initial_loading: false,
            is_refreshing: false,
            error: None,
            retry_count: 0,
            phase: Phase::Idle,
        }
    }
}

impl<T> FetchState<T> {
    pub(crate) fn clear_flags(&mut self) {
        self.is_loading = false;
        self.is_initial_loading = false;
        self.is_refreshing = false;
    }

    /// Set the loading flags for a fetch entering `phase`.
    pub(crate) fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        match phase {
            Phase::FetchingInitial => {
                self.is_loading = true;
                self.is_initial_loading = self.data.is_none();
                self.is_refreshing = false;
            }
            Phase::Polling => {
                self.is_loading = false;
                self.is_initial_loading = false;
                self.is_refreshing = true;
            }
            Phase::Idle => self.clear_flags(),
            Phase::Retrying { .. } | Phase::Stopped => {}
        }
    }
}
