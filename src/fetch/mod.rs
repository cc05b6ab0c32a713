//! Polling / retry orchestration for request-response data sources.

pub mod orchestrator;
pub mod state;

pub use orchestrator::{FetchFn, FetchOptions, FetchOrchestrator};
pub use state::{FetchError, FetchState, Phase, Transition};
