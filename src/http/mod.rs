//! HTTP layer: `HttpGateway` with caching, auth replay and retry policies.

pub mod client;
pub mod retry;
pub mod transport;

pub use client::{HttpGateway, RequestConfig, RequestOptions};
pub use retry::{RetryConfig, RetryPolicy};
#[cfg(feature = "http")]
pub use transport::ReqwestTransport;
pub use transport::{Body, Method, PreparedRequest, RawResponse, Transport};
