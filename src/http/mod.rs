//! HTTP client module
//!
//! Turns a [`RequestDescriptor`] into network calls.
//!
//! # Features
//!
//! - **Rate-limit retry**: 429 responses are resent after a jittered exponential backoff
//! - **Error classification**: final failures become an [`ApiError`](crate::error::ApiError)
//! - **Overall timeout**: one deadline covers every send and sleep of a request
//! - **Pluggable transport**: `reqwest` by default, any [`Transport`] otherwise

mod backoff;
mod classify;
mod client;
mod rate_limit;
mod request;
mod transport;

pub use backoff::{
    compute_delay, Backoff, RetryPolicy, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_DELAY,
};
pub use classify::classify;
pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, DEFAULT_REQUEST_TIMEOUT};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use request::{AttemptState, RequestDescriptor};
pub use transport::{HttpTransport, Transport, TransportError, TransportRequest, TransportResponse};

#[cfg(test)]
mod tests;
