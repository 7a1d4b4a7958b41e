//! HTTP client with rate-limit retry
//!
//! Executes one logical request:
//! - Bearer authentication and custom headers on every send
//! - Automatic resend on 429 with jittered exponential backoff
//! - One deadline shared by every send and backoff sleep
//! - Error classification of the final failed response

use super::backoff::RetryPolicy;
use super::classify::classify;
use super::rate_limit::{RateLimiter, RateLimiterConfig};
use super::request::{AttemptState, RequestDescriptor};
use super::transport::{HttpTransport, Transport, TransportRequest, TransportResponse};
use crate::config::ApiKey;
use crate::error::{ApiError, Error, ErrorKind, Result};
use crate::types::JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default overall request timeout (5 minutes)
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Versioned base URL for all requests
    pub base_url: String,
    /// Bearer credential
    pub api_key: ApiKey,
    /// Headers merged into every request
    pub custom_headers: HashMap<String, String>,
    /// Rate-limit retry policy
    pub retry: RetryPolicy,
    /// Deadline for the whole attempt sequence of one request
    pub timeout: Duration,
    /// Optional client-side throttling
    pub rate_limit: Option<RateLimiterConfig>,
    /// User agent string
    pub user_agent: String,
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder(base_url: impl Into<String>, api_key: ApiKey) -> HttpClientConfigBuilder {
        HttpClientConfigBuilder {
            config: HttpClientConfig {
                base_url: base_url.into(),
                api_key,
                custom_headers: HashMap::new(),
                retry: RetryPolicy::default(),
                timeout: DEFAULT_REQUEST_TIMEOUT,
                rate_limit: None,
                user_agent: format!("airtable-client/{}", env!("CARGO_PKG_VERSION")),
            },
        }
    }
}

/// Builder for HTTP client config
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the overall request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the retry policy
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Add a custom header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.custom_headers.insert(key.into(), value.into());
        self
    }

    /// Replace all custom headers
    pub fn headers(mut self, headers: HashMap<String, String>) -> Self {
        self.config.custom_headers = headers;
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// HTTP client with retry and optional rate limiting
pub struct HttpClient {
    transport: Arc<dyn Transport>,
    config: HttpClientConfig,
    rate_limiter: Option<RateLimiter>,
}

impl HttpClient {
    /// Create a client sending through `reqwest`
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config.user_agent)
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client over a custom transport
    pub fn with_transport(config: HttpClientConfig, transport: Arc<dyn Transport>) -> Self {
        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);
        Self {
            transport,
            config,
            rate_limiter,
        }
    }

    /// Client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Transport shared with clients derived from this one
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    /// Check if rate limiting is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// Execute a request and return its parsed JSON body
    pub async fn execute(&self, descriptor: &RequestDescriptor) -> Result<JsonValue> {
        let mut state = AttemptState::new();
        self.execute_with_state(descriptor, &mut state).await
    }

    /// Execute a request, recording every physical send in `state`
    pub async fn execute_with_state(
        &self,
        descriptor: &RequestDescriptor,
        state: &mut AttemptState,
    ) -> Result<JsonValue> {
        let timeout = self.config.timeout;
        let outcome = tokio::time::timeout(timeout, self.send_with_retry(descriptor, state)).await;
        match outcome {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "{} {} timed out after {:?} ({} attempts)",
                    descriptor.method,
                    descriptor.path,
                    timeout,
                    state.sends()
                );
                Err(ApiError::connection(format!(
                    "Request timed out after {}ms",
                    timeout.as_millis()
                ))
                .into())
            }
        }
    }

    async fn send_with_retry(
        &self,
        descriptor: &RequestDescriptor,
        state: &mut AttemptState,
    ) -> Result<JsonValue> {
        let request = self.build_request(descriptor);

        loop {
            if let Some(ref limiter) = self.rate_limiter {
                limiter.wait().await;
            }

            let attempt = state.begin_send();
            let response = match self.transport.send(request.clone()).await {
                Ok(response) => response,
                Err(e) => return Err(ApiError::connection(e.message).into()),
            };

            if response.is_success() {
                debug!(
                    "Request succeeded: {} {} (attempt {})",
                    request.method, request.url, attempt
                );
                return parse_success_body(&response);
            }

            if response.status == STATUS_TOO_MANY_REQUESTS {
                if let Some(backoff) = self.config.retry.backoff_for(attempt) {
                    let delay = backoff.delay(attempt);
                    warn!(
                        "Rate limited (429) on {} {}, attempt {}, retrying in {:?}",
                        request.method, request.url, attempt, delay
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
            }

            return Err(classify(response.status, response.json().as_ref()).into());
        }
    }

    fn build_request(&self, descriptor: &RequestDescriptor) -> TransportRequest {
        let mut headers = Vec::new();
        merge_header(
            &mut headers,
            "Authorization",
            format!("Bearer {}", self.config.api_key.expose()),
        );
        for (key, value) in &self.config.custom_headers {
            merge_header(&mut headers, key, value.clone());
        }
        for (key, value) in &descriptor.headers {
            merge_header(&mut headers, key, value.clone());
        }

        TransportRequest {
            method: descriptor.method,
            url: self.build_url(&descriptor.path),
            headers,
            query: descriptor.query_pairs(),
            body: descriptor.body.clone(),
        }
    }

    /// Build full URL from path
    fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{path}")
        }
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Insert a header, replacing any earlier value under the same name
fn merge_header(headers: &mut Vec<(String, String)>, key: &str, value: String) {
    headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(key));
    headers.push((key.to_string(), value));
}

fn parse_success_body(response: &TransportResponse) -> Result<JsonValue> {
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(JsonValue::Null);
    }
    serde_json::from_slice(&response.body).map_err(|e| {
        ApiError::from_response(
            ErrorKind::UnexpectedError,
            format!("The response from Airtable was invalid JSON: {e}"),
            response.status,
            None,
        )
        .into()
    })
}
