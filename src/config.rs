//! Client configuration
//!
//! [`ClientOptions`] holds what the caller supplied (explicitly or
//! deserialized from camelCase JSON); [`ClientConfig`] is the resolved,
//! immutable configuration a client is built from. Missing values fall back
//! to environment variables and then to defaults.

use crate::error::{Error, Result};
use crate::http::{
    Backoff, HttpClientConfig, RateLimiterConfig, RetryPolicy, DEFAULT_INITIAL_DELAY,
    DEFAULT_MAX_DELAY, DEFAULT_REQUEST_TIMEOUT,
};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

// ============================================================================
// Defaults
// ============================================================================

/// Production API host
pub const DEFAULT_ENDPOINT_URL: &str = "https://api.airtable.com";

/// Production content (attachment) host
pub const DEFAULT_CONTENT_ENDPOINT_URL: &str = "https://content.airtable.com";

/// API version used when none is configured
pub const DEFAULT_API_VERSION: &str = "0.1.0";

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "AIRTABLE_API_KEY";

/// Environment variable overriding the API host
pub const ENDPOINT_URL_ENV: &str = "AIRTABLE_ENDPOINT_URL";

/// Environment variable overriding the content host
pub const CONTENT_ENDPOINT_URL_ENV: &str = "AIRTABLE_CONTENT_ENDPOINT_URL";

// ============================================================================
// API key
// ============================================================================

/// Personal access token or OAuth token.
///
/// Readable through [`ApiKey::expose`] only; `Debug` output is redacted and
/// the type is never serialized.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw credential
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

// ============================================================================
// Retry options
// ============================================================================

/// Bounds for rate-limit retry
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryOptions {
    /// Maximum number of resends; unbounded when absent
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub initial_delay_ms: Option<u64>,
    #[serde(default)]
    pub max_delay_ms: Option<u64>,
}

/// The `noRetryIfRateLimited` option: a flag or explicit retry bounds
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RateLimitRetry {
    /// `true` disables retry, `false` retries without bound
    Flag(bool),
    Options(RetryOptions),
}

impl Default for RateLimitRetry {
    fn default() -> Self {
        Self::Flag(false)
    }
}

impl RateLimitRetry {
    /// Resolve into the policy the HTTP client applies
    pub fn to_policy(&self) -> RetryPolicy {
        match self {
            Self::Flag(true) => RetryPolicy::Disabled,
            Self::Flag(false) => RetryPolicy::Unbounded(Backoff::default()),
            Self::Options(opts) => {
                let backoff = Backoff::new(
                    opts.initial_delay_ms
                        .map_or(DEFAULT_INITIAL_DELAY, Duration::from_millis),
                    opts.max_delay_ms.map_or(DEFAULT_MAX_DELAY, Duration::from_millis),
                );
                match opts.max_retries {
                    Some(max_retries) => RetryPolicy::Bounded {
                        max_retries,
                        backoff,
                    },
                    None => RetryPolicy::Unbounded(backoff),
                }
            }
        }
    }
}

// ============================================================================
// Client options
// ============================================================================

/// How a derived client treats its parent's custom headers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderMerge {
    /// Union of both header sets, the child winning per key
    #[default]
    Resolve,
    /// The child's headers replace the parent's wholesale
    Replace,
}

/// Options supplied when constructing a client
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientOptions {
    #[serde(default)]
    pub api_key: Option<ApiKey>,
    #[serde(default, rename = "endpointURL")]
    pub endpoint_url: Option<String>,
    #[serde(default, rename = "contentEndpointURL")]
    pub content_endpoint_url: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default, deserialize_with = "deserialize_headers")]
    pub custom_headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub no_retry_if_rate_limited: Option<RateLimitRetry>,
    /// Overall request timeout in milliseconds
    #[serde(default)]
    pub request_timeout: Option<u64>,
    #[serde(skip)]
    pub rate_limit: Option<RateLimiterConfig>,
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(ApiKey::new(key));
        self
    }

    #[must_use]
    pub fn endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn content_endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.content_endpoint_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Add a header sent with every request
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        insert_header(
            self.custom_headers.get_or_insert_with(HashMap::new),
            key.into(),
            value.into(),
        );
        self
    }

    /// Disable retrying rate-limited requests
    #[must_use]
    pub fn no_retry_if_rate_limited(mut self) -> Self {
        self.no_retry_if_rate_limited = Some(RateLimitRetry::Flag(true));
        self
    }

    /// Retry rate-limited requests within the given bounds
    #[must_use]
    pub fn retry(mut self, options: RetryOptions) -> Self {
        self.no_retry_if_rate_limited = Some(RateLimitRetry::Options(options));
        self
    }

    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Throttle requests client-side
    #[must_use]
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.rate_limit = Some(config);
        self
    }

    /// Resolve against the process environment and defaults
    pub fn resolve(self) -> Result<ClientConfig> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Resolve using `env` to look up environment variables
    pub fn resolve_with(self, env: impl Fn(&str) -> Option<String>) -> Result<ClientConfig> {
        let non_empty = |name: &str| env(name).filter(|v| !v.is_empty());

        let api_key = self
            .api_key
            .filter(|key| !key.expose().is_empty())
            .or_else(|| non_empty(API_KEY_ENV).map(ApiKey::new))
            .ok_or(Error::MissingApiKey)?;
        let endpoint_url = self
            .endpoint_url
            .or_else(|| non_empty(ENDPOINT_URL_ENV))
            .unwrap_or_else(|| DEFAULT_ENDPOINT_URL.to_string());
        let content_endpoint_url = self
            .content_endpoint_url
            .or_else(|| non_empty(CONTENT_ENDPOINT_URL_ENV))
            .unwrap_or_else(|| DEFAULT_CONTENT_ENDPOINT_URL.to_string());

        ClientConfig::new(
            api_key,
            endpoint_url,
            content_endpoint_url,
            self.api_version
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            self.custom_headers.unwrap_or_default(),
            self.no_retry_if_rate_limited.unwrap_or_default(),
            self.request_timeout
                .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_millis),
            self.rate_limit,
        )
    }
}

/// Insert a header, dropping any existing entry whose name differs only in case
fn insert_header(headers: &mut HashMap<String, String>, key: String, value: String) {
    headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&key));
    headers.insert(key, value);
}

/// Header values may be given as strings, numbers or booleans
fn deserialize_headers<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<HashMap<String, String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<HashMap<String, Value>> = Option::deserialize(deserializer)?;
    raw.map(|headers| {
        headers
            .into_iter()
            .map(|(key, value)| match value {
                Value::String(s) => Ok((key, s)),
                Value::Number(n) => Ok((key, n.to_string())),
                Value::Bool(b) => Ok((key, b.to_string())),
                other => Err(serde::de::Error::custom(format!(
                    "header '{key}' must be a string, number or boolean, got {other}"
                ))),
            })
            .collect::<std::result::Result<HashMap<String, String>, D::Error>>()
    })
    .transpose()
}

// ============================================================================
// Resolved config
// ============================================================================

/// Immutable configuration shared by every request of a client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    api_key: ApiKey,
    pub endpoint_url: String,
    pub content_endpoint_url: String,
    pub api_version: String,
    pub api_version_major: String,
    pub custom_headers: HashMap<String, String>,
    pub no_retry_if_rate_limited: RateLimitRetry,
    pub request_timeout: Duration,
    pub rate_limit: Option<RateLimiterConfig>,
}

impl ClientConfig {
    #[allow(clippy::too_many_arguments)]
    fn new(
        api_key: ApiKey,
        endpoint_url: String,
        content_endpoint_url: String,
        api_version: String,
        custom_headers: HashMap<String, String>,
        no_retry_if_rate_limited: RateLimitRetry,
        request_timeout: Duration,
        rate_limit: Option<RateLimiterConfig>,
    ) -> Result<Self> {
        url::Url::parse(&endpoint_url)?;
        url::Url::parse(&content_endpoint_url)?;

        let api_version_major = api_version
            .split('.')
            .next()
            .filter(|major| !major.is_empty())
            .ok_or_else(|| Error::config(format!("Invalid API version '{api_version}'")))?
            .to_string();

        Ok(Self {
            api_key,
            endpoint_url: endpoint_url.trim_end_matches('/').to_string(),
            content_endpoint_url: content_endpoint_url.trim_end_matches('/').to_string(),
            api_version,
            api_version_major,
            custom_headers,
            no_retry_if_rate_limited,
            request_timeout,
            rate_limit,
        })
    }

    /// Shorthand for `ClientOptions::new()`
    pub fn builder() -> ClientOptions {
        ClientOptions::new()
    }

    /// The API credential
    pub fn api_key(&self) -> &ApiKey {
        &self.api_key
    }

    /// Versioned API base, e.g. `https://api.airtable.com/v0`
    pub fn api_url(&self) -> String {
        format!("{}/v{}", self.endpoint_url, self.api_version_major)
    }

    /// Versioned content base, e.g. `https://content.airtable.com/v0`
    pub fn content_url(&self) -> String {
        format!("{}/v{}", self.content_endpoint_url, self.api_version_major)
    }

    /// Retry policy derived from `no_retry_if_rate_limited`
    pub fn retry_policy(&self) -> RetryPolicy {
        self.no_retry_if_rate_limited.to_policy()
    }

    /// Configuration for the HTTP client
    pub fn http_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder(self.api_url(), self.api_key.clone())
            .headers(self.custom_headers.clone())
            .retry(self.retry_policy())
            .timeout(self.request_timeout);
        if let Some(ref rate_limit) = self.rate_limit {
            builder = builder.rate_limit(rate_limit.clone());
        }
        builder.build()
    }

    /// Derive a configuration, taking unset options from this one
    pub fn derive(&self, options: ClientOptions, merge: HeaderMerge) -> Result<Self> {
        let custom_headers = match merge {
            HeaderMerge::Resolve => {
                let mut headers = self.custom_headers.clone();
                for (key, value) in options.custom_headers.unwrap_or_default() {
                    insert_header(&mut headers, key, value);
                }
                headers
            }
            HeaderMerge::Replace => options.custom_headers.unwrap_or_default(),
        };

        Self::new(
            options
                .api_key
                .filter(|key| !key.expose().is_empty())
                .unwrap_or_else(|| self.api_key.clone()),
            options
                .endpoint_url
                .unwrap_or_else(|| self.endpoint_url.clone()),
            options
                .content_endpoint_url
                .unwrap_or_else(|| self.content_endpoint_url.clone()),
            options
                .api_version
                .unwrap_or_else(|| self.api_version.clone()),
            custom_headers,
            options
                .no_retry_if_rate_limited
                .unwrap_or_else(|| self.no_retry_if_rate_limited.clone()),
            options
                .request_timeout
                .map_or(self.request_timeout, Duration::from_millis),
            options.rate_limit.or_else(|| self.rate_limit.clone()),
        )
    }
}
