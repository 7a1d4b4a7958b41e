//! The Airtable client
//!
//! Entry point holding the resolved configuration and the HTTP client every
//! resource wrapper sends through. Cloning is cheap; clones share one
//! configuration and connection pool.

use crate::config::{ClientConfig, ClientOptions, HeaderMerge};
use crate::error::Result;
use crate::http::{HttpClient, RequestDescriptor, RetryPolicy, Transport};
use crate::pagination::{IteratorReset, OffsetExtractor, PageContext, PageControl, Paginator};
use crate::resources::{Base, BaseInfo, CreatedBase, UserInfo};
use crate::types::{JsonValue, Method};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

struct Inner {
    config: ClientConfig,
    http: HttpClient,
}

/// Airtable Web API client
#[derive(Clone)]
pub struct Airtable {
    inner: Arc<Inner>,
}

impl Airtable {
    /// Create a client, filling unset options from the environment
    pub fn new(options: ClientOptions) -> Result<Self> {
        Self::from_config(options.resolve()?)
    }

    /// Create a client configured entirely from the environment
    pub fn from_env() -> Result<Self> {
        Self::new(ClientOptions::default())
    }

    /// Create a client from a resolved configuration
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let http = HttpClient::new(config.http_config())?;
        Ok(Self {
            inner: Arc::new(Inner { config, http }),
        })
    }

    /// Create a client sending through a custom transport
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let http = HttpClient::with_transport(config.http_config(), transport);
        Self {
            inner: Arc::new(Inner { config, http }),
        }
    }

    /// Derive a client, taking unset options from this one
    pub fn create(&self, options: ClientOptions, merge: HeaderMerge) -> Result<Self> {
        let config = self.inner.config.derive(options, merge)?;
        Ok(Self::with_transport(config, self.inner.http.transport()))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The API credential
    pub fn api_key(&self) -> &str {
        self.inner.config.api_key().expose()
    }

    pub fn endpoint_url(&self) -> &str {
        &self.inner.config.endpoint_url
    }

    pub fn content_endpoint_url(&self) -> &str {
        &self.inner.config.content_endpoint_url
    }

    pub fn api_version(&self) -> &str {
        &self.inner.config.api_version
    }

    pub fn api_version_major(&self) -> &str {
        &self.inner.config.api_version_major
    }

    pub fn custom_headers(&self) -> &HashMap<String, String> {
        &self.inner.config.custom_headers
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.inner.config.retry_policy()
    }

    pub fn request_timeout(&self) -> Duration {
        self.inner.config.request_timeout
    }

    /// The underlying request executor
    pub fn http(&self) -> &HttpClient {
        &self.inner.http
    }

    /// Handle to a base
    pub fn base(&self, base_id: impl Into<String>) -> Base {
        Base::new(self.clone(), base_id)
    }

    // ========================================================================
    // Meta endpoints
    // ========================================================================

    /// The user (or service account) owning the API key
    pub async fn whoami(&self) -> Result<UserInfo> {
        self.execute_as(&RequestDescriptor::new("meta/whoami")).await
    }

    /// Every base the API key can access
    pub async fn bases(&self) -> Result<Vec<BaseInfo>> {
        let mut bases = Vec::new();
        let mut failure = None;

        self.paginate(
            &RequestDescriptor::new("meta/bases"),
            |ctx| match parse_items::<BaseInfo>(ctx.take_items("bases")) {
                Ok(page) => {
                    bases.extend(page);
                    PageControl::Continue
                }
                Err(e) => {
                    failure = Some(e);
                    PageControl::Stop
                }
            },
            None,
        )
        .await?;

        match failure {
            Some(e) => Err(e),
            None => Ok(bases),
        }
    }

    /// Create a base from a JSON definition (`name`, `workspaceId`, `tables`)
    pub async fn create_base(&self, definition: JsonValue) -> Result<CreatedBase> {
        self.execute_as(&RequestDescriptor::with_method(Method::POST, "meta/bases").json(definition))
            .await
    }

    // ========================================================================
    // Request primitives
    // ========================================================================

    /// Execute a single request
    pub async fn execute(&self, descriptor: &RequestDescriptor) -> Result<JsonValue> {
        self.inner.http.execute(descriptor).await
    }

    /// Execute a single request and deserialize the body
    pub async fn execute_as<T: DeserializeOwned>(&self, descriptor: &RequestDescriptor) -> Result<T> {
        let body = self.execute(descriptor).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Page through a list endpoint; see [`Paginator::paginate`]
    pub async fn paginate<F, R>(
        &self,
        descriptor: &RequestDescriptor,
        on_each_page: F,
        extractor: Option<&dyn OffsetExtractor>,
    ) -> Result<()>
    where
        F: FnMut(&mut PageContext<'_>) -> R,
        R: Into<PageControl>,
    {
        Paginator::new(&self.inner.http)
            .paginate(descriptor, on_each_page, extractor)
            .await
    }

    /// Collect every item of a list endpoint; see [`Paginator::collect_all`]
    pub async fn collect_all(
        &self,
        descriptor: &RequestDescriptor,
        items_key: &str,
        reset: IteratorReset,
    ) -> Result<Vec<JsonValue>> {
        Paginator::new(&self.inner.http)
            .collect_all(descriptor, items_key, reset)
            .await
    }
}

impl fmt::Debug for Airtable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Airtable")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// Deserialize a page of items
pub(crate) fn parse_items<T: DeserializeOwned>(items: Vec<JsonValue>) -> Result<Vec<T>> {
    items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(Into::into))
        .collect()
}
