//! HTTP client for the resource endpoints
//!
//! Provides a thin reqwest wrapper that handles:
//! - Default and per-request headers
//! - Optional rate limiting
//! - Endpoint override for mirrors and local test servers
//! - Mapping non-success statuses to `Error::Request`
//!
//! Requests are never retried.

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::error::{Error, Result};
use crate::types::{JsonValue, Record};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Replaces scheme and host of every request URL when set
    pub base_url: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Rate limiter configuration
    pub rate_limit: Option<RateLimiterConfig>,
    /// Default headers for all requests
    pub default_headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            rate_limit: None,
            default_headers: HashMap::new(),
            user_agent: format!("soda-query/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Route requests to this base URL instead of the dataset's domain
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
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

/// Configuration for a single request
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Query parameters
    pub query: BTreeMap<String, String>,
    /// Request headers
    pub headers: HashMap<String, String>,
}

impl RequestConfig {
    /// Create a new request config
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// Transport
// ============================================================================

/// GET capability used by the query planner
///
/// Implementations return the JSON array body as records, or
/// `Error::Request` for non-success statuses.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a GET request and decode the records it returns
    async fn get_records(&self, url: &str, request: RequestConfig) -> Result<Vec<Record>>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn get_records(&self, url: &str, request: RequestConfig) -> Result<Vec<Record>> {
        (**self).get_records(url, request).await
    }
}

// ============================================================================
// HTTP client
// ============================================================================

/// reqwest-backed HTTP client
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    rate_limiter: Option<RateLimiter>,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            client,
            config,
            rate_limiter,
        })
    }

    /// Check if rate limiting is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// Make a GET request, failing on any non-success status
    pub async fn get(&self, url: &str, config: RequestConfig) -> Result<Response> {
        let full_url = self.resolve_url(url)?;

        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait().await;
        }

        let mut req = self.client.get(&full_url);

        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }
        for (key, value) in &config.headers {
            req = req.header(key.as_str(), value.as_str());
        }
        if !config.query.is_empty() {
            req = req.query(&config.query);
        }

        debug!("GET {} {:?}", full_url, config.query);
        let response = req.send().await?;
        let status = response.status();

        if !status.is_success() {
            debug!("Request failed with {}: {}", status.as_u16(), full_url);
            return Err(Error::request(status.as_u16(), full_url));
        }

        Ok(response)
    }

    /// Make a GET request and parse the JSON response
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        config: RequestConfig,
    ) -> Result<T> {
        let response = self.get(url, config).await?;
        let json: T = response.json().await?;
        Ok(json)
    }

    /// Apply the endpoint override, if any
    pub fn resolve_url(&self, url: &str) -> Result<String> {
        let target = Url::parse(url)?;
        match &self.config.base_url {
            Some(base) => {
                let base = base.trim_end_matches('/');
                let resolved = Url::parse(&format!("{base}{}", target.path()))?;
                Ok(resolved.into())
            }
            None => Ok(target.into()),
        }
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn get_records(&self, url: &str, request: RequestConfig) -> Result<Vec<Record>> {
        let body: JsonValue = self.get_json(url, request).await?;
        records_from_body(body)
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

/// Split a JSON array body into records
pub fn records_from_body(body: JsonValue) -> Result<Vec<Record>> {
    let JsonValue::Array(items) = body else {
        return Err(Error::decode(format!(
            "expected a JSON array of records, got {}",
            json_kind(&body)
        )));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            JsonValue::Object(record) => Ok(record),
            other => Err(Error::decode(format!(
                "record {index} is {}, expected an object",
                json_kind(&other)
            ))),
        })
        .collect()
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
