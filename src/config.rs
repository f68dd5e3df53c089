//! Query file configuration
//!
//! A query file describes one query in YAML or JSON:
//!
//! ```yaml
//! domain: data.cdc.gov
//! dataset: abcd-1234
//! app_token: my-token
//! clauses:
//!   $select: [state, cases]
//!   $where: "cases > 0"
//!   $limit: 50000
//! page_size: 10000
//! http:
//!   timeout_secs: 60
//!   requests_per_second: 5
//! ```
//!
//! Clause keys go through the same validation as
//! `QueryDefinition::from_clauses`, so `$group`, `$having` and `$order` are
//! rejected here too.

use crate::error::{Error, Result, ResultExt};
use crate::http::{HttpClientConfig, RateLimiterConfig};
use crate::query::{Clause, QueryDefinition};
use crate::types::{JsonValue, DEFAULT_PAGE_SIZE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Query config
// ============================================================================

/// Complete query configuration loaded from a file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryConfig {
    /// Host name of the data portal
    #[serde(default)]
    pub domain: Option<String>,

    /// Dataset identifier
    #[serde(default)]
    pub dataset: Option<String>,

    /// Application token sent as `X-App-Token`
    #[serde(default)]
    pub app_token: Option<String>,

    /// Raw `$`-keyed clauses
    #[serde(default)]
    pub clauses: BTreeMap<String, JsonValue>,

    /// Rows per page for paged downloads
    #[serde(default)]
    pub page_size: Option<u64>,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpSettings,
}

impl QueryConfig {
    /// Load a query file; `.json` files are parsed as JSON, anything else as YAML
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read query file '{}'", path.display()))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// Parse a YAML query
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse a JSON query
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::config(format!("Failed to parse query JSON: {e}")))
    }

    /// Set a clause, replacing any key that names the same clause
    pub fn set_clause(&mut self, clause: Clause, value: impl Into<JsonValue>) {
        self.clauses
            .retain(|key, _| key.parse::<Clause>().ok() != Some(clause));
        self.clauses.insert(clause.keyword().to_string(), value.into());
    }

    /// Validated query definition
    pub fn to_definition(&self) -> Result<QueryDefinition> {
        let domain = self
            .domain
            .as_deref()
            .ok_or_else(|| Error::config("Missing required field 'domain'"))?;
        let dataset = self
            .dataset
            .as_deref()
            .ok_or_else(|| Error::config("Missing required field 'dataset'"))?;

        let mut builder = QueryDefinition::builder(domain, dataset).clauses(&self.clauses)?;
        if let Some(token) = &self.app_token {
            builder = builder.app_token(token);
        }
        builder.build()
    }

    /// Rows per page, falling back to the default
    pub fn page_size(&self) -> Result<u64> {
        match self.page_size {
            Some(0) => Err(Error::config("page_size must be a positive integer")),
            Some(size) => Ok(size),
            None => Ok(DEFAULT_PAGE_SIZE),
        }
    }

    /// HTTP client configuration
    pub fn http_client_config(&self) -> HttpClientConfig {
        self.http.to_client_config()
    }
}

// ============================================================================
// HTTP settings
// ============================================================================

/// HTTP settings section of a query file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpSettings {
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent override
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Endpoint override (mirrors, local servers)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Client-side rate limit; unlimited when absent
    #[serde(default)]
    pub requests_per_second: Option<u32>,

    /// Burst size for the rate limit, defaults to `requests_per_second`
    #[serde(default)]
    pub burst_size: Option<u32>,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: None,
            base_url: None,
            requests_per_second: None,
            burst_size: None,
        }
    }
}

impl HttpSettings {
    fn to_client_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder().timeout(Duration::from_secs(self.timeout_secs));

        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent);
        }
        if let Some(base_url) = &self.base_url {
            builder = builder.base_url(base_url);
        }
        if let Some(rps) = self.requests_per_second {
            builder = builder.rate_limit(RateLimiterConfig::new(
                rps,
                self.burst_size.unwrap_or(rps),
            ));
        }

        builder.build()
    }
}
