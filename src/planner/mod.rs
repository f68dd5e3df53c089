//! Query planner module
//!
//! `QueryPlanner` turns a `QueryDefinition` into requests against the
//! dataset's resource endpoint.
//!
//! # Overview
//!
//! - `count_effective_rows` - rows the query will return after `$offset`/`$limit`
//! - `fetch_all` - one bulk request with every clause applied
//! - `fetch_pages` - a lazy, strictly sequential sequence of bounded pages
//!
//! Progress and row count warnings go to an injected `QueryObserver`.

mod observer;
mod pages;

pub use observer::{NoopObserver, QueryObserver, TracingObserver};
pub use pages::Pages;

use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RequestConfig, Transport};
use crate::pagination::{RowCount, RowWindow};
use crate::query::{ClausePayload, QueryDefinition, COUNT_FIELD};
use crate::types::{JsonValue, Page, Record, APP_TOKEN_HEADER};
use std::sync::Arc;
use tracing::debug;

/// Plans and issues the requests for one query
pub struct QueryPlanner {
    definition: QueryDefinition,
    transport: Arc<dyn Transport>,
    observer: Arc<dyn QueryObserver>,
}

impl QueryPlanner {
    /// Create a planner using the given transport
    pub fn new(definition: QueryDefinition, transport: impl Transport + 'static) -> Self {
        Self {
            definition,
            transport: Arc::new(transport),
            observer: Arc::new(NoopObserver),
        }
    }

    /// Create a planner backed by a reqwest `HttpClient`
    pub fn with_http(definition: QueryDefinition, config: HttpClientConfig) -> Result<Self> {
        Ok(Self::new(definition, HttpClient::with_config(config)?))
    }

    /// Set the observer receiving progress and warnings
    #[must_use]
    pub fn with_observer(mut self, observer: impl QueryObserver + 'static) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    /// The query being planned
    pub fn definition(&self) -> &QueryDefinition {
        &self.definition
    }

    /// Resource endpoint, without any clauses
    pub fn build_url(&self) -> String {
        self.definition.resource_url()
    }

    /// Rows matched by the query's `$where`, ignoring `$offset`/`$limit`
    pub async fn dataset_row_count(&self) -> Result<u64> {
        let records = self.request(&ClausePayload::count(&self.definition)).await?;
        parse_count(records)
    }

    /// Rows the query will return once `$offset` and `$limit` are applied
    ///
    /// An empty dataset, an offset past the end, or a limit larger than the
    /// remaining rows produce a warning, not an error.
    pub async fn count_effective_rows(&self) -> Result<u64> {
        let dataset_rows = self.dataset_row_count().await?;
        let count = RowCount::compute(
            dataset_rows,
            self.definition.offset(),
            self.definition.limit(),
        );

        if let Some(warning) = count.warning {
            self.observer.on_warning(&warning.to_string());
        }

        debug!(
            "Dataset {} has {} rows, {} after offset/limit",
            self.definition.dataset_id(),
            dataset_rows,
            count.rows
        );
        Ok(count.rows)
    }

    /// Download everything in a single request
    pub async fn fetch_all(&self) -> Result<Vec<Record>> {
        self.observer.on_progress(&format!(
            "Downloading dataset {} {}",
            self.definition.domain(),
            self.definition.dataset_id()
        ));

        let payload = ClausePayload::build(&self.definition, None)?;
        let records = self.request(&payload).await?;

        self.observer
            .on_progress(&format!("  Downloaded {} rows", records.len()));
        Ok(records)
    }

    /// Download rows `start..=end` of the offset-adjusted result set
    ///
    /// Fails with `Error::PaginationInvariant` if `end < start`, or if the
    /// server returns no rows or more rows than requested.
    pub async fn fetch_range(&self, start: u64, end: u64) -> Result<Page> {
        let window = RowWindow::new(start, end)?;
        let payload = ClausePayload::build(&self.definition, Some(window))?;
        let page = self.request(&payload).await?;

        if page.is_empty() {
            return Err(Error::pagination(format!(
                "rows {start}..={end} came back empty"
            )));
        }
        if page.len() as u64 > window.len() {
            return Err(Error::pagination(format!(
                "rows {start}..={end} returned {} records, expected at most {}",
                page.len(),
                window.len()
            )));
        }

        Ok(page)
    }

    /// Download the result set in pages of at most `page_size` rows
    ///
    /// Nothing is requested until the first page is pulled.
    pub fn fetch_pages(&self, page_size: u64) -> Result<Pages<'_>> {
        if page_size == 0 {
            return Err(Error::config("page size must be a positive integer"));
        }
        Ok(Pages::new(self, page_size))
    }

    async fn request(&self, payload: &ClausePayload) -> Result<Vec<Record>> {
        let mut request = RequestConfig::new();
        for (keyword, value) in payload.iter() {
            request = request.query(keyword, value);
        }
        if let Some(token) = self.definition.app_token() {
            request = request.header(APP_TOKEN_HEADER, token);
        }

        self.transport
            .get_records(&self.build_url(), request)
            .await
    }
}

impl std::fmt::Debug for QueryPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryPlanner")
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

/// Extract the row count from a `count(:id)` response
fn parse_count(records: Vec<Record>) -> Result<u64> {
    let [record] = <[Record; 1]>::try_from(records).map_err(|records| {
        Error::decode(format!(
            "count query returned {} records, expected 1",
            records.len()
        ))
    })?;

    match record.get(COUNT_FIELD) {
        Some(JsonValue::String(count)) => count.trim().parse().map_err(|_| {
            Error::decode(format!("'{COUNT_FIELD}' is not a row count: '{count}'"))
        }),
        Some(JsonValue::Number(count)) => count.as_u64().ok_or_else(|| {
            Error::decode(format!("'{COUNT_FIELD}' is not a row count: {count}"))
        }),
        Some(other) => Err(Error::decode(format!(
            "'{COUNT_FIELD}' is not a row count: {other}"
        ))),
        None => Err(Error::decode(format!(
            "count response is missing '{COUNT_FIELD}'"
        ))),
    }
}

#[cfg(test)]
mod tests;
