//! Tests for the query planner

use super::*;
use crate::query::QueryDefinitionBuilder;
use crate::types::DEFAULT_PAGE_SIZE;
use async_trait::async_trait;
use futures::TryStreamExt;
use serde_json::json;
use std::sync::Mutex;

// ============================================================================
// Test doubles
// ============================================================================

/// In-memory dataset that answers count and range queries
#[derive(Default)]
struct MockTransport {
    rows: Vec<Record>,
    /// Count reported by the count query, defaults to `rows.len()`
    reported_count: Option<JsonValue>,
    /// Ignore `$limit` and return everything after `$offset`
    ignore_limit: bool,
    /// Fail the n-th request (zero-based) with this status
    fail_on: Option<(usize, u16)>,
    requests: Mutex<Vec<RequestConfig>>,
}

impl MockTransport {
    fn with_rows(count: usize) -> Self {
        Self {
            rows: (0..count).map(|i| row(i as u64)).collect(),
            ..Default::default()
        }
    }

    fn requests(&self) -> Vec<RequestConfig> {
        self.requests.lock().unwrap().clone()
    }

    /// `($offset, $limit)` of every non-count request
    fn windows(&self) -> Vec<(u64, u64)> {
        self.requests()
            .iter()
            .filter(|r| !is_count(r))
            .map(|r| (param(r, "$offset"), param(r, "$limit")))
            .collect()
    }

    fn count_requests(&self) -> usize {
        self.requests().iter().filter(|r| is_count(r)).count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get_records(&self, url: &str, request: RequestConfig) -> Result<Vec<Record>> {
        let index = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len() - 1
        };

        if let Some((fail_index, status)) = self.fail_on {
            if fail_index == index {
                return Err(Error::request(status, url));
            }
        }

        if is_count(&request) {
            let count = self
                .reported_count
                .clone()
                .unwrap_or_else(|| json!(self.rows.len().to_string()));
            return Ok(vec![record(json!({ "count_id": count }))]);
        }

        let offset = request
            .query
            .get("$offset")
            .map_or(0, |v| v.parse::<usize>().unwrap());
        let limit = match (self.ignore_limit, request.query.get("$limit")) {
            (false, Some(limit)) => limit.parse::<usize>().unwrap(),
            _ => usize::MAX,
        };

        Ok(self.rows.iter().skip(offset).take(limit).cloned().collect())
    }
}

#[derive(Default)]
struct RecordingObserver {
    progress: Mutex<Vec<String>>,
    warnings: Mutex<Vec<String>>,
}

impl QueryObserver for Arc<RecordingObserver> {
    fn on_progress(&self, message: &str) {
        self.progress.lock().unwrap().push(message.to_string());
    }

    fn on_warning(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }
}

fn row(id: u64) -> Record {
    record(json!({ "id": id.to_string(), "value": format!("row-{id}") }))
}

fn record(value: JsonValue) -> Record {
    match value {
        JsonValue::Object(map) => map,
        _ => unreachable!("test records are objects"),
    }
}

fn is_count(request: &RequestConfig) -> bool {
    request.query.get("$select").map(String::as_str) == Some("count(:id)")
}

fn param(request: &RequestConfig, key: &str) -> u64 {
    request.query[key].parse().unwrap()
}

fn query() -> QueryDefinitionBuilder {
    QueryDefinition::builder("data.cdc.gov", "abc123")
}

fn planner(definition: QueryDefinition, transport: &Arc<MockTransport>) -> QueryPlanner {
    QueryPlanner::new(definition, Arc::clone(transport))
}

fn observed(
    definition: QueryDefinition,
    transport: &Arc<MockTransport>,
) -> (QueryPlanner, Arc<RecordingObserver>) {
    let observer = Arc::new(RecordingObserver::default());
    let planner = planner(definition, transport).with_observer(Arc::clone(&observer));
    (planner, observer)
}

// ============================================================================
// URL and count Tests
// ============================================================================

#[test]
fn test_build_url() {
    let transport = Arc::new(MockTransport::default());
    let planner = planner(query().build().unwrap(), &transport);
    assert_eq!(planner.build_url(), "https://data.cdc.gov/resource/abc123.json");
}

#[tokio::test]
async fn test_count_effective_rows_whole_dataset() {
    let transport = Arc::new(MockTransport::with_rows(1234));
    let (planner, observer) = observed(query().build().unwrap(), &transport);

    assert_eq!(planner.count_effective_rows().await.unwrap(), 1234);
    assert!(observer.warnings.lock().unwrap().is_empty());

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].query.get("$limit"), Some(&"1".to_string()));
    assert!(!requests[0].query.contains_key("$offset"));
}

#[tokio::test]
async fn test_count_query_keeps_where_clause() {
    let transport = Arc::new(MockTransport::with_rows(10));
    let planner = planner(
        query()
            .select("state")
            .where_clause("state = 'CA'")
            .build()
            .unwrap(),
        &transport,
    );

    planner.count_effective_rows().await.unwrap();

    let request = &transport.requests()[0];
    assert_eq!(request.query.get("$select"), Some(&"count(:id)".to_string()));
    assert_eq!(
        request.query.get("$where"),
        Some(&"state = 'CA'".to_string())
    );
}

#[tokio::test]
async fn test_count_accepts_numeric_count() {
    let transport = Arc::new(MockTransport {
        reported_count: Some(json!(42)),
        ..Default::default()
    });
    let planner = planner(query().build().unwrap(), &transport);
    assert_eq!(planner.dataset_row_count().await.unwrap(), 42);
}

#[tokio::test]
async fn test_count_rejects_malformed_response() {
    let transport = Arc::new(MockTransport {
        reported_count: Some(json!("lots")),
        ..Default::default()
    });
    let planner = planner(query().build().unwrap(), &transport);

    let err = planner.count_effective_rows().await.unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
}

#[test]
fn test_parse_count_shapes() {
    assert_eq!(
        parse_count(vec![record(json!({"count_id": "25000"}))]).unwrap(),
        25_000
    );
    assert!(parse_count(vec![]).is_err());
    assert!(parse_count(vec![row(1), row(2)]).is_err());
    assert!(parse_count(vec![record(json!({"count": "3"}))]).is_err());
    assert!(parse_count(vec![record(json!({"count_id": -3}))]).is_err());
    assert!(parse_count(vec![record(json!({"count_id": null}))]).is_err());
}

#[tokio::test]
async fn test_count_empty_dataset_warns() {
    let transport = Arc::new(MockTransport::with_rows(0));
    let (planner, observer) = observed(query().build().unwrap(), &transport);

    assert_eq!(planner.count_effective_rows().await.unwrap(), 0);
    assert_eq!(
        observer.warnings.lock().unwrap().as_slice(),
        ["dataset has no rows"]
    );
}

#[tokio::test]
async fn test_count_offset_beyond_end_warns() {
    let transport = Arc::new(MockTransport::with_rows(100));
    let (planner, observer) = observed(query().offset(100).build().unwrap(), &transport);

    assert_eq!(planner.count_effective_rows().await.unwrap(), 0);
    let warnings = observer.warnings.lock().unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].starts_with("offset exceeds row count"));
}

#[tokio::test]
async fn test_count_limit_exceeding_remaining_is_clamped() {
    let transport = Arc::new(MockTransport::with_rows(100));
    let (planner, observer) =
        observed(query().offset(90).limit(50).build().unwrap(), &transport);

    assert_eq!(planner.count_effective_rows().await.unwrap(), 10);
    let warnings = observer.warnings.lock().unwrap();
    assert!(warnings[0].starts_with("limit exceeds remaining rows"));
}

#[tokio::test]
async fn test_count_limit_within_remaining() {
    let transport = Arc::new(MockTransport::with_rows(100));
    let (planner, observer) =
        observed(query().offset(10).limit(50).build().unwrap(), &transport);

    assert_eq!(planner.count_effective_rows().await.unwrap(), 50);
    assert!(observer.warnings.lock().unwrap().is_empty());
}

// ============================================================================
// fetch_all Tests
// ============================================================================

#[tokio::test]
async fn test_fetch_all_single_request() {
    let transport = Arc::new(MockTransport::with_rows(50));
    let (planner, observer) = observed(
        query()
            .select_columns(["id", "value"])
            .where_clause("id > 0")
            .limit(20)
            .offset(5)
            .app_token("token")
            .build()
            .unwrap(),
        &transport,
    );

    let records = planner.fetch_all().await.unwrap();
    assert_eq!(records.len(), 20);
    assert_eq!(records[0], row(5));

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(
        request.query.get("$select"),
        Some(&"\"id\",\"value\"".to_string())
    );
    assert_eq!(request.query.get("$where"), Some(&"id > 0".to_string()));
    assert_eq!(request.query.get("$limit"), Some(&"20".to_string()));
    assert_eq!(request.query.get("$offset"), Some(&"5".to_string()));
    assert_eq!(
        request.headers.get(APP_TOKEN_HEADER),
        Some(&"token".to_string())
    );

    let progress = observer.progress.lock().unwrap();
    assert_eq!(progress.last().unwrap(), "  Downloaded 20 rows");
}

#[tokio::test]
async fn test_no_app_token_header_without_token() {
    let transport = Arc::new(MockTransport::with_rows(3));
    let planner = planner(query().build().unwrap(), &transport);

    planner.fetch_all().await.unwrap();
    assert!(transport.requests()[0].headers.is_empty());
}

#[tokio::test]
async fn test_fetch_all_propagates_request_error() {
    let transport = Arc::new(MockTransport {
        fail_on: Some((0, 404)),
        ..MockTransport::with_rows(3)
    });
    let planner = planner(query().build().unwrap(), &transport);

    let err = planner.fetch_all().await.unwrap_err();
    assert!(matches!(err, Error::Request { status: 404, .. }));
}

// ============================================================================
// fetch_range Tests
// ============================================================================

#[tokio::test]
async fn test_fetch_range_applies_query_offset() {
    let transport = Arc::new(MockTransport::with_rows(100));
    let planner = planner(query().offset(30).build().unwrap(), &transport);

    let page = planner.fetch_range(10, 14).await.unwrap();
    assert_eq!(page.len(), 5);
    assert_eq!(page[0], row(40));
    assert_eq!(transport.windows(), vec![(40, 5)]);
}

#[tokio::test]
async fn test_fetch_range_rejects_inverted_window() {
    let transport = Arc::new(MockTransport::with_rows(100));
    let planner = planner(query().build().unwrap(), &transport);

    let err = planner.fetch_range(5, 4).await.unwrap_err();
    assert!(matches!(err, Error::PaginationInvariant { .. }));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_fetch_range_rejects_window_too_large_for_u64() {
    let transport = Arc::new(MockTransport::with_rows(100));
    let planner = planner(query().build().unwrap(), &transport);

    let err = planner.fetch_range(0, u64::MAX).await.unwrap_err();
    assert!(matches!(err, Error::PaginationInvariant { .. }));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_fetch_range_rejects_offset_overflow() {
    let transport = Arc::new(MockTransport::with_rows(100));
    let planner = planner(query().offset(u64::MAX - 1).build().unwrap(), &transport);

    let err = planner.fetch_range(5, 9).await.unwrap_err();
    assert!(matches!(err, Error::PaginationInvariant { .. }));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_fetch_range_rejects_empty_page() {
    let transport = Arc::new(MockTransport::with_rows(10));
    let planner = planner(query().build().unwrap(), &transport);

    let err = planner.fetch_range(20, 29).await.unwrap_err();
    assert!(matches!(err, Error::PaginationInvariant { .. }));
}

#[tokio::test]
async fn test_fetch_range_rejects_oversize_page() {
    let transport = Arc::new(MockTransport {
        ignore_limit: true,
        ..MockTransport::with_rows(10)
    });
    let planner = planner(query().build().unwrap(), &transport);

    let err = planner.fetch_range(0, 4).await.unwrap_err();
    assert!(err.to_string().contains("expected at most 5"));
}

// ============================================================================
// fetch_pages Tests
// ============================================================================

#[tokio::test]
async fn test_fetch_pages_25000_rows() {
    let transport = Arc::new(MockTransport::with_rows(25_000));
    let planner = planner(query().build().unwrap(), &transport);

    let mut pages = planner.fetch_pages(DEFAULT_PAGE_SIZE).unwrap();
    let mut records = Vec::new();
    let mut sizes = Vec::new();
    while let Some(page) = pages.next_page().await.unwrap() {
        sizes.push(page.len());
        records.extend(page);
    }

    assert_eq!(pages.total_rows(), Some(25_000));
    assert_eq!(pages.page_count(), Some(3));
    assert_eq!(sizes, vec![10_000, 10_000, 5_000]);
    assert_eq!(transport.count_requests(), 1);
    assert_eq!(
        transport.windows(),
        vec![(0, 10_000), (10_000, 10_000), (20_000, 5_000)]
    );
    assert_eq!(transport.requests().len(), 4);
    assert_eq!(records, transport.rows);
}

#[tokio::test]
async fn test_fetch_pages_plan_survives_exhaustion() {
    let transport = Arc::new(MockTransport::with_rows(15));
    let planner = planner(query().build().unwrap(), &transport);
    let mut pages = planner.fetch_pages(10).unwrap();

    assert_eq!(pages.page_count(), None);
    pages.next_page().await.unwrap().unwrap();
    assert_eq!(pages.total_rows(), Some(15));
    assert_eq!(pages.page_count(), Some(2));
    assert!(!pages.is_done());

    pages.next_page().await.unwrap().unwrap();
    assert!(pages.next_page().await.unwrap().is_none());
    assert!(pages.is_done());
    assert_eq!(pages.total_rows(), Some(15));
    assert_eq!(pages.page_count(), Some(2));
    assert!(pages.next_page().await.unwrap().is_none());
    assert_eq!(transport.requests().len(), 3);
}

#[tokio::test]
async fn test_fetch_pages_exact_multiple() {
    let transport = Arc::new(MockTransport::with_rows(30));
    let planner = planner(query().build().unwrap(), &transport);

    let records = planner.fetch_pages(10).unwrap().collect_records().await.unwrap();
    assert_eq!(records.len(), 30);
    assert_eq!(transport.windows(), vec![(0, 10), (10, 10), (20, 10)]);
}

#[tokio::test]
async fn test_fetch_pages_combines_offset_and_limit() {
    let transport = Arc::new(MockTransport::with_rows(30));
    let planner = planner(query().offset(5).limit(12).build().unwrap(), &transport);

    let records = planner.fetch_pages(5).unwrap().collect_records().await.unwrap();

    assert_eq!(records.len(), 12);
    assert_eq!(records.first(), Some(&row(5)));
    assert_eq!(records.last(), Some(&row(16)));
    assert_eq!(transport.windows(), vec![(5, 5), (10, 5), (15, 2)]);
}

#[tokio::test]
async fn test_fetch_pages_limit_exceeding_rows() {
    let transport = Arc::new(MockTransport::with_rows(25));
    let (planner, observer) =
        observed(query().offset(20).limit(100).build().unwrap(), &transport);

    let records = planner.fetch_pages(10).unwrap().collect_records().await.unwrap();

    assert_eq!(records.len(), 5);
    assert_eq!(transport.windows(), vec![(20, 5)]);
    assert_eq!(observer.warnings.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_fetch_pages_empty_dataset() {
    let transport = Arc::new(MockTransport::with_rows(0));
    let (planner, observer) = observed(query().build().unwrap(), &transport);

    let mut pages = planner.fetch_pages(10).unwrap();
    assert!(pages.next_page().await.unwrap().is_none());
    assert!(pages.is_done());
    assert_eq!(pages.page_count(), Some(0));
    assert_eq!(transport.requests().len(), 1);
    assert_eq!(
        observer.warnings.lock().unwrap().as_slice(),
        ["dataset has no rows"]
    );
}

#[tokio::test]
async fn test_fetch_pages_offset_beyond_end() {
    let transport = Arc::new(MockTransport::with_rows(10));
    let planner = planner(query().offset(50).build().unwrap(), &transport);

    let records = planner.fetch_pages(10).unwrap().collect_records().await.unwrap();
    assert!(records.is_empty());
    assert!(transport.windows().is_empty());
}

#[tokio::test]
async fn test_fetch_pages_rejects_zero_page_size() {
    let transport = Arc::new(MockTransport::with_rows(10));
    let planner = planner(query().build().unwrap(), &transport);

    let err = planner.fetch_pages(0).unwrap_err();
    assert!(err.is_configuration());
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_fetch_pages_is_lazy() {
    let transport = Arc::new(MockTransport::with_rows(30));
    let planner = planner(query().build().unwrap(), &transport);

    let mut pages = planner.fetch_pages(10).unwrap();
    assert!(transport.requests().is_empty());
    assert_eq!(pages.total_rows(), None);

    pages.next_page().await.unwrap().unwrap();
    assert_eq!(transport.requests().len(), 2);

    pages.next_page().await.unwrap().unwrap();
    assert_eq!(transport.requests().len(), 3);

    // Abandoning the sequence issues nothing further
    drop(pages);
    assert_eq!(transport.requests().len(), 3);
}

#[tokio::test]
async fn test_fetch_pages_reports_progress() {
    let transport = Arc::new(MockTransport::with_rows(15));
    let (planner, observer) = observed(query().build().unwrap(), &transport);

    planner.fetch_pages(10).unwrap().collect_records().await.unwrap();

    let progress = observer.progress.lock().unwrap();
    assert_eq!(
        progress.as_slice(),
        [
            "Downloading dataset data.cdc.gov abc123: 15 rows in 2 page(s) of at most 10 rows each...",
            "  Downloading page 1/2",
            "  Downloading page 2/2",
        ]
    );
}

#[tokio::test]
async fn test_fetch_pages_stops_after_request_error() {
    let transport = Arc::new(MockTransport {
        fail_on: Some((2, 500)),
        ..MockTransport::with_rows(30)
    });
    let planner = planner(query().build().unwrap(), &transport);

    let mut pages = planner.fetch_pages(10).unwrap();
    let first = pages.next_page().await.unwrap().unwrap();
    assert_eq!(first.len(), 10);

    let err = pages.next_page().await.unwrap_err();
    assert!(matches!(err, Error::Request { status: 500, .. }));

    // The sequence is finished; no further requests are made
    assert!(pages.next_page().await.unwrap().is_none());
    assert_eq!(transport.requests().len(), 3);
}

#[tokio::test]
async fn test_fetch_pages_count_failure() {
    let transport = Arc::new(MockTransport {
        fail_on: Some((0, 403)),
        ..MockTransport::with_rows(30)
    });
    let planner = planner(query().build().unwrap(), &transport);

    let mut pages = planner.fetch_pages(10).unwrap();
    assert!(pages.next_page().await.is_err());
    assert!(pages.is_done());
    assert!(pages.next_page().await.unwrap().is_none());
}

#[tokio::test]
async fn test_fetch_pages_detects_count_mismatch() {
    // The count claims more rows than the server serves
    let transport = Arc::new(MockTransport {
        reported_count: Some(json!("25")),
        ..MockTransport::with_rows(20)
    });
    let planner = planner(query().build().unwrap(), &transport);

    let mut pages = planner.fetch_pages(10).unwrap();
    assert_eq!(pages.next_page().await.unwrap().unwrap().len(), 10);
    assert_eq!(pages.next_page().await.unwrap().unwrap().len(), 10);

    let err = pages.next_page().await.unwrap_err();
    assert!(matches!(err, Error::PaginationInvariant { .. }));
}

#[tokio::test]
async fn test_fetch_pages_into_stream() {
    let transport = Arc::new(MockTransport::with_rows(23));
    let planner = planner(query().build().unwrap(), &transport);

    let pages: Vec<Page> = planner
        .fetch_pages(10)
        .unwrap()
        .into_stream()
        .try_collect()
        .await
        .unwrap();

    assert_eq!(pages.iter().map(Vec::len).collect::<Vec<_>>(), vec![10, 10, 3]);
    assert_eq!(pages.concat(), transport.rows);
}
