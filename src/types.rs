//! Common types used throughout soda-query
//!
//! Shared type aliases for records and pages as returned by the server.

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// One row of a dataset, keyed by column name
pub type Record = JsonObject;

/// One bounded-size slice of a query's result set
pub type Page = Vec<Record>;

/// Default number of rows requested per page
pub const DEFAULT_PAGE_SIZE: u64 = 10_000;

/// Header carrying the Socrata application token
pub const APP_TOKEN_HEADER: &str = "X-App-Token";
