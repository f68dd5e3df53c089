// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::needless_pass_by_value)]

//! # soda-query
//!
//! Query builder and paginator for Socrata open-data (SODA) REST endpoints.
//!
//! ## Features
//!
//! - **Validated queries**: `$select`, `$where`, `$limit` and `$offset`, checked before any request
//! - **Row accounting**: the effective row count after offset and limit, with warnings instead of errors
//! - **Lazy pagination**: fixed-size pages fetched one at a time, strictly in order
//! - **Pluggable transport**: any `Transport` implementation, reqwest by default
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use soda_query::{HttpClientConfig, QueryDefinition, QueryPlanner, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let query = QueryDefinition::builder("data.cdc.gov", "abcd-1234")
//!         .select_columns(["state", "cases"])
//!         .where_clause("cases > 0")
//!         .build()?;
//!
//!     let planner = QueryPlanner::with_http(query, HttpClientConfig::default())?;
//!     println!("{} rows", planner.count_effective_rows().await?);
//!
//!     let mut pages = planner.fetch_pages(10_000)?;
//!     while let Some(page) = pages.next_page().await? {
//!         // Process records
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        QueryPlanner                          │
//! │  count_effective_rows()   fetch_all()   fetch_pages() → Pages│
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//! ┌──────────────┬──────────────┴───┬──────────────┬─────────────┐
//! │    Query     │    Pagination    │     HTTP     │  Observer   │
//! ├──────────────┼──────────────────┼──────────────┼─────────────┤
//! │ Definition   │ RowCount         │ Transport    │ Progress    │
//! │ Clause       │ PagePlan         │ HttpClient   │ Warnings    │
//! │ ClausePayload│ RowWindow        │ Rate Limit   │             │
//! └──────────────┴──────────────────┴──────────────┴─────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the crate
pub mod error;

/// Common types and type aliases
pub mod types;

/// Query definitions and clause payloads
pub mod query;

/// Row accounting and page planning
pub mod pagination;

/// HTTP transport
pub mod http;

/// Query planner and page sequence
pub mod planner;

/// Query file configuration
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::QueryConfig;
pub use http::{HttpClient, HttpClientConfig, Transport};
pub use planner::{NoopObserver, Pages, QueryObserver, QueryPlanner, TracingObserver};
pub use query::{Clause, ClausePayload, QueryDefinition};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
