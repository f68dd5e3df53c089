//! Pagination module
//!
//! Row accounting for paged downloads.
//!
//! # Overview
//!
//! A paged download first asks the server how many rows match the query,
//! then:
//! - `RowCount` applies the query's own `$offset`/`$limit` to that count
//! - `PagePlan` splits the remaining rows into fixed-size `RowWindow`s
//! - each window becomes one request with `$offset`/`$limit` derived from it

mod types;

pub use types::{ceil_div, PagePlan, RowCount, RowCountWarning, RowWindow};
