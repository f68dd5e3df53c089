//! Row accounting and page planning
//!
//! Everything here is pure: no I/O, no logging. The planner feeds it the
//! dataset row count and reports whatever warnings it produces.

use crate::error::{Error, Result};
use std::fmt;

/// Integer division rounding towards positive infinity
///
/// `divisor` must be positive.
pub fn ceil_div(dividend: u64, divisor: u64) -> u64 {
    dividend.div_ceil(divisor)
}

// ============================================================================
// Row window
// ============================================================================

/// Inclusive `[start, end]` row range, relative to the offset-adjusted result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowWindow {
    start: u64,
    end: u64,
}

impl RowWindow {
    /// Create a window, failing if `end < start` or its length overflows `u64`
    pub fn new(start: u64, end: u64) -> Result<Self> {
        if end < start {
            return Err(Error::pagination(format!(
                "row window end {end} is before start {start}"
            )));
        }
        if (end - start).checked_add(1).is_none() {
            return Err(Error::pagination(format!(
                "row window {start}..={end} is too large"
            )));
        }
        Ok(Self { start, end })
    }

    /// First row (zero-indexed)
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Last row (zero-indexed, inclusive)
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of rows covered; never zero
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always false, a window covers at least one row
    pub fn is_empty(&self) -> bool {
        false
    }

    /// `$offset` to send, given the query's own offset
    pub fn absolute_offset(&self, base_offset: u64) -> Result<u64> {
        base_offset.checked_add(self.start).ok_or_else(|| {
            Error::pagination(format!(
                "offset {base_offset} plus row {} does not fit in a u64",
                self.start
            ))
        })
    }
}

// ============================================================================
// Effective row count
// ============================================================================

/// Why an effective row count was clamped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowCountWarning {
    /// The dataset (after `$where`) has no rows
    EmptyDataset,
    /// The offset is at or past the last row
    OffsetBeyondEnd {
        /// Rows matched by the query
        dataset_rows: u64,
        /// Requested offset
        offset: u64,
    },
    /// The limit asks for more rows than remain after the offset
    LimitExceedsRemaining {
        /// Requested limit
        limit: u64,
        /// Rows remaining after the offset
        remaining: u64,
    },
}

impl fmt::Display for RowCountWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyDataset => write!(f, "dataset has no rows"),
            Self::OffsetBeyondEnd {
                dataset_rows,
                offset,
            } => write!(
                f,
                "offset exceeds row count: offset {offset}, dataset has {dataset_rows} rows"
            ),
            Self::LimitExceedsRemaining { limit, remaining } => write!(
                f,
                "limit exceeds remaining rows: limit {limit}, {remaining} rows remain after offset"
            ),
        }
    }
}

/// Number of rows a query will actually return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowCount {
    /// Rows that will be fetched
    pub rows: u64,
    /// Set when the count was clamped
    pub warning: Option<RowCountWarning>,
}

impl RowCount {
    /// Apply `offset` and `limit` to the raw dataset row count
    ///
    /// The result is `min(limit, dataset_rows - offset)`, floored at zero.
    pub fn compute(dataset_rows: u64, offset: u64, limit: Option<u64>) -> Self {
        if dataset_rows == 0 {
            return Self::clamped(0, RowCountWarning::EmptyDataset);
        }

        let remaining = dataset_rows.saturating_sub(offset);
        if remaining == 0 {
            return Self::clamped(
                0,
                RowCountWarning::OffsetBeyondEnd {
                    dataset_rows,
                    offset,
                },
            );
        }

        match limit {
            Some(limit) if limit > remaining => Self::clamped(
                remaining,
                RowCountWarning::LimitExceedsRemaining { limit, remaining },
            ),
            Some(limit) => Self::exact(limit),
            None => Self::exact(remaining),
        }
    }

    fn exact(rows: u64) -> Self {
        Self {
            rows,
            warning: None,
        }
    }

    fn clamped(rows: u64, warning: RowCountWarning) -> Self {
        Self {
            rows,
            warning: Some(warning),
        }
    }
}

// ============================================================================
// Page plan
// ============================================================================

/// Partition of `total_rows` into windows of at most `page_size` rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePlan {
    total_rows: u64,
    page_size: u64,
    page_count: u64,
}

impl PagePlan {
    /// Plan pages for `total_rows`; `page_size` must be positive
    pub fn new(total_rows: u64, page_size: u64) -> Result<Self> {
        if page_size == 0 {
            return Err(Error::config("page size must be a positive integer"));
        }
        Ok(Self {
            total_rows,
            page_size,
            page_count: ceil_div(total_rows, page_size),
        })
    }

    /// Rows covered by the plan
    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }

    /// Maximum rows per page
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Number of pages
    pub fn page_count(&self) -> u64 {
        self.page_count
    }

    /// Window for page `index`, or `None` past the last page
    pub fn window(&self, index: u64) -> Option<RowWindow> {
        if index >= self.page_count {
            return None;
        }
        let start = index * self.page_size;
        let end = (index + 1)
            .saturating_mul(self.page_size)
            .saturating_sub(1)
            .min(self.total_rows - 1);
        Some(RowWindow { start, end })
    }

    /// All windows, in order
    pub fn windows(&self) -> impl Iterator<Item = RowWindow> + '_ {
        (0..self.page_count).filter_map(|i| self.window(i))
    }
}
