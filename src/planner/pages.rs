//! Lazy page sequence
//!
//! `Pages` runs the row count query on first use, then issues one request per
//! page, each only when the caller asks for it. It is forward-only: once it
//! finishes (or fails) it yields nothing more.

use super::QueryPlanner;
use crate::error::Result;
use crate::pagination::PagePlan;
use crate::types::{Page, Record};
use futures::stream::{self, Stream};

#[derive(Debug, Clone, Copy)]
enum PagesState {
    NotStarted,
    Paging { next: u64 },
    Done,
}

/// Forward-only sequence of pages produced by [`QueryPlanner::fetch_pages`]
#[derive(Debug)]
pub struct Pages<'a> {
    planner: &'a QueryPlanner,
    page_size: u64,
    state: PagesState,
    /// Set once the row count is known
    plan: Option<PagePlan>,
}

impl<'a> Pages<'a> {
    pub(super) fn new(planner: &'a QueryPlanner, page_size: u64) -> Self {
        Self {
            planner,
            page_size,
            state: PagesState::NotStarted,
            plan: None,
        }
    }

    /// Rows that will be fetched, known once the first page was requested
    pub fn total_rows(&self) -> Option<u64> {
        self.plan.map(|plan| plan.total_rows())
    }

    /// Number of pages, known once the first page was requested
    pub fn page_count(&self) -> Option<u64> {
        self.plan.map(|plan| plan.page_count())
    }

    /// Maximum rows per page
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// True once the sequence is exhausted or failed
    pub fn is_done(&self) -> bool {
        matches!(self.state, PagesState::Done)
    }

    /// Fetch the next page
    ///
    /// Returns `Ok(None)` when all pages were produced. An error ends the
    /// sequence; pages returned before it remain valid.
    pub async fn next_page(&mut self) -> Result<Option<Page>> {
        if matches!(self.state, PagesState::NotStarted) {
            if let Err(e) = self.start().await {
                self.state = PagesState::Done;
                return Err(e);
            }
        }

        let step = match (&mut self.state, self.plan) {
            (PagesState::Paging { next }, Some(plan)) => {
                let window = plan.window(*next);
                *next += 1;
                window.map(|window| (window, *next, plan.page_count()))
            }
            _ => None,
        };

        let Some((window, page_number, page_count)) = step else {
            self.state = PagesState::Done;
            return Ok(None);
        };

        self.planner
            .observer
            .on_progress(&format!("  Downloading page {page_number}/{page_count}"));

        match self.planner.fetch_range(window.start(), window.end()).await {
            Ok(page) => Ok(Some(page)),
            Err(e) => {
                self.state = PagesState::Done;
                Err(e)
            }
        }
    }

    /// Consume the sequence as a `Stream` of pages
    pub fn into_stream(self) -> impl Stream<Item = Result<Page>> + 'a {
        stream::unfold(self, |mut pages| async move {
            match pages.next_page().await {
                Ok(Some(page)) => Some((Ok(page), pages)),
                Ok(None) => None,
                Err(e) => Some((Err(e), pages)),
            }
        })
    }

    /// Fetch every remaining page and concatenate the records
    pub async fn collect_records(mut self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(page) = self.next_page().await? {
            records.extend(page);
        }
        Ok(records)
    }

    async fn start(&mut self) -> Result<()> {
        let total = self.planner.count_effective_rows().await?;
        let plan = PagePlan::new(total, self.page_size)?;
        let definition = self.planner.definition();

        self.planner.observer.on_progress(&format!(
            "Downloading dataset {} {}: {} rows in {} page(s) of at most {} rows each...",
            definition.domain(),
            definition.dataset_id(),
            plan.total_rows(),
            plan.page_count(),
            plan.page_size()
        ));

        self.plan = Some(plan);
        self.state = PagesState::Paging { next: 0 };
        Ok(())
    }
}
