//! Clause payload construction
//!
//! Turns a `QueryDefinition` (plus an optional row window) into the
//! `$`-prefixed query parameters of one request.

use super::types::{validate_column, Clause, QueryDefinition};
use crate::error::Result;
use crate::pagination::RowWindow;
use std::collections::BTreeMap;

/// `$select` expression used by row count queries
pub const COUNT_SELECT: &str = "count(:id)";

/// Field holding the result of [`COUNT_SELECT`]
pub const COUNT_FIELD: &str = "count_id";

/// Query parameters for a single request, keyed by clause
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClausePayload {
    clauses: BTreeMap<Clause, String>,
}

impl ClausePayload {
    /// Build the payload for a data request
    ///
    /// Without a window the definition's own `$limit`/`$offset` are used.
    /// With a window, `$offset` is shifted by the window start and `$limit`
    /// becomes the window length. `$offset` is always present.
    pub fn build(definition: &QueryDefinition, window: Option<RowWindow>) -> Result<Self> {
        let mut payload = Self::default();

        if let Some(columns) = definition.select() {
            payload.insert(Clause::Select, render_select(columns)?);
        }
        if let Some(expression) = definition.where_clause() {
            payload.insert(Clause::Where, expression);
        }

        match window {
            Some(window) => {
                payload.insert(Clause::Limit, window.len().to_string());
                payload.insert(
                    Clause::Offset,
                    window.absolute_offset(definition.offset())?.to_string(),
                );
            }
            None => {
                if let Some(limit) = definition.limit() {
                    payload.insert(Clause::Limit, limit.to_string());
                }
                payload.insert(Clause::Offset, definition.offset().to_string());
            }
        }

        Ok(payload)
    }

    /// Build the payload for a row count request
    pub fn count(definition: &QueryDefinition) -> Self {
        let mut payload = Self::default();
        payload.insert(Clause::Select, COUNT_SELECT);
        if let Some(expression) = definition.where_clause() {
            payload.insert(Clause::Where, expression);
        }
        payload.insert(Clause::Limit, "1");
        payload
    }

    /// Value of a clause, if present
    pub fn get(&self, clause: Clause) -> Option<&str> {
        self.clauses.get(&clause).map(String::as_str)
    }

    /// `(keyword, value)` pairs in clause order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.clauses
            .iter()
            .map(|(clause, value)| (clause.keyword(), value.as_str()))
    }

    /// Number of clauses set
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// True if no clause is set
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    fn insert(&mut self, clause: Clause, value: impl Into<String>) {
        self.clauses.insert(clause, value.into());
    }
}

/// Render a `$select` clause: each column validated, double-quoted and comma-joined
pub fn render_select<S: AsRef<str>>(columns: &[S]) -> Result<String> {
    let mut rendered = Vec::with_capacity(columns.len());
    for column in columns {
        let column = column.as_ref();
        validate_column(column)?;
        rendered.push(format!("\"{column}\""));
    }
    Ok(rendered.join(","))
}
