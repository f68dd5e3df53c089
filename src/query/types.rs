//! Query definition types
//!
//! A `QueryDefinition` is the validated, immutable description of one query
//! against one dataset. It can only be obtained through the builder (or a raw
//! clause map), so every instance upholds the clause invariants.

use crate::error::{Error, Result};
use crate::types::JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Characters that would break the `$select` clause syntax
pub const FORBIDDEN_COLUMN_CHARS: [char; 3] = [',', '"', '\''];

/// Characters not allowed in a dataset identifier (it becomes a path segment)
const FORBIDDEN_DATASET_CHARS: [char; 4] = ['/', '?', '#', '%'];

// ============================================================================
// Clause keywords
// ============================================================================

/// Supported SoQL clause keywords
///
/// `$group`, `$having` and `$order` exist on the platform but are rejected:
/// they either change the row count semantics or collide with pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Clause {
    /// `$select`
    Select,
    /// `$where`
    Where,
    /// `$limit`
    Limit,
    /// `$offset`
    Offset,
}

impl Clause {
    /// All supported clauses, in payload order
    pub const ALL: [Clause; 4] = [Clause::Select, Clause::Where, Clause::Limit, Clause::Offset];

    /// The `$`-prefixed query parameter name
    pub fn keyword(self) -> &'static str {
        match self {
            Clause::Select => "$select",
            Clause::Where => "$where",
            Clause::Limit => "$limit",
            Clause::Offset => "$offset",
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for Clause {
    type Err = Error;

    /// Parse a clause key, with or without the leading `$`
    fn from_str(key: &str) -> Result<Self> {
        let name = key.trim().trim_start_matches('$').to_ascii_lowercase();
        match name.as_str() {
            "select" => Ok(Clause::Select),
            "where" => Ok(Clause::Where),
            "limit" => Ok(Clause::Limit),
            "offset" => Ok(Clause::Offset),
            "group" | "having" | "order" => Err(Error::unsupported_clause(format!("${name}"))),
            _ => Err(Error::config(format!(
                "Invalid clause key '{key}'. Supported keys are: {}",
                Clause::ALL.map(Clause::keyword).join(", ")
            ))),
        }
    }
}

// ============================================================================
// Query definition
// ============================================================================

/// Immutable description of a query against one dataset
#[derive(Clone, PartialEq, Eq)]
pub struct QueryDefinition {
    domain: String,
    dataset_id: String,
    select: Option<Vec<String>>,
    where_clause: Option<String>,
    limit: Option<u64>,
    offset: u64,
    app_token: Option<String>,
}

impl QueryDefinition {
    /// Start building a query for `dataset_id` hosted on `domain`
    pub fn builder(
        domain: impl Into<String>,
        dataset_id: impl Into<String>,
    ) -> QueryDefinitionBuilder {
        QueryDefinitionBuilder::new(domain, dataset_id)
    }

    /// Build a query from a raw `$`-keyed clause map
    pub fn from_clauses(
        domain: impl Into<String>,
        dataset_id: impl Into<String>,
        clauses: &BTreeMap<String, JsonValue>,
    ) -> Result<Self> {
        Self::builder(domain, dataset_id).clauses(clauses)?.build()
    }

    /// Host name of the data portal
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Dataset identifier (e.g. `abcd-1234`)
    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    /// Selected columns, if any
    pub fn select(&self) -> Option<&[String]> {
        self.select.as_deref()
    }

    /// Filter expression, if any
    pub fn where_clause(&self) -> Option<&str> {
        self.where_clause.as_deref()
    }

    /// Maximum number of rows to return
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Number of rows to skip
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Application token sent with every request
    pub fn app_token(&self) -> Option<&str> {
        self.app_token.as_deref()
    }

    /// Resource endpoint for the dataset
    pub fn resource_url(&self) -> String {
        format!("https://{}/resource/{}.json", self.domain, self.dataset_id)
    }

    fn validate(&self) -> Result<()> {
        if self.domain.trim().is_empty() {
            return Err(Error::config("Domain cannot be empty"));
        }
        url::Host::parse(&self.domain)
            .map_err(|e| Error::config(format!("Invalid domain '{}': {e}", self.domain)))?;

        if self.dataset_id.trim().is_empty() {
            return Err(Error::config("Dataset id cannot be empty"));
        }
        if self
            .dataset_id
            .chars()
            .any(|c| c.is_whitespace() || FORBIDDEN_DATASET_CHARS.contains(&c))
        {
            return Err(Error::config(format!(
                "Invalid dataset id '{}'",
                self.dataset_id
            )));
        }

        if self.limit == Some(0) {
            return Err(Error::config("limit must be a positive integer"));
        }

        if let Some(columns) = &self.select {
            if columns.is_empty() {
                return Err(Error::config("select list cannot be empty"));
            }
            for column in columns {
                validate_column(column)?;
            }
        }

        Ok(())
    }
}

impl fmt::Debug for QueryDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryDefinition")
            .field("domain", &self.domain)
            .field("dataset_id", &self.dataset_id)
            .field("select", &self.select)
            .field("where_clause", &self.where_clause)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .field("app_token", &self.app_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Check that a column name can be safely embedded in a `$select` clause
pub fn validate_column(column: &str) -> Result<()> {
    if column.trim().is_empty() {
        return Err(Error::invalid_column(column, "column name is empty"));
    }
    if let Some(c) = column.chars().find(|c| FORBIDDEN_COLUMN_CHARS.contains(c)) {
        return Err(Error::invalid_column(
            column,
            format!("contains forbidden character {c:?}"),
        ));
    }
    Ok(())
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`QueryDefinition`]
#[derive(Debug, Clone)]
pub struct QueryDefinitionBuilder {
    definition: QueryDefinition,
}

impl QueryDefinitionBuilder {
    fn new(domain: impl Into<String>, dataset_id: impl Into<String>) -> Self {
        Self {
            definition: QueryDefinition {
                domain: domain.into(),
                dataset_id: dataset_id.into(),
                select: None,
                where_clause: None,
                limit: None,
                offset: 0,
                app_token: None,
            },
        }
    }

    /// Select a single column
    #[must_use]
    pub fn select(mut self, column: impl Into<String>) -> Self {
        self.definition.select = Some(vec![column.into()]);
        self
    }

    /// Select an ordered list of columns
    #[must_use]
    pub fn select_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.definition.select = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Set the filter expression
    #[must_use]
    pub fn where_clause(mut self, expression: impl Into<String>) -> Self {
        self.definition.where_clause = Some(expression.into());
        self
    }

    /// Limit the number of returned rows
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.definition.limit = Some(limit);
        self
    }

    /// Skip the first `offset` rows
    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.definition.offset = offset;
        self
    }

    /// Set the application token
    #[must_use]
    pub fn app_token(mut self, token: impl Into<String>) -> Self {
        self.definition.app_token = Some(token.into());
        self
    }

    /// Apply a raw `$`-keyed clause map
    ///
    /// Values may be strings or numbers; `$select` also accepts a list of
    /// column names.
    pub fn clauses(mut self, clauses: &BTreeMap<String, JsonValue>) -> Result<Self> {
        for (key, value) in clauses {
            match key.parse::<Clause>()? {
                Clause::Select => {
                    self.definition.select = Some(select_from_value(key, value)?);
                }
                Clause::Where => {
                    let JsonValue::String(expression) = value else {
                        return Err(Error::config(format!("{key} must be a string")));
                    };
                    self.definition.where_clause = Some(expression.clone());
                }
                Clause::Limit => {
                    let limit = integer_from_value(key, value)?;
                    if limit <= 0 {
                        return Err(Error::config(format!(
                            "limit must be a positive integer, got {limit}"
                        )));
                    }
                    self.definition.limit = Some(limit as u64);
                }
                Clause::Offset => {
                    let offset = integer_from_value(key, value)?;
                    if offset < 0 {
                        return Err(Error::config(format!(
                            "offset must be non-negative, got {offset}"
                        )));
                    }
                    self.definition.offset = offset as u64;
                }
            }
        }
        Ok(self)
    }

    /// Validate and build the definition
    pub fn build(self) -> Result<QueryDefinition> {
        self.definition.validate()?;
        Ok(self.definition)
    }
}

fn select_from_value(key: &str, value: &JsonValue) -> Result<Vec<String>> {
    match value {
        JsonValue::String(column) => Ok(vec![column.clone()]),
        JsonValue::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| Error::config(format!("{key} entries must be strings")))
            })
            .collect(),
        _ => Err(Error::config(format!(
            "{key} must be a column name or a list of column names"
        ))),
    }
}

fn integer_from_value(key: &str, value: &JsonValue) -> Result<i64> {
    match value {
        JsonValue::Number(n) => n
            .as_i64()
            .ok_or_else(|| Error::config(format!("{key} must be an integer, got {n}"))),
        JsonValue::String(s) => s
            .trim()
            .parse()
            .map_err(|_| Error::config(format!("{key} must be an integer, got '{s}'"))),
        other => Err(Error::config(format!(
            "{key} must be an integer, got {other}"
        ))),
    }
}
