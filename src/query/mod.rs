//! Query module
//!
//! Query definitions and the clause payloads derived from them.
//!
//! Only `$select`, `$where`, `$limit` and `$offset` are supported.
//! `$group`, `$having` and `$order` are rejected when parsing raw clause keys.

mod payload;
mod types;

pub use payload::{render_select, ClausePayload, COUNT_FIELD, COUNT_SELECT};
pub use types::{
    validate_column, Clause, QueryDefinition, QueryDefinitionBuilder, FORBIDDEN_COLUMN_CHARS,
};
