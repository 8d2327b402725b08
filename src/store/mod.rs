//! Record store abstraction over the hosted table API.
//!
//! The profile table's shape is not known ahead of time, so rows travel as
//! JSON objects and failures carry the backend's own error text. Callers
//! that need to reason about the schema do so through [`ColumnErrorParser`],
//! which each store supplies for its backend's error grammar.

pub mod memory;
pub mod rest;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::services::profiles::columns::{ColumnErrorParser, PostgresErrorGrammar};

pub use memory::{MemoryStore, RecordedWrite};
pub use rest::RestStore;

/// A single table row as returned by the backend.
pub type Row = Map<String, Value>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreFailure>;

/// Postgres: relation does not exist.
pub const UNDEFINED_TABLE: &str = "42P01";
/// Postgres: column does not exist.
pub const UNDEFINED_COLUMN: &str = "42703";
/// Postgres: unique constraint violation.
pub const UNIQUE_VIOLATION: &str = "23505";
/// Postgres: check constraint violation.
pub const CHECK_VIOLATION: &str = "23514";
/// PostgREST: table not present in the schema cache.
pub const TABLE_NOT_IN_CACHE: &str = "PGRST205";
/// PostgREST: column not present in the schema cache.
pub const COLUMN_NOT_IN_CACHE: &str = "PGRST204";
/// PostgREST: function not present in the schema cache.
pub const FUNCTION_NOT_IN_CACHE: &str = "PGRST202";

/// Error reported by the backend (or the transport in front of it).
///
/// Mirrors the PostgREST error body: `{code, message, details, hint}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct StoreFailure {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl StoreFailure {
    /// Failure with a backend error code.
    pub fn with_code(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.to_string()),
            message: message.into(),
            details: None,
            hint: None,
        }
    }

    /// Transport or decoding failure with no backend code.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            details: None,
            hint: None,
        }
    }

    /// Message and details joined, which is what the column grammar scans.
    pub fn detail(&self) -> String {
        match &self.details {
            Some(details) if !details.is_empty() => format!("{} ({})", self.message, details),
            _ => self.message.clone(),
        }
    }

    /// True when the failure says the table itself does not exist.
    pub fn is_missing_relation(&self) -> bool {
        if matches!(
            self.code.as_deref(),
            Some(UNDEFINED_TABLE) | Some(TABLE_NOT_IN_CACHE)
        ) {
            return true;
        }
        let msg = self.message.to_lowercase();
        // `column "x" of relation "y" does not exist` is a column error.
        (msg.contains("relation") && msg.contains("does not exist") && !msg.contains("column"))
            || msg.contains("could not find the table")
    }

    /// True when an insert lost a race against an existing row.
    pub fn is_conflict(&self) -> bool {
        if self.code.as_deref() == Some(UNIQUE_VIOLATION) {
            return true;
        }
        let msg = self.message.to_lowercase();
        msg.contains("duplicate key") || msg.contains("already exists")
    }
}

/// Row filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = value`
    Eq(String, Value),
    /// Case-insensitive substring match: `column ILIKE %needle%`
    Contains(String, String),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self::Eq(column.to_string(), value.into())
    }

    pub fn contains(column: &str, needle: &str) -> Self {
        Self::Contains(column.to_string(), needle.to_string())
    }

    pub fn column(&self) -> &str {
        match self {
            Self::Eq(c, _) | Self::Contains(c, _) => c,
        }
    }
}

/// Column selection for a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Columns {
    All,
    Named(Vec<String>),
}

/// A bounded, optionally ordered read.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub columns: Columns,
    pub filters: Vec<Filter>,
    /// Column to sort by, newest first.
    pub order_desc: Option<String>,
    pub limit: Option<usize>,
}

impl SelectQuery {
    /// `SELECT *`
    pub fn all() -> Self {
        Self {
            columns: Columns::All,
            filters: Vec::new(),
            order_desc: None,
            limit: None,
        }
    }

    /// `SELECT <columns>`
    pub fn columns<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            columns: Columns::Named(columns.iter().map(|c| c.as_ref().to_string()).collect()),
            ..Self::all()
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.order_desc = Some(column.to_string());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// The operations the profile core needs from a table backend.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Name of the table this store reads and writes.
    fn table(&self) -> &str;

    /// Error grammar used to read unknown-column reports out of failures.
    fn column_parser(&self) -> &dyn ColumnErrorParser {
        &PostgresErrorGrammar
    }

    async fn select(&self, query: &SelectQuery) -> StoreResult<Vec<Row>>;

    async fn insert(&self, row: Row) -> StoreResult<()>;

    /// Patch every row matching `filter`. Returns the number of rows changed.
    async fn update(&self, filter: &Filter, patch: Row) -> StoreResult<usize>;

    /// Call a server-side procedure that returns rows.
    async fn rpc(&self, function: &str, args: Value) -> StoreResult<Vec<Row>>;
}
