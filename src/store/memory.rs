//! In-memory record store.
//!
//! Behaves like a PostgREST table closely enough for development without a
//! hosted project and for tests: it reports a missing table, unknown columns
//! (one per response, as Postgres does), unique violations on the identity
//! key and unknown procedures with the same codes and messages the real
//! backend uses.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use super::{
    CHECK_VIOLATION, COLUMN_NOT_IN_CACHE, Columns, FUNCTION_NOT_IN_CACHE, Filter, RecordStore, Row, SelectQuery,
    StoreFailure, StoreResult, UNDEFINED_COLUMN, UNDEFINED_TABLE, UNIQUE_VIOLATION,
};
use crate::services::profiles::KEY_COLUMN;

/// Columns a fully migrated profile table has.
pub const FULL_PROFILE_COLUMNS: &[&str] = &[
    "id",
    "user_id",
    "username",
    "avatar_url",
    "role",
    "created_at",
    "updated_at",
    "member_since",
];

/// A write the store accepted, kept for inspection.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedWrite {
    Insert(Row),
    Update(Row),
}

impl RecordedWrite {
    pub fn row(&self) -> &Row {
        match self {
            Self::Insert(row) | Self::Update(row) => row,
        }
    }
}

#[derive(Debug)]
struct MemoryState {
    table_exists: bool,
    columns: BTreeSet<String>,
    rows: Vec<Row>,
    search_function: Option<String>,
    bootstrap_function: Option<String>,
    rejected_insert_columns: BTreeSet<String>,
    rpc_calls: Vec<String>,
    failure: Option<StoreFailure>,
    writes: Vec<RecordedWrite>,
}

/// Shared in-memory profile table.
#[derive(Debug)]
pub struct MemoryStore {
    table: String,
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// A fully migrated, empty table without a search procedure.
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            state: Mutex::new(MemoryState {
                table_exists: true,
                columns: FULL_PROFILE_COLUMNS.iter().map(|c| c.to_string()).collect(),
                rows: Vec::new(),
                search_function: None,
                bootstrap_function: None,
                rejected_insert_columns: BTreeSet::new(),
                rpc_calls: Vec::new(),
                failure: None,
                writes: Vec::new(),
            }),
        }
    }

    /// The table has not been created.
    pub fn without_table(self) -> Self {
        self.state().table_exists = false;
        self
    }

    /// Restrict the table to the given columns. The identity key is always kept.
    pub fn with_columns(self, columns: &[&str]) -> Self {
        {
            let mut state = self.state();
            state.columns = columns.iter().map(|c| c.to_string()).collect();
            state.columns.insert(KEY_COLUMN.to_string());
        }
        self
    }

    /// Install a server-side search procedure under `name`.
    pub fn with_search_function(self, name: &str) -> Self {
        self.state().search_function = Some(name.to_string());
        self
    }

    /// Install a procedure under `name` that creates the table when called.
    pub fn with_bootstrap_function(self, name: &str) -> Self {
        self.state().bootstrap_function = Some(name.to_string());
        self
    }

    /// Reject inserts carrying any of `columns` with a check violation.
    ///
    /// The columns stay readable and updatable.
    pub fn reject_inserts_with(self, columns: &[&str]) -> Self {
        self.state().rejected_insert_columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Seed a row as-is, bypassing column checks.
    pub fn with_row(self, row: Row) -> Self {
        self.state().rows.push(row);
        self
    }

    /// Fail every subsequent operation with `failure`.
    pub fn fail_with(&self, failure: StoreFailure) {
        self.state().failure = Some(failure);
    }

    /// Snapshot of all rows.
    pub fn rows(&self) -> Vec<Row> {
        self.state().rows.clone()
    }

    /// Every accepted write, oldest first.
    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.state().writes.clone()
    }

    /// Names of every procedure called, oldest first.
    pub fn rpc_calls(&self) -> Vec<String> {
        self.state().rpc_calls.clone()
    }

    /// Number of accepted inserts.
    pub fn insert_count(&self) -> usize {
        self.state()
            .writes
            .iter()
            .filter(|w| matches!(w, RecordedWrite::Insert(_)))
            .count()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn missing_table(&self) -> StoreFailure {
        StoreFailure::with_code(
            UNDEFINED_TABLE,
            format!("relation \"public.{}\" does not exist", self.table),
        )
    }

    fn unknown_column(&self, column: &str) -> StoreFailure {
        StoreFailure::with_code(
            UNDEFINED_COLUMN,
            format!("column {}.{} does not exist", self.table, column),
        )
    }

    fn unknown_write_column(&self, column: &str) -> StoreFailure {
        StoreFailure::with_code(
            COLUMN_NOT_IN_CACHE,
            format!(
                "Could not find the '{}' column of '{}' in the schema cache",
                column, self.table
            ),
        )
    }

    /// Common preconditions: injected failure, then table existence.
    fn check(&self, state: &MemoryState) -> StoreResult<()> {
        if let Some(failure) = &state.failure {
            return Err(failure.clone());
        }
        if !state.table_exists {
            return Err(self.missing_table());
        }
        Ok(())
    }

    fn check_filter(&self, state: &MemoryState, filter: &Filter) -> StoreResult<()> {
        if state.columns.contains(filter.column()) {
            Ok(())
        } else {
            Err(self.unknown_column(filter.column()))
        }
    }
}

fn matches(row: &Row, filter: &Filter) -> bool {
    match filter {
        Filter::Eq(column, value) => row.get(column) == Some(value),
        Filter::Contains(column, needle) => row
            .get(column)
            .and_then(Value::as_str)
            .is_some_and(|v| v.to_lowercase().contains(&needle.to_lowercase())),
    }
}

fn sort_key(row: &Row, column: &str) -> Option<String> {
    row.get(column).and_then(|v| match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    })
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn table(&self) -> &str {
        &self.table
    }

    async fn select(&self, query: &SelectQuery) -> StoreResult<Vec<Row>> {
        // Let concurrent callers interleave between round trips.
        tokio::task::yield_now().await;
        let state = self.state();
        self.check(&state)?;

        if let Columns::Named(columns) = &query.columns
            && let Some(unknown) = columns.iter().find(|c| !state.columns.contains(*c))
        {
            return Err(self.unknown_column(unknown));
        }
        for filter in &query.filters {
            self.check_filter(&state, filter)?;
        }
        if let Some(order) = &query.order_desc
            && !state.columns.contains(order)
        {
            return Err(self.unknown_column(order));
        }

        let mut rows: Vec<Row> = state
            .rows
            .iter()
            .filter(|row| query.filters.iter().all(|f| matches(row, f)))
            .cloned()
            .collect();

        if let Some(order) = &query.order_desc {
            // Newest first, rows without a value last.
            rows.sort_by(|a, b| sort_key(b, order).cmp(&sort_key(a, order)));
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        if let Columns::Named(columns) = &query.columns {
            rows = rows
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .filter(|(k, _)| columns.contains(k))
                        .collect()
                })
                .collect();
        }

        Ok(rows)
    }

    async fn insert(&self, mut row: Row) -> StoreResult<()> {
        tokio::task::yield_now().await;
        let mut state = self.state();
        self.check(&state)?;

        if let Some(unknown) = row.keys().find(|k| !state.columns.contains(*k)) {
            return Err(self.unknown_write_column(unknown));
        }

        if let Some(rejected) = row
            .keys()
            .find(|k| state.rejected_insert_columns.contains(*k))
        {
            return Err(StoreFailure::with_code(
                CHECK_VIOLATION,
                format!(
                    "new row for relation \"{}\" violates check constraint \"{}_{}_check\"",
                    self.table, self.table, rejected
                ),
            ));
        }

        if let Some(key) = row.get(KEY_COLUMN)
            && state.rows.iter().any(|r| r.get(KEY_COLUMN) == Some(key))
        {
            return Err(StoreFailure::with_code(
                UNIQUE_VIOLATION,
                format!(
                    "duplicate key value violates unique constraint \"{}_{}_key\"",
                    self.table, KEY_COLUMN
                ),
            ));
        }

        state.writes.push(RecordedWrite::Insert(row.clone()));

        // Column defaults a migrated table would apply.
        let now = Value::String(Utc::now().to_rfc3339());
        if state.columns.contains("id") && !row.contains_key("id") {
            row.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        }
        for column in ["created_at", "member_since"] {
            if state.columns.contains(column) && !row.contains_key(column) {
                row.insert(column.to_string(), now.clone());
            }
        }

        state.rows.push(row);
        Ok(())
    }

    async fn update(&self, filter: &Filter, patch: Row) -> StoreResult<usize> {
        tokio::task::yield_now().await;
        let mut state = self.state();
        self.check(&state)?;
        self.check_filter(&state, filter)?;

        if let Some(unknown) = patch.keys().find(|k| !state.columns.contains(*k)) {
            return Err(self.unknown_write_column(unknown));
        }

        let mut changed = 0;
        for row in state.rows.iter_mut().filter(|r| matches(r, filter)) {
            for (k, v) in &patch {
                row.insert(k.clone(), v.clone());
            }
            changed += 1;
        }

        state.writes.push(RecordedWrite::Update(patch));
        Ok(changed)
    }

    async fn rpc(&self, function: &str, args: Value) -> StoreResult<Vec<Row>> {
        tokio::task::yield_now().await;
        let mut state = self.state();
        if let Some(failure) = &state.failure {
            return Err(failure.clone());
        }
        state.rpc_calls.push(function.to_string());

        if state.bootstrap_function.as_deref() == Some(function) {
            state.table_exists = true;
            return Ok(Vec::new());
        }

        if state.search_function.as_deref() != Some(function) {
            return Err(StoreFailure::with_code(
                FUNCTION_NOT_IN_CACHE,
                format!(
                    "Could not find the function public.{}(search_query) in the schema cache",
                    function
                ),
            ));
        }
        if !state.table_exists {
            return Err(self.missing_table());
        }

        let needle = args
            .get("search_query")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let filter = Filter::contains("username", needle);

        Ok(state
            .rows
            .iter()
            .filter(|row| matches(row, &filter))
            .cloned()
            .collect())
    }
}
