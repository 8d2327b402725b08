//! Column inference from backend error text.
//!
//! There is no catalog access, so the only way to learn that a column is
//! missing is to ask for it and read the complaint. The grammar is backend
//! specific and sits behind [`ColumnErrorParser`].

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use super::KEY_COLUMN;
use crate::store::{RecordStore, SelectQuery};

/// Extracts the names of unknown columns from an error message.
pub trait ColumnErrorParser: Send + Sync {
    /// Every column the message reports as unknown, in order of appearance.
    fn unknown_columns(&self, detail: &str) -> Vec<String>;
}

/// `column profiles.avatar_url does not exist`
static QUALIFIED_COLUMN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"column\s+"?(?:\w+"?\.)?"?(\w+)"?\s+does not exist"#)
        .expect("qualified column pattern is valid")
});

/// `column "avatar_url" of relation "profiles" does not exist`
static RELATION_COLUMN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"column\s+"(\w+)"\s+of relation\s+"?[\w.]+"?\s+does not exist"#)
        .expect("relation column pattern is valid")
});

/// `Could not find the 'avatar_url' column of 'profiles' in the schema cache`
static SCHEMA_CACHE_COLUMN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)could not find the '(\w+)' column of '[\w.]+' in the schema cache")
        .expect("schema cache column pattern is valid")
});

/// Postgres and PostgREST error messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresErrorGrammar;

impl ColumnErrorParser for PostgresErrorGrammar {
    fn unknown_columns(&self, detail: &str) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        for pattern in [&*QUALIFIED_COLUMN, &*RELATION_COLUMN, &*SCHEMA_CACHE_COLUMN] {
            for captures in pattern.captures_iter(detail) {
                let name = captures[1].to_string();
                if !found.contains(&name) {
                    found.push(name);
                }
            }
        }
        found
    }
}

/// Columns named unknown in `detail`, limited to `candidates`.
pub fn infer_missing_columns<S: AsRef<str>>(detail: &str, candidates: &[S]) -> BTreeSet<String> {
    infer_with(&PostgresErrorGrammar, detail, candidates)
}

/// [`infer_missing_columns`] with an explicit grammar.
pub fn infer_with<S: AsRef<str>>(
    parser: &dyn ColumnErrorParser,
    detail: &str,
    candidates: &[S],
) -> BTreeSet<String> {
    parser
        .unknown_columns(detail)
        .into_iter()
        .filter(|name| candidates.iter().any(|c| c.as_ref() == name))
        .collect()
}

/// Columns known to be absent from the profile table.
///
/// Built fresh for each operation; never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnKnowledge {
    missing: BTreeSet<String>,
}

impl ColumnKnowledge {
    pub fn is_missing(&self, column: &str) -> bool {
        self.missing.contains(column)
    }

    /// Not reported missing. Columns never asked about count as present.
    pub fn has(&self, column: &str) -> bool {
        !self.is_missing(column)
    }

    pub fn missing(&self) -> &BTreeSet<String> {
        &self.missing
    }
}

impl From<BTreeSet<String>> for ColumnKnowledge {
    fn from(missing: BTreeSet<String>) -> Self {
        Self { missing }
    }
}

/// Find which of `candidates` the profile table lacks.
///
/// Postgres names one unknown column per response, so the introspection
/// select is repeated without the columns already found until it succeeds,
/// stops naming new candidates, or nothing is left to ask about. At most
/// `candidates.len() + 1` selects are issued. Any other failure ends
/// discovery with what is known so far.
pub async fn discover_missing_columns(
    store: &dyn RecordStore,
    candidates: &[&str],
) -> ColumnKnowledge {
    let mut missing = BTreeSet::new();

    for _ in 0..=candidates.len() {
        let remaining: Vec<&str> = candidates
            .iter()
            .copied()
            .filter(|c| !missing.contains(*c))
            .collect();
        if remaining.is_empty() {
            break;
        }

        let mut columns = vec![KEY_COLUMN];
        columns.extend(remaining.iter().copied().filter(|c| *c != KEY_COLUMN));

        match store.select(&SelectQuery::columns(&columns).limit(1)).await {
            Ok(_) => break,
            Err(failure) => {
                let found = infer_with(store.column_parser(), &failure.detail(), &remaining);
                if found.is_empty() {
                    warn!(
                        table = store.table(),
                        error = %failure,
                        "Column introspection failed without naming a column"
                    );
                    break;
                }
                debug!(table = store.table(), columns = ?found, "Detected missing columns");
                missing.extend(found);
            }
        }
    }

    ColumnKnowledge::from(missing)
}
