//! Profile table existence probe.

use tracing::{debug, warn};

use super::KEY_COLUMN;
use crate::store::{RecordStore, SelectQuery};

/// What a minimal read says about the profile table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaState {
    /// Readable, at least one row.
    Exists,
    /// Readable, no rows yet.
    Empty,
    /// The table does not exist.
    Missing,
    /// Any other failure, with the backend's detail.
    Error(String),
}

impl SchemaState {
    /// Reads and writes can be attempted. Row count does not matter.
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Exists | Self::Empty)
    }
}

/// Read at most one key from the profile table and classify the outcome.
///
/// Never retries; a failed probe is reported and the caller decides.
pub async fn probe(store: &dyn RecordStore) -> SchemaState {
    match store
        .select(&SelectQuery::columns(&[KEY_COLUMN]).limit(1))
        .await
    {
        Ok(rows) if rows.is_empty() => SchemaState::Empty,
        Ok(_) => SchemaState::Exists,
        Err(failure) if failure.is_missing_relation() => {
            debug!(table = store.table(), "Profile table does not exist");
            SchemaState::Missing
        }
        Err(failure) => {
            warn!(table = store.table(), error = %failure, "Profile table probe failed");
            SchemaState::Error(failure.detail())
        }
    }
}
