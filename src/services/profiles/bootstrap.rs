//! Startup creation of a missing profile table.

use serde_json::json;
use tracing::{info, warn};

use super::probe::{SchemaState, probe};
use crate::store::RecordStore;

/// Call `function` once if the profile table is missing, then probe again.
///
/// Any state other than `Missing` is returned without calling anything. A
/// failed call is logged and the table stays missing; the rest of the
/// service already degrades around that.
pub async fn bootstrap_profile_store(store: &dyn RecordStore, function: &str) -> SchemaState {
    let state = probe(store).await;
    if state != SchemaState::Missing {
        return state;
    }

    info!(
        table = store.table(),
        function, "Profile table missing, calling bootstrap procedure"
    );
    if let Err(failure) = store.rpc(function, json!({})).await {
        warn!(
            table = store.table(),
            function,
            error = %failure,
            "Bootstrap procedure failed"
        );
        return SchemaState::Missing;
    }

    let state = probe(store).await;
    if state == SchemaState::Missing {
        warn!(
            table = store.table(),
            function, "Bootstrap procedure ran but the table is still missing"
        );
    }
    state
}
