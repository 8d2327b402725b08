//! Member directory reads.

use serde_json::json;
use tracing::{debug, warn};

use super::columns::discover_missing_columns;
use super::probe::{SchemaState, probe};
use super::{KEY_COLUMN, ProfileError};
use crate::models::{MEMBER_PAGE_LIMIT, Profile, ProfileRole};
use crate::store::{Filter, RecordStore, Row, SelectQuery};

/// Columns the recent-member listing can sort by, in order of preference.
const JOIN_DATE_COLUMNS: &[&str] = &["member_since", "created_at"];

fn profiles(rows: Vec<Row>) -> Vec<Profile> {
    rows.iter()
        .filter_map(Profile::from_row)
        .take(MEMBER_PAGE_LIMIT)
        .collect()
}

fn usable_or_err(state: SchemaState) -> Result<(), ProfileError> {
    match state {
        SchemaState::Exists | SchemaState::Empty => Ok(()),
        SchemaState::Missing => Err(ProfileError::StoreMissing),
        SchemaState::Error(detail) => Err(ProfileError::Store(detail)),
    }
}

/// Newest members first, at most [`MEMBER_PAGE_LIMIT`].
///
/// Sorts by the join date column when the table has one, then by the
/// creation timestamp, and unsorted when it has neither.
pub async fn recent_members(store: &dyn RecordStore) -> Result<Vec<Profile>, ProfileError> {
    usable_or_err(probe(store).await)?;

    let columns = discover_missing_columns(store, JOIN_DATE_COLUMNS).await;
    let mut query = SelectQuery::all().limit(MEMBER_PAGE_LIMIT);
    if let Some(order) = JOIN_DATE_COLUMNS.iter().find(|c| columns.has(c)) {
        query = query.order_desc(order);
    }

    Ok(profiles(store.select(&query).await?))
}

/// Search members by name.
///
/// A blank query is the recent-member listing. Otherwise the server-side
/// search procedure is tried first; when it is not installed (or fails) the
/// username column is matched directly, and when that column is missing too
/// the recent listing is returned. Results never exceed
/// [`MEMBER_PAGE_LIMIT`], even if the procedure ignores the bound.
pub async fn search_members(
    store: &dyn RecordStore,
    function: &str,
    query: &str,
) -> Result<Vec<Profile>, ProfileError> {
    let query = query.trim();
    if query.is_empty() {
        return recent_members(store).await;
    }

    match store.rpc(function, json!({ "search_query": query })).await {
        Ok(rows) => return Ok(profiles(rows)),
        Err(failure) if failure.is_missing_relation() => return Err(ProfileError::StoreMissing),
        Err(failure) => debug!(
            function,
            error = %failure,
            "Search procedure unavailable, matching usernames directly"
        ),
    }

    usable_or_err(probe(store).await)?;

    let columns = discover_missing_columns(store, &["username"]).await;
    if columns.is_missing("username") {
        warn!(table = store.table(), "No username column to search, listing recent members");
        return recent_members(store).await;
    }

    let rows = store
        .select(
            &SelectQuery::all()
                .filter(Filter::contains("username", query))
                .limit(MEMBER_PAGE_LIMIT),
        )
        .await?;
    Ok(profiles(rows))
}

/// Profile of one member. `Ok(None)` when there is no row for them.
pub async fn find_member(
    store: &dyn RecordStore,
    user_id: &str,
) -> Result<Option<Profile>, ProfileError> {
    if user_id.is_empty() {
        return Err(ProfileError::MissingIdentity);
    }

    let rows = store
        .select(
            &SelectQuery::all()
                .filter(Filter::eq(KEY_COLUMN, user_id))
                .limit(1),
        )
        .await?;
    Ok(rows.first().and_then(Profile::from_row))
}

/// Whether the member's profile carries the admin role.
///
/// Any failure to read the profile answers no.
pub async fn is_admin(store: &dyn RecordStore, user_id: &str) -> bool {
    match find_member(store, user_id).await {
        Ok(Some(profile)) => profile.role == ProfileRole::Admin,
        Ok(None) => false,
        Err(err) => {
            debug!(user_id, error = %err, "Admin check could not read profile");
            false
        }
    }
}
