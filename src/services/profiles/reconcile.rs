//! Lazy profile creation.

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use super::columns::{ColumnKnowledge, discover_missing_columns};
use super::probe::{SchemaState, probe};
use super::{KEY_COLUMN, ProfileError};
use crate::models::{ProfileRole, Session};
use crate::store::{Filter, RecordStore, Row, SelectQuery};

/// Optional columns a new profile row is seeded with.
pub const SEED_COLUMNS: &[&str] = &["username", "avatar_url", "role", "created_at", "updated_at"];

/// What reconciliation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// The profile table does not exist; nothing to do.
    Skipped,
    /// A row for this identity was already there. It was not touched.
    AlreadyPresent,
    /// A row was inserted.
    Created,
    /// The insert collided with a row created concurrently.
    RaceLost,
}

impl Reconciled {
    /// True when a profile row exists afterwards.
    pub fn has_row(&self) -> bool {
        !matches!(self, Self::Skipped)
    }
}

/// Identity key plus the hints a new row is filled from.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileSeed<'a> {
    pub user_id: &'a str,
    pub email: Option<&'a str>,
    pub display_name: Option<&'a str>,
    pub avatar_url: Option<&'a str>,
}

impl<'a> ProfileSeed<'a> {
    pub fn new(user_id: &'a str) -> Self {
        Self {
            user_id,
            ..Default::default()
        }
    }

    /// Hints taken from the signed-in user's token.
    pub fn from_session(session: &'a Session) -> Self {
        Self {
            user_id: &session.user_id,
            email: session.email.as_deref(),
            display_name: session.metadata.full_name.as_deref(),
            avatar_url: session.metadata.avatar_url.as_deref(),
        }
    }
}

/// Insert payload holding only columns not known to be missing.
pub fn build_insert_payload(seed: &ProfileSeed<'_>, columns: &ColumnKnowledge) -> Row {
    let mut row = Row::new();
    row.insert(KEY_COLUMN.to_string(), Value::from(seed.user_id));

    if columns.has("username")
        && let Some(name) = seed.display_name.or(seed.email)
    {
        row.insert("username".to_string(), Value::from(name));
    }
    if columns.has("avatar_url")
        && let Some(avatar) = seed.avatar_url
    {
        row.insert("avatar_url".to_string(), Value::from(avatar));
    }
    if columns.has("role") {
        row.insert("role".to_string(), Value::from(ProfileRole::Member.as_str()));
    }

    let now = Utc::now().to_rfc3339();
    for column in ["created_at", "updated_at"] {
        if columns.has(column) {
            row.insert(column.to_string(), Value::from(now.as_str()));
        }
    }

    row
}

/// Make sure a profile row exists for `seed.user_id`.
///
/// Never overwrites an existing row. A missing table is a no-op, not a
/// failure. An insert that collides with a concurrent one counts as success.
pub async fn ensure_profile(
    store: &dyn RecordStore,
    seed: &ProfileSeed<'_>,
) -> Result<Reconciled, ProfileError> {
    if seed.user_id.is_empty() {
        return Err(ProfileError::MissingIdentity);
    }

    match probe(store).await {
        SchemaState::Missing => return Ok(Reconciled::Skipped),
        SchemaState::Error(detail) => return Err(ProfileError::Store(detail)),
        SchemaState::Exists | SchemaState::Empty => {}
    }

    let existing = store
        .select(
            &SelectQuery::columns(&[KEY_COLUMN])
                .filter(Filter::eq(KEY_COLUMN, seed.user_id))
                .limit(1),
        )
        .await?;
    if !existing.is_empty() {
        return Ok(Reconciled::AlreadyPresent);
    }

    let columns = discover_missing_columns(store, SEED_COLUMNS).await;
    let payload = build_insert_payload(seed, &columns);

    info!(
        user_id = seed.user_id,
        columns = ?payload.keys().collect::<Vec<_>>(),
        "Creating profile"
    );
    insert_profile(store, payload).await
}

/// Insert a row holding nothing but the identity key.
///
/// The fallback when [`ensure_profile`] fails: optional columns are the
/// usual cause, so they are left out entirely.
pub async fn ensure_minimal_profile(
    store: &dyn RecordStore,
    user_id: &str,
) -> Result<Reconciled, ProfileError> {
    if user_id.is_empty() {
        return Err(ProfileError::MissingIdentity);
    }

    match probe(store).await {
        SchemaState::Missing => return Ok(Reconciled::Skipped),
        SchemaState::Error(detail) => return Err(ProfileError::Store(detail)),
        SchemaState::Exists | SchemaState::Empty => {}
    }

    let mut row = Row::new();
    row.insert(KEY_COLUMN.to_string(), Value::from(user_id));
    insert_profile(store, row).await
}

/// [`ensure_profile`], degrading to [`ensure_minimal_profile`] on failure.
///
/// The error of the second tier is returned only when both fail.
pub async fn reconcile_profile(
    store: &dyn RecordStore,
    seed: &ProfileSeed<'_>,
) -> Result<Reconciled, ProfileError> {
    match ensure_profile(store, seed).await {
        Ok(outcome) => Ok(outcome),
        Err(ProfileError::MissingIdentity) => Err(ProfileError::MissingIdentity),
        Err(err) => {
            warn!(
                user_id = seed.user_id,
                error = %err,
                "Profile creation failed, trying a minimal profile"
            );
            ensure_minimal_profile(store, seed.user_id).await
        }
    }
}

async fn insert_profile(store: &dyn RecordStore, row: Row) -> Result<Reconciled, ProfileError> {
    match store.insert(row).await {
        Ok(()) => Ok(Reconciled::Created),
        Err(failure) if failure.is_conflict() => {
            info!("Profile was created concurrently");
            Ok(Reconciled::RaceLost)
        }
        Err(failure) => Err(failure.into()),
    }
}
