//! Profile updates: own fields by the member, role by an admin.

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use super::columns::{ColumnKnowledge, discover_missing_columns};
use super::probe::{SchemaState, probe};
use super::reconcile::{ProfileSeed, Reconciled, reconcile_profile};
use super::{KEY_COLUMN, ProfileError};
use crate::identity::IdentityGateway;
use crate::models::{ProfilePatch, ProfileRole, Session, UserMetadata};
use crate::store::{Filter, RecordStore, Row};

/// Row columns a member may change, plus the bookkeeping timestamp.
pub const UPDATABLE_COLUMNS: &[&str] = &["username", "avatar_url", "updated_at"];

/// What happened to the profile row during an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowPatch {
    Applied,
    /// No table, or nothing the table can hold was provided.
    Skipped,
    /// The row patch failed. The metadata update still went through.
    Failed(String),
}

/// Result of [`update_profile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    /// Outcome of the pre-update reconciliation, if one ran and succeeded.
    pub reconciled: Option<Reconciled>,
    pub row: RowPatch,
}

/// Result of [`assign_role`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    pub user_id: String,
    pub role: ProfileRole,
    /// Set when mirroring the role into identity metadata failed.
    pub metadata_error: Option<String>,
}

impl ProfilePatch {
    /// Metadata the auth service keeps for these fields.
    pub fn to_metadata(&self) -> UserMetadata {
        UserMetadata {
            full_name: self.full_name.clone(),
            avatar_url: self.avatar_url.clone(),
            steam_id: self.steam_id.clone(),
            discord_username: self.discord_username.clone(),
            favorite_server: self.favorite_server.clone(),
            ..Default::default()
        }
    }
}

/// Row patch holding only provided fields whose columns exist.
///
/// Returns an empty row when there is nothing to write.
pub fn build_update_payload(patch: &ProfilePatch, columns: &ColumnKnowledge) -> Row {
    let mut row = Row::new();

    if columns.has("username")
        && let Some(name) = patch.full_name.as_deref().filter(|n| !n.trim().is_empty())
    {
        row.insert("username".to_string(), Value::from(name.trim()));
    }
    if columns.has("avatar_url")
        && let Some(avatar) = patch.avatar_url.as_deref().filter(|a| !a.is_empty())
    {
        row.insert("avatar_url".to_string(), Value::from(avatar));
    }
    if !row.is_empty() && columns.has("updated_at") {
        row.insert(
            "updated_at".to_string(),
            Value::from(Utc::now().to_rfc3339()),
        );
    }

    row
}

/// Apply a member's own profile edit.
///
/// The identity metadata update is authoritative: its failure fails the
/// call. The profile row patch is best effort on top of it, recomputing the
/// table's columns on every call.
pub async fn update_profile(
    store: &dyn RecordStore,
    identity: &dyn IdentityGateway,
    session: &Session,
    patch: &ProfilePatch,
) -> Result<ProfileUpdate, ProfileError> {
    if session.user_id.is_empty() {
        return Err(ProfileError::MissingIdentity);
    }

    let usable = probe(store).await.is_usable();

    let mut reconciled = None;
    if usable {
        let seed = ProfileSeed {
            display_name: patch
                .full_name
                .as_deref()
                .or(session.metadata.full_name.as_deref()),
            avatar_url: patch
                .avatar_url
                .as_deref()
                .or(session.metadata.avatar_url.as_deref()),
            ..ProfileSeed::from_session(session)
        };
        match reconcile_profile(store, &seed).await {
            Ok(outcome) => reconciled = Some(outcome),
            Err(err) => warn!(
                user_id = %session.user_id,
                error = %err,
                "Could not ensure profile before update"
            ),
        }
    }

    let metadata = patch.to_metadata();
    if !metadata.is_empty() {
        identity
            .update_own_metadata(session, &metadata)
            .await
            .map_err(|e| ProfileError::Identity(e.to_string()))?;
    }

    if !usable {
        return Ok(ProfileUpdate {
            reconciled,
            row: RowPatch::Skipped,
        });
    }

    let columns = discover_missing_columns(store, UPDATABLE_COLUMNS).await;
    let payload = build_update_payload(patch, &columns);
    if payload.is_empty() {
        return Ok(ProfileUpdate {
            reconciled,
            row: RowPatch::Skipped,
        });
    }

    let row = match store
        .update(&Filter::eq(KEY_COLUMN, session.user_id.as_str()), payload)
        .await
    {
        Ok(0) => {
            warn!(user_id = %session.user_id, "Profile update matched no row");
            RowPatch::Failed(format!("No profile row for user {}", session.user_id))
        }
        Ok(_) => RowPatch::Applied,
        Err(failure) => {
            warn!(
                user_id = %session.user_id,
                error = %failure,
                "Error updating profile row"
            );
            RowPatch::Failed(failure.detail())
        }
    };

    Ok(ProfileUpdate { reconciled, row })
}

/// Set a member's community role (admin action).
///
/// Failures carry the backend's detail so the admin sees exactly what went
/// wrong. Mirroring the role into the member's identity metadata is best
/// effort and reported separately.
pub async fn assign_role(
    store: &dyn RecordStore,
    identity: &dyn IdentityGateway,
    user_id: &str,
    role: ProfileRole,
) -> Result<RoleAssignment, ProfileError> {
    if user_id.is_empty() {
        return Err(ProfileError::MissingIdentity);
    }

    match probe(store).await {
        SchemaState::Missing => return Err(ProfileError::StoreMissing),
        SchemaState::Error(detail) => return Err(ProfileError::Store(detail)),
        SchemaState::Exists | SchemaState::Empty => {}
    }

    let columns = discover_missing_columns(store, &["role", "updated_at"]).await;
    if columns.is_missing("role") {
        return Err(ProfileError::ColumnUnknown("role".to_string()));
    }

    let mut patch = Row::new();
    patch.insert("role".to_string(), Value::from(role.as_str()));
    if columns.has("updated_at") {
        patch.insert(
            "updated_at".to_string(),
            Value::from(Utc::now().to_rfc3339()),
        );
    }

    let changed = store.update(&Filter::eq(KEY_COLUMN, user_id), patch).await?;
    if changed == 0 {
        return Err(ProfileError::NotFound(user_id.to_string()));
    }

    info!(user_id, role = %role, "Role assigned");

    let metadata = UserMetadata {
        role: Some(role.as_str().to_string()),
        is_admin: Some(role == ProfileRole::Admin),
        ..Default::default()
    };
    let metadata_error = match identity.update_user_metadata(user_id, &metadata).await {
        Ok(()) => None,
        Err(err) => {
            warn!(user_id, error = %err, "Could not mirror role into identity metadata");
            Some(err.to_string())
        }
    };

    Ok(RoleAssignment {
        user_id: user_id.to_string(),
        role,
        metadata_error,
    })
}
