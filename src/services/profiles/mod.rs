//! Schema-tolerant profile synchronisation.
//!
//! The profile table lives in a hosted backend with no migration story, so
//! it may be missing or lack columns. Everything here learns the table's
//! shape from the backend's own error text and only ever writes columns it
//! has not seen reported as missing.

pub mod bootstrap;
pub mod columns;
pub mod probe;
pub mod reconcile;
pub mod search;
pub mod update;

use crate::store::StoreFailure;

pub use bootstrap::bootstrap_profile_store;
pub use columns::{ColumnKnowledge, discover_missing_columns, infer_missing_columns};
pub use probe::{SchemaState, probe};
pub use reconcile::{
    ProfileSeed, Reconciled, ensure_minimal_profile, ensure_profile, reconcile_profile,
};
pub use search::{find_member, is_admin, recent_members, search_members};
pub use update::{ProfileUpdate, RoleAssignment, RowPatch, assign_role, update_profile};

/// Identity key column of the profile table.
pub const KEY_COLUMN: &str = "user_id";

/// Profile core errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    /// The profile table does not exist. Callers degrade to session-only data.
    #[error("Profile table does not exist")]
    StoreMissing,

    /// Transport, permission or any other backend failure.
    #[error("Profile store error: {0}")]
    Store(String),

    /// An insert hit an existing row. Reconciliation turns this into success.
    #[error("Profile already exists")]
    AlreadyExists,

    /// A write needs a column the table does not have.
    #[error("Profile table has no '{0}' column")]
    ColumnUnknown(String),

    /// The auth service refused a metadata update.
    #[error("Identity update failed: {0}")]
    Identity(String),

    #[error("No profile for user {0}")]
    NotFound(String),

    #[error("User ID is required")]
    MissingIdentity,
}

impl From<StoreFailure> for ProfileError {
    fn from(failure: StoreFailure) -> Self {
        if failure.is_missing_relation() {
            ProfileError::StoreMissing
        } else if failure.is_conflict() {
            ProfileError::AlreadyExists
        } else {
            ProfileError::Store(failure.detail())
        }
    }
}
