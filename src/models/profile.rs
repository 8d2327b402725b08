//! Member profile models.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::store::Row;

/// Community role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProfileRole {
    #[default]
    Member,
    Moderator,
    Admin,
}

impl ProfileRole {
    /// Parse a role name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "member" => Some(Self::Member),
            "moderator" => Some(Self::Moderator),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for ProfileRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A profile row. Every column but the identity key may be absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Profile {
    pub user_id: String,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub role: ProfileRole,
    pub member_since: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

fn text(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

impl Profile {
    /// Read a row leniently. Rows without an identity key are skipped.
    pub fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            user_id: text(row, "user_id")?,
            username: text(row, "username"),
            avatar_url: text(row, "avatar_url"),
            role: text(row, "role")
                .and_then(|r| ProfileRole::parse(&r))
                .unwrap_or_default(),
            member_since: text(row, "member_since"),
            created_at: text(row, "created_at"),
            updated_at: text(row, "updated_at"),
        })
    }

    /// Date the member joined, preferring the dedicated column.
    pub fn joined(&self) -> Option<&str> {
        self.member_since.as_deref().or(self.created_at.as_deref())
    }
}

/// Where a profile view's fields came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProfileSource {
    /// Profile row, with session fields filling gaps.
    Store,
    /// Session only: the profile store is missing or unreachable.
    Session,
}

/// Own profile as returned by `GET /profile`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProfileView {
    pub user_id: String,
    pub display_name: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub role: ProfileRole,
    pub member_since: Option<String>,
    pub steam_id: Option<String>,
    pub discord_username: Option<String>,
    pub favorite_server: Option<String>,
    pub source: ProfileSource,
}

/// Body of `PUT /profile`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ProfilePatch {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub steam_id: Option<String>,
    pub discord_username: Option<String>,
    pub favorite_server: Option<String>,
}

/// What happened to the profile row on `PUT /profile`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    Applied,
    Skipped,
    Failed,
}

/// Response of `PUT /profile`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProfileUpdateResponse {
    pub profile: ProfileView,
    pub row_status: RowStatus,
    /// Backend detail when the row patch failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_error: Option<String>,
}

/// Body of `PUT /admin/members/{user_id}/role`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RoleUpdateRequest {
    pub role: String,
}

/// Response of `PUT /admin/members/{user_id}/role`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoleUpdateResponse {
    pub user_id: String,
    pub role: ProfileRole,
    /// Set when the role could not be mirrored into the member's account
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_warning: Option<String>,
}

/// Query string of `GET /members`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct MembersQuery {
    pub q: Option<String>,
}

/// Member directory listing.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MemberListResponse {
    pub members: Vec<Profile>,
    /// False when the profile table does not exist.
    pub available: bool,
}
