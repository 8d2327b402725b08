//! Identity models: access token claims, session, user metadata.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Free-form metadata the auth service keeps on each user.
///
/// Only `Some` fields are sent, so an update never blanks a value the
/// caller did not mention.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steam_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite_server: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
}

impl UserMetadata {
    /// Overwrite fields that are set in `other`.
    pub fn merge(&mut self, other: &UserMetadata) {
        fn take<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }
        take(&mut self.full_name, &other.full_name);
        take(&mut self.avatar_url, &other.avatar_url);
        take(&mut self.steam_id, &other.steam_id);
        take(&mut self.discord_username, &other.discord_username);
        take(&mut self.favorite_server, &other.favorite_server);
        take(&mut self.role, &other.role);
        take(&mut self.is_admin, &other.is_admin);
    }

    pub fn is_empty(&self) -> bool {
        *self == UserMetadata::default()
    }
}

/// Claims of a backend-issued access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub aud: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Postgres role the token maps to (`authenticated` for users).
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

/// Signed-in user, built from a verified access token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub email: Option<String>,
    pub metadata: UserMetadata,
    /// Raw token, forwarded to the backend so row-level security applies.
    pub access_token: SecretString,
}

impl Session {
    pub fn from_claims(claims: AccessClaims, access_token: SecretString) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            metadata: claims.user_metadata,
            access_token,
        }
    }
}
