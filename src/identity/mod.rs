//! Identity gateway: the auth collaborator that owns user accounts.
//!
//! The profile core never manages credentials. It only pushes metadata
//! changes through this trait, either as the signed-in user or, for admin
//! actions, through the service-role channel.

pub mod gotrue;
pub mod memory;

use async_trait::async_trait;

use crate::models::{Session, UserMetadata};

pub use gotrue::GoTrueGateway;
pub use memory::MemoryIdentityGateway;

/// Identity gateway errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The auth service answered with an error status.
    #[error("Auth service rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The request never got a usable answer.
    #[error("Auth service unreachable: {0}")]
    Transport(String),
}

#[async_trait]
pub trait IdentityGateway: Send + Sync {
    /// Merge `metadata` into the signed-in user's own metadata.
    async fn update_own_metadata(
        &self,
        session: &Session,
        metadata: &UserMetadata,
    ) -> Result<(), GatewayError>;

    /// Merge `metadata` into another user's metadata (admin channel).
    async fn update_user_metadata(
        &self,
        user_id: &str,
        metadata: &UserMetadata,
    ) -> Result<(), GatewayError>;
}
