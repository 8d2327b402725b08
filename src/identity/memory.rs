//! In-memory identity gateway for development and tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{GatewayError, IdentityGateway};
use crate::models::{Session, UserMetadata};

#[derive(Debug, Default)]
struct GatewayState {
    metadata: HashMap<String, UserMetadata>,
    failure: Option<GatewayError>,
}

/// Keeps user metadata in a map keyed by user id.
#[derive(Debug, Default)]
pub struct MemoryIdentityGateway {
    state: Mutex<GatewayState>,
}

impl MemoryIdentityGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every subsequent update with `error`.
    pub fn fail_with(&self, error: GatewayError) {
        self.state().failure = Some(error);
    }

    /// Current metadata stored for `user_id`.
    pub fn metadata(&self, user_id: &str) -> Option<UserMetadata> {
        self.state().metadata.get(user_id).cloned()
    }

    fn state(&self) -> MutexGuard<'_, GatewayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn merge(&self, user_id: &str, metadata: &UserMetadata) -> Result<(), GatewayError> {
        let mut state = self.state();
        if let Some(error) = &state.failure {
            return Err(error.clone());
        }
        state
            .metadata
            .entry(user_id.to_string())
            .or_default()
            .merge(metadata);
        Ok(())
    }
}

#[async_trait]
impl IdentityGateway for MemoryIdentityGateway {
    async fn update_own_metadata(
        &self,
        session: &Session,
        metadata: &UserMetadata,
    ) -> Result<(), GatewayError> {
        self.merge(&session.user_id, metadata)
    }

    async fn update_user_metadata(
        &self,
        user_id: &str,
        metadata: &UserMetadata,
    ) -> Result<(), GatewayError> {
        self.merge(user_id, metadata)
    }
}
