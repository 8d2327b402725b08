//! GoTrue auth API client.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use super::{GatewayError, IdentityGateway};
use crate::models::{Session, UserMetadata};

/// Error body shapes GoTrue uses across versions.
#[derive(Deserialize)]
struct GoTrueError {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
}

impl GoTrueError {
    fn into_message(self) -> Option<String> {
        self.msg.or(self.message).or(self.error_description)
    }
}

/// Auth API client.
#[derive(Clone)]
pub struct GoTrueGateway {
    client: Client,
    base_url: String,
    api_key: SecretString,
    service_role_key: SecretString,
}

impl GoTrueGateway {
    pub fn new(
        client: Client,
        base_url: &str,
        api_key: SecretString,
        service_role_key: SecretString,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            service_role_key,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<(), GatewayError> {
        let response = builder
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<GoTrueError>(&body)
            .ok()
            .and_then(GoTrueError::into_message)
            .unwrap_or(body);

        Err(GatewayError::Rejected { status, message })
    }
}

#[async_trait]
impl IdentityGateway for GoTrueGateway {
    async fn update_own_metadata(
        &self,
        session: &Session,
        metadata: &UserMetadata,
    ) -> Result<(), GatewayError> {
        let builder = self
            .client
            .put(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", self.api_key.expose_secret())
            .bearer_auth(session.access_token.expose_secret())
            .json(&json!({ "data": metadata }));
        self.send(builder).await
    }

    async fn update_user_metadata(
        &self,
        user_id: &str,
        metadata: &UserMetadata,
    ) -> Result<(), GatewayError> {
        let builder = self
            .client
            .put(format!(
                "{}/auth/v1/admin/users/{}",
                self.base_url,
                urlencoding::encode(user_id)
            ))
            .header("apikey", self.service_role_key.expose_secret())
            .bearer_auth(self.service_role_key.expose_secret())
            .json(&json!({ "user_metadata": metadata }));
        self.send(builder).await
    }
}
