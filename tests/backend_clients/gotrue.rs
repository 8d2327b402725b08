//! GoTrue auth client.

use clanhub_lib::identity::{GatewayError, GoTrueGateway, IdentityGateway};
use clanhub_lib::models::{Session, UserMetadata};
use reqwest::Client;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway(base_url: &str) -> GoTrueGateway {
    GoTrueGateway::new(
        Client::new(),
        base_url,
        SecretString::from("anon".to_string()),
        SecretString::from("service".to_string()),
    )
}

fn session() -> Session {
    Session {
        user_id: "u1".to_string(),
        email: None,
        metadata: UserMetadata::default(),
        access_token: SecretString::from("user-token".to_string()),
    }
}

#[tokio::test]
async fn test_update_own_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/auth/v1/user"))
        .and(header("apikey", "anon"))
        .and(header("Authorization", "Bearer user-token"))
        .and(body_json(json!({"data": {"steam_id": "STEAM_0:0:7"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "u1"})))
        .expect(1)
        .mount(&server)
        .await;

    let metadata = UserMetadata {
        steam_id: Some("STEAM_0:0:7".to_string()),
        ..Default::default()
    };
    gateway(&server.uri())
        .update_own_metadata(&session(), &metadata)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_admin_update_uses_service_key() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/auth/v1/admin/users/u1"))
        .and(header("apikey", "service"))
        .and(header("Authorization", "Bearer service"))
        .and(body_json(
            json!({"user_metadata": {"role": "admin", "is_admin": true}}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "u1"})))
        .expect(1)
        .mount(&server)
        .await;

    let metadata = UserMetadata {
        role: Some("admin".to_string()),
        is_admin: Some(true),
        ..Default::default()
    };
    gateway(&server.uri())
        .update_user_metadata("u1", &metadata)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_rejection_carries_message() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/auth/v1/user"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"msg": "invalid JWT: token is expired"})),
        )
        .mount(&server)
        .await;

    let err = gateway(&server.uri())
        .update_own_metadata(&session(), &UserMetadata::default())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        GatewayError::Rejected {
            status: 401,
            message: "invalid JWT: token is expired".to_string()
        }
    );
}

#[tokio::test]
async fn test_unreachable_service() {
    // Nothing listens on the discard port.
    let err = gateway("http://127.0.0.1:9")
        .update_user_metadata("u1", &UserMetadata::default())
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Transport(_)));
}
