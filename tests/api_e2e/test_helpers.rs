//! Shared test helpers for API tests.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{App, dev::ServiceResponse, test, web};
use chrono::Utc;
use clanhub_lib::auth::{AdminKey, TOKEN_AUDIENCE, TokenVerifier};
use clanhub_lib::backend::Backend;
use clanhub_lib::config::{BackendSettings, Config, Environment};
use clanhub_lib::identity::MemoryIdentityGateway;
use clanhub_lib::middleware::RequestLogger;
use clanhub_lib::models::{AccessClaims, UserMetadata};
use clanhub_lib::store::{MemoryStore, Row};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use secrecy::SecretString;
use serde_json::Value;

/// Admin key used in tests.
pub const TEST_ADMIN_KEY: &str = "test-admin-key-for-api-e2e";

/// Access token signing secret used in tests.
pub const TEST_JWT_SECRET: &str = "test-jwt-secret-for-api-e2e";

pub const SEARCH_FUNCTION: &str = "search_profiles";

/// A row from a JSON literal.
pub fn row(value: Value) -> Row {
    value.as_object().cloned().unwrap_or_default()
}

/// Issue an access token the way the backend's auth service would.
pub fn issue_token(user_id: &str, email: &str, metadata: UserMetadata) -> String {
    let claims = AccessClaims {
        sub: user_id.to_string(),
        exp: (Utc::now().timestamp() + 3600) as usize,
        aud: Some(TOKEN_AUDIENCE.to_string()),
        email: Some(email.to_string()),
        role: Some("authenticated".to_string()),
        user_metadata: metadata,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("failed to sign test token")
}

/// Token for a member whose metadata carries a display name.
pub fn member_token(user_id: &str, name: &str) -> String {
    issue_token(
        user_id,
        &format!("{}@clan.example", name.to_lowercase()),
        UserMetadata {
            full_name: Some(name.to_string()),
            ..Default::default()
        },
    )
}

fn test_config() -> Config {
    Config {
        environment: Environment::Development,
        host: "127.0.0.1".to_string(),
        port: 0,
        admin_key: Some(TEST_ADMIN_KEY.to_string()),
        backend: BackendSettings {
            url: None,
            anon_key: SecretString::from("anon".to_string()),
            service_role_key: SecretString::from("service".to_string()),
            jwt_secret: SecretString::from(TEST_JWT_SECRET.to_string()),
            profile_table: "profiles".to_string(),
            search_function: SEARCH_FUNCTION.to_string(),
            bootstrap_function: None,
            connect_timeout: Duration::from_secs(1),
            request_timeout: Duration::from_secs(1),
        },
    }
}

/// Create a test app over the given in-memory store and identity gateway.
pub async fn create_test_app(
    store: Arc<MemoryStore>,
    identity: Arc<MemoryIdentityGateway>,
) -> impl actix_web::dev::Service<
    actix_http::Request,
    Response = ServiceResponse,
    Error = actix_web::Error,
> {
    let config = test_config();
    let backend = Backend::in_memory(store, identity, SEARCH_FUNCTION);
    let verifier = TokenVerifier::new(config.backend.jwt_secret.clone());
    let admin_key = AdminKey::new(config.admin_key.clone());

    test::init_service(
        App::new()
            .wrap(RequestLogger)
            .app_data(web::Data::new(backend))
            .app_data(web::Data::new(verifier))
            .app_data(web::Data::new(admin_key))
            .app_data(web::Data::new(config))
            .service(web::scope("/api/v1").configure(clanhub_lib::api::configure_v1)),
    )
    .await
}

/// Send a request and return status plus JSON body (Null when empty).
pub async fn send<S>(app: &S, req: test::TestRequest) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let resp = test::call_service(app, req.to_request()).await;
    let status = resp.status().as_u16();
    let bytes = test::read_body(resp).await;
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

/// GET with an optional bearer token.
pub async fn get_with_token<S>(app: &S, uri: &str, token: Option<&str>) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let mut req = test::TestRequest::get().uri(uri);
    if let Some(token) = token {
        req = req.insert_header(("Authorization", format!("Bearer {}", token)));
    }
    send(app, req).await
}
