//! Health, readiness and server info.

use std::sync::Arc;

use clanhub_lib::identity::MemoryIdentityGateway;
use clanhub_lib::store::{MemoryStore, StoreFailure};

use super::test_helpers::*;

#[actix_rt::test]
async fn test_health() {
    let app = create_test_app(
        Arc::new(MemoryStore::new("profiles")),
        Arc::new(MemoryIdentityGateway::new()),
    )
    .await;

    let (status, body) = get_with_token(&app, "/api/v1/health", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");

    let (status, body) = get_with_token(&app, "/api/v1/info", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["backend"], "memory");
    assert_eq!(body["environment"], "development");
}

#[actix_rt::test]
async fn test_ready_states() {
    let app = create_test_app(
        Arc::new(MemoryStore::new("profiles")),
        Arc::new(MemoryIdentityGateway::new()),
    )
    .await;
    let (status, body) = get_with_token(&app, "/api/v1/ready", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["profile_store"], "empty");

    let app = create_test_app(
        Arc::new(MemoryStore::new("profiles").without_table()),
        Arc::new(MemoryIdentityGateway::new()),
    )
    .await;
    let (status, body) = get_with_token(&app, "/api/v1/ready", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["profile_store"], "missing");
}

#[actix_rt::test]
async fn test_not_ready_when_backend_fails() {
    let store = Arc::new(MemoryStore::new("profiles"));
    store.fail_with(StoreFailure::transport("connection refused"));
    let app = create_test_app(store, Arc::new(MemoryIdentityGateway::new())).await;

    let (status, body) = get_with_token(&app, "/api/v1/ready", None).await;
    assert_eq!(status, 503);
    assert_eq!(body["error"], "NOT_READY");
}
