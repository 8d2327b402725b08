//! Admin role assignment.

use std::sync::Arc;

use actix_web::test;
use clanhub_lib::identity::MemoryIdentityGateway;
use clanhub_lib::store::MemoryStore;
use serde_json::json;

use super::test_helpers::*;

const TARGET: &str = "target-member";
const BOSS: &str = "clan-leader";

fn roster() -> MemoryStore {
    MemoryStore::new("profiles")
        .with_row(row(json!({"user_id": TARGET, "username": "Rookie", "role": "member"})))
        .with_row(row(json!({"user_id": BOSS, "username": "Leader", "role": "admin"})))
}

fn role_request(user_id: &str, role: &str) -> test::TestRequest {
    test::TestRequest::put()
        .uri(&format!("/api/v1/admin/members/{}/role", user_id))
        .set_json(json!({ "role": role }))
}

#[actix_rt::test]
async fn test_requires_credentials() {
    let app = create_test_app(Arc::new(roster()), Arc::new(MemoryIdentityGateway::new())).await;

    let (status, _) = send(&app, role_request(TARGET, "moderator")).await;
    assert_eq!(status, 401);

    let (status, _) = send(
        &app,
        role_request(TARGET, "moderator").insert_header(("X-Admin-Key", "wrong")),
    )
    .await;
    assert_eq!(status, 401);
}

#[actix_rt::test]
async fn test_plain_member_is_forbidden() {
    let store = Arc::new(roster());
    let app = create_test_app(store.clone(), Arc::new(MemoryIdentityGateway::new())).await;

    let req = role_request(BOSS, "member").insert_header((
        "Authorization",
        format!("Bearer {}", member_token(TARGET, "Rookie")),
    ));
    let (status, body) = send(&app, req).await;

    assert_eq!(status, 403);
    assert_eq!(body["error"], "FORBIDDEN");
    assert!(store.writes().is_empty());
}

#[actix_rt::test]
async fn test_bootstrap_key_assigns_role() {
    let store = Arc::new(roster());
    let identity = Arc::new(MemoryIdentityGateway::new());
    let app = create_test_app(store.clone(), identity.clone()).await;

    let req = role_request(TARGET, "Admin").insert_header(("X-Admin-Key", TEST_ADMIN_KEY));
    let (status, body) = send(&app, req).await;

    assert_eq!(status, 200, "body: {}", body);
    assert_eq!(body["role"], "admin");
    assert!(body.get("metadata_warning").is_none());

    let target = store
        .rows()
        .into_iter()
        .find(|r| r["user_id"] == TARGET)
        .expect("target row");
    assert_eq!(target["role"], "admin");
    assert_eq!(identity.metadata(TARGET).and_then(|m| m.is_admin), Some(true));
}

#[actix_rt::test]
async fn test_admin_session_assigns_role() {
    let app = create_test_app(Arc::new(roster()), Arc::new(MemoryIdentityGateway::new())).await;

    let req = role_request(TARGET, "moderator").insert_header((
        "Authorization",
        format!("Bearer {}", member_token(BOSS, "Leader")),
    ));
    let (status, body) = send(&app, req).await;

    assert_eq!(status, 200, "body: {}", body);
    assert_eq!(body["role"], "moderator");
}

#[actix_rt::test]
async fn test_missing_role_column_is_reported() {
    let store = MemoryStore::new("profiles")
        .with_columns(&["id", "username"])
        .with_row(row(json!({"user_id": TARGET, "username": "Rookie"})));
    let app = create_test_app(Arc::new(store), Arc::new(MemoryIdentityGateway::new())).await;

    let req = role_request(TARGET, "moderator").insert_header(("X-Admin-Key", TEST_ADMIN_KEY));
    let (status, body) = send(&app, req).await;

    assert_eq!(status, 502);
    assert_eq!(body["message"], "Profile table has no 'role' column");
}

#[actix_rt::test]
async fn test_unknown_role_and_member() {
    let app = create_test_app(Arc::new(roster()), Arc::new(MemoryIdentityGateway::new())).await;

    let req = role_request(TARGET, "overlord").insert_header(("X-Admin-Key", TEST_ADMIN_KEY));
    let (status, _) = send(&app, req).await;
    assert_eq!(status, 400);

    let req = role_request("ghost", "member").insert_header(("X-Admin-Key", TEST_ADMIN_KEY));
    let (status, _) = send(&app, req).await;
    assert_eq!(status, 404);
}

#[actix_rt::test]
async fn test_missing_table() {
    let app = create_test_app(
        Arc::new(MemoryStore::new("profiles").without_table()),
        Arc::new(MemoryIdentityGateway::new()),
    )
    .await;

    let req = role_request(TARGET, "moderator").insert_header(("X-Admin-Key", TEST_ADMIN_KEY));
    let (status, body) = send(&app, req).await;

    assert_eq!(status, 503);
    assert_eq!(body["error"], "STORE_MISSING");
}
