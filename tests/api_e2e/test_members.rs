//! Member directory.

use std::sync::Arc;

use clanhub_lib::identity::MemoryIdentityGateway;
use clanhub_lib::store::MemoryStore;
use serde_json::{Value, json};

use super::test_helpers::*;

fn clan() -> MemoryStore {
    MemoryStore::new("profiles")
        .with_row(row(json!({
            "user_id": "a",
            "username": "SniperWolf",
            "role": "admin",
            "member_since": "2019-05-01T00:00:00Z"
        })))
        .with_row(row(json!({
            "user_id": "b",
            "username": "MedicMike",
            "member_since": "2023-02-01T00:00:00Z"
        })))
        .with_row(row(json!({
            "user_id": "c",
            "username": "wolfpack_leader",
            "member_since": "2021-07-01T00:00:00Z"
        })))
}

fn ids(body: &Value) -> Vec<String> {
    body["members"]
        .as_array()
        .map(|members| {
            members
                .iter()
                .filter_map(|m| m["user_id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[actix_rt::test]
async fn test_recent_members() {
    let app = create_test_app(Arc::new(clan()), Arc::new(MemoryIdentityGateway::new())).await;

    let (status, body) = get_with_token(&app, "/api/v1/members", None).await;

    assert_eq!(status, 200);
    assert_eq!(body["available"], true);
    assert_eq!(ids(&body), vec!["b", "c", "a"]);
}

#[actix_rt::test]
async fn test_search_members() {
    let app = create_test_app(Arc::new(clan()), Arc::new(MemoryIdentityGateway::new())).await;

    let (status, body) = get_with_token(&app, "/api/v1/members?q=wolf", None).await;
    assert_eq!(status, 200);
    let mut found = ids(&body);
    found.sort();
    assert_eq!(found, vec!["a", "c"]);

    let (_, blank) = get_with_token(&app, "/api/v1/members?q=%20", None).await;
    let (_, recent) = get_with_token(&app, "/api/v1/members", None).await;
    assert_eq!(blank, recent);
}

#[actix_rt::test]
async fn test_directory_unavailable_without_table() {
    let app = create_test_app(
        Arc::new(MemoryStore::new("profiles").without_table()),
        Arc::new(MemoryIdentityGateway::new()),
    )
    .await;

    let (status, body) = get_with_token(&app, "/api/v1/members?q=wolf", None).await;

    assert_eq!(status, 200);
    assert_eq!(body["available"], false);
    assert_eq!(body["members"], json!([]));
}

#[actix_rt::test]
async fn test_member_detail() {
    let app = create_test_app(Arc::new(clan()), Arc::new(MemoryIdentityGateway::new())).await;

    let (status, body) = get_with_token(&app, "/api/v1/members/a", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["username"], "SniperWolf");
    assert_eq!(body["role"], "admin");

    let (status, body) = get_with_token(&app, "/api/v1/members/nobody", None).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "NOT_FOUND");
}
