//! PostgREST table client.

use clanhub_lib::services::profiles::{
    ProfileSeed, Reconciled, SchemaState, bootstrap_profile_store, discover_missing_columns,
    ensure_profile, probe,
};
use clanhub_lib::store::{Filter, RecordStore, RestStore, SelectQuery};
use reqwest::Client;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TABLE_PATH: &str = "/rest/v1/profiles";

fn store(server: &MockServer) -> RestStore {
    RestStore::new(
        Client::new(),
        &server.uri(),
        "profiles",
        SecretString::from("anon".to_string()),
    )
}

#[tokio::test]
async fn test_select_sends_postgrest_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("select", "user_id,username"))
        .and(query_param("user_id", "eq.abc"))
        .and(query_param("order", "member_since.desc.nullslast"))
        .and(query_param("limit", "1"))
        .and(header("apikey", "anon"))
        .and(header("Authorization", "Bearer anon"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"user_id": "abc", "username": "Frag"}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let rows = store(&server)
        .select(
            &SelectQuery::columns(&["user_id", "username"])
                .filter(Filter::eq("user_id", "abc"))
                .order_desc("member_since")
                .limit(1),
        )
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["username"], "Frag");
}

#[tokio::test]
async fn test_scoped_store_forwards_user_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(header("apikey", "anon"))
        .and(header("Authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let scoped = store(&server).scoped(&SecretString::from("user-token".to_string()));
    assert_eq!(probe(&scoped).await, SchemaState::Empty);
}

#[tokio::test]
async fn test_missing_table_error_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": "42P01",
            "message": "relation \"public.profiles\" does not exist",
            "details": null,
            "hint": null
        })))
        .mount(&server)
        .await;

    let store = store(&server);
    assert_eq!(probe(&store).await, SchemaState::Missing);
    assert_eq!(
        ensure_profile(&store, &ProfileSeed::new("abc")).await,
        Ok(Reconciled::Skipped)
    );
}

#[tokio::test]
async fn test_non_json_error_keeps_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream timed out"))
        .mount(&server)
        .await;

    let err = store(&server).select(&SelectQuery::all()).await.unwrap_err();

    assert_eq!(err.code, None);
    assert!(err.message.contains("502"));
    assert!(err.message.contains("upstream timed out"));
}

#[tokio::test]
async fn test_column_discovery_over_rest() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("select", "user_id,username,avatar_url,role"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "42703",
            "message": "column profiles.avatar_url does not exist",
            "details": null,
            "hint": null
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("select", "user_id,username,role"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let knowledge =
        discover_missing_columns(&store(&server), &["username", "avatar_url", "role"]).await;

    assert!(knowledge.is_missing("avatar_url"));
    assert!(knowledge.has("username"));
    assert!(knowledge.has("role"));
}

#[tokio::test]
async fn test_insert_and_update() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .and(header("Prefer", "return=minimal"))
        .and(body_json(json!({"user_id": "abc"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(TABLE_PATH))
        .and(query_param("user_id", "eq.abc"))
        .and(header("Prefer", "return=representation"))
        .and(body_json(json!({"role": "admin"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"user_id": "abc", "role": "admin"}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = store(&server);
    store
        .insert(json!({"user_id": "abc"}).as_object().cloned().unwrap())
        .await
        .unwrap();
    let changed = store
        .update(
            &Filter::eq("user_id", "abc"),
            json!({"role": "admin"}).as_object().cloned().unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(changed, 1);
}

#[tokio::test]
async fn test_duplicate_insert_is_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"profiles_user_id_key\"",
            "details": "Key (user_id)=(abc) already exists.",
            "hint": null
        })))
        .mount(&server)
        .await;

    let err = store(&server)
        .insert(json!({"user_id": "abc"}).as_object().cloned().unwrap())
        .await
        .unwrap_err();

    assert!(err.is_conflict());
    assert!(!err.is_missing_relation());
}

#[tokio::test]
async fn test_rpc() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/search_profiles"))
        .and(body_json(json!({"search_query": "wolf"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"user_id": "a", "username": "SniperWolf"}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let rows = store(&server)
        .rpc("search_profiles", json!({"search_query": "wolf"}))
        .await
        .unwrap();

    assert_eq!(rows[0]["username"], "SniperWolf");
}

#[tokio::test]
async fn test_bootstrap_creates_missing_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": "42P01",
            "message": "relation \"public.profiles\" does not exist",
            "details": null,
            "hint": null
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/create_profiles_table_direct"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert_eq!(
        bootstrap_profile_store(&store(&server), "create_profiles_table_direct").await,
        SchemaState::Empty
    );
}
