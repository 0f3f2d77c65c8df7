use reqwest::Client;
use serde_json::json;
use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use podpulse::auth::{Auth, AuthProvider, SessionStore};
use podpulse::error::Error;
use podpulse::functions::{FunctionInvoker, FunctionsClient};
use podpulse::storage::{ObjectStore, StorageClient, Upload};
use podpulse::store::{Collection, DocumentStore, Fields, Order, Query, RestStore};

fn rest(server: &MockServer, session: SessionStore) -> RestStore {
    RestStore::new(&server.uri(), "test_anon_key", "public", Client::new(), session)
}

fn fields(value: serde_json::Value) -> Fields {
    value.as_object().cloned().unwrap_or_default()
}

#[tokio::test]
async fn test_query_maps_filters_order_and_limit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/comments"))
        .and(query_param("select", "*"))
        .and(query_param("podcastId", "eq.p1"))
        .and(query_param("order", "rating.desc"))
        .and(query_param("limit", "5"))
        .and(header("apikey", "test_anon_key"))
        .and(header("Authorization", "Bearer test_anon_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "c1", "podcastId": "p1", "rating": 5 },
            { "id": 42, "podcastId": "p1", "rating": 3 }
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = rest(&mock_server, SessionStore::new());
    let query = Query::new().eq("podcastId", "p1").order(Order::desc("rating")).limit(5);
    let docs = store.query(&Collection::Comments, &query).await.unwrap();

    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].id, "c1");
    assert_eq!(docs[1].id, "42");
    assert!(!docs[0].fields.contains_key("id"));
}

#[tokio::test]
async fn test_favorites_are_scoped_to_the_user() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/favorites"))
        .and(query_param("userId", "eq.u1"))
        .and(query_param("id", "eq.p9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "p9", "userId": "u1", "addedAt": "2024-05-01T10:00:00Z" }
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/favorites"))
        .and(query_param("on_conflict", "userId,id"))
        .and(header_exists("Prefer"))
        .and(body_json(json!({ "id": "p3", "userId": "u1", "addedAt": "now" })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = rest(&mock_server, SessionStore::new());
    let favorites = Collection::favorites("u1");

    let doc = store.get(&favorites, "p9").await.unwrap().unwrap();
    assert_eq!(doc.id, "p9");
    assert!(!doc.fields.contains_key("userId"));

    store
        .set(&favorites, "p3", fields(json!({ "addedAt": "now" })))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_insert_returns_the_new_id() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/podcasts"))
        .and(header("Prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            { "id": "new-id", "title": "T" }
        ])))
        .mount(&mock_server)
        .await;

    let store = rest(&mock_server, SessionStore::new());
    let id = store
        .insert(&Collection::Podcasts, fields(json!({ "title": "T" })))
        .await
        .unwrap();
    assert_eq!(id, "new-id");
}

#[tokio::test]
async fn test_update_of_missing_row_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", "eq.ghost"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let store = rest(&mock_server, SessionStore::new());
    let err = store
        .update(&Collection::Users, "ghost", fields(json!({ "isAdmin": true })))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_refused_write_is_permission_denied() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/podcasts"))
        .respond_with(ResponseTemplate::new(403).set_body_string("row-level security"))
        .mount(&mock_server)
        .await;

    let store = rest(&mock_server, SessionStore::new());
    let err = store.delete(&Collection::Podcasts, "p1").await.unwrap_err();
    assert!(err.is_permission_denied());
}

#[tokio::test]
async fn test_sign_in_shares_the_session() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test_access_token",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "test_refresh_token",
            "user": {
                "id": "test_user_id",
                "email": "test@example.com",
                "user_metadata": { "name": "Tester" }
            }
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(header("Authorization", "Bearer test_access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let session = SessionStore::new();
    let auth = Auth::new(&mock_server.uri(), "test_anon_key", Client::new(), session.clone());
    let identity = auth.sign_in("test@example.com", "password123").await.unwrap();

    assert_eq!(identity.uid, "test_user_id");
    assert_eq!(identity.display_name.as_deref(), Some("Tester"));
    assert_eq!(auth.current_user(), Some(identity));

    let store = rest(&mock_server, session.clone());
    assert!(store.get(&Collection::Users, "test_user_id").await.unwrap().is_none());

    auth.sign_out().await.unwrap();
    assert!(auth.current_user().is_none());
    assert!(session.get().is_none());
}

#[tokio::test]
async fn test_rejected_sign_up() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "msg": "Password should be at least 6 characters"
        })))
        .mount(&mock_server)
        .await;

    let auth = Auth::new(&mock_server.uri(), "test_anon_key", Client::new(), SessionStore::new());
    let err = auth.sign_up("test@example.com", "123", Some("T")).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(auth.current_user().is_none());
}

#[tokio::test]
async fn test_upload_returns_public_url() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/storage/v1/object/media/podcasts/audio/ep1.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Key": "media/podcasts/audio/ep1.mp3"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/storage/v1/object/media"))
        .and(body_json(json!({ "prefixes": ["podcasts/audio/ep1.mp3"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let storage = StorageClient::new(
        &mock_server.uri(),
        "test_anon_key",
        "media",
        Client::new(),
        SessionStore::new(),
    );
    let upload = Upload::new("ep1.mp3", b"ID3".to_vec());
    let url = storage.upload("podcasts/audio/ep1.mp3", &upload).await.unwrap();
    assert_eq!(
        url,
        format!("{}/storage/v1/object/public/media/podcasts/audio/ep1.mp3", mock_server.uri())
    );

    storage.remove("podcasts/audio/ep1.mp3").await.unwrap();
}

#[tokio::test]
async fn test_upload_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("cover.jpg");
    tokio::fs::write(&file, b"jpeg").await.unwrap();

    let upload = Upload::from_path(&file).await.unwrap();
    assert_eq!(upload.file_name, "cover.jpg");
    assert_eq!(upload.content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(upload.bytes, b"jpeg".to_vec());

    assert!(Upload::from_path(dir.path().join("missing.png")).await.is_err());
}

#[tokio::test]
async fn test_callable_result_and_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/functions/v1/makeUserAdmin"))
        .and(body_json(json!({ "data": { "uid": "u2" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "User u2 has been made an admin."
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/functions/v1/makeUserAdmin"))
        .and(body_json(json!({ "data": { "uid": "u3" } })))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {
                "status": "PERMISSION_DENIED",
                "message": "Only admins can make other users admins."
            }
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/functions/v1/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let functions = FunctionsClient::new(
        &mock_server.uri(),
        "test_anon_key",
        Client::new(),
        SessionStore::new(),
    );

    let result = functions.call("makeUserAdmin", json!({ "uid": "u2" })).await.unwrap();
    assert_eq!(result, json!("User u2 has been made an admin."));

    let err = functions.call("makeUserAdmin", json!({ "uid": "u3" })).await.unwrap_err();
    assert!(err.is_permission_denied());
    assert_eq!(
        err.to_string(),
        "Permission denied: Only admins can make other users admins."
    );

    let err = functions.call("missing", json!({})).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}
