use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use holden_db::HandleSettings;
use holden_server::{app, AppState};
use holden_store::open_store;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt; // for oneshot

/// Builds the app over a fresh on-disk database.
///
/// The `TempDir` must outlive the router.
fn setup_app() -> (Router, TempDir) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("holden.db");
    let pool = open_store(
        path.to_str().expect("temp path should be utf-8"),
        HandleSettings::default(),
    )
    .expect("failed to open store");

    (app(AppState { pool }), dir)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_create_get_and_list_scenario() {
    let (app, _dir) = setup_app();

    let (status, anna) = send(
        &app,
        post_json(
            "/holden",
            json!({"name": "Anna", "age": 30, "height": 1.7}).to_string(),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(anna, json!({"id": 1, "name": "Anna", "age": 30, "height": 1.7}));

    let (status, fetched) = send(&app, get("/holden/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, anna);

    let (status, body) = send(&app, get("/holden/999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, bob) = send(
        &app,
        post_json(
            "/holden",
            json!({"name": "Bob", "age": 25, "height": 1.8}).to_string(),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bob["id"], 2);

    let (status, all) = send(&app, get("/holden")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all, json!([anna, bob]));
}

#[tokio::test]
async fn test_list_empty_returns_empty_array() {
    let (app, _dir) = setup_app();

    let (status, all) = send(&app, get("/holden")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all, json!([]));
}

#[tokio::test]
async fn test_create_ignores_client_supplied_id() {
    let (app, _dir) = setup_app();

    let (status, created) = send(
        &app,
        post_json(
            "/holden",
            json!({"id": 77, "name": "Cleo", "age": 40, "height": 1.65}).to_string(),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["id"], 1);

    let (status, _) = send(&app, get("/holden/77")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_with_missing_fields_stores_zero_values() {
    let (app, _dir) = setup_app();

    let (status, created) =
        send(&app, post_json("/holden", json!({"name": "Dee"}).to_string())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created, json!({"id": 1, "name": "Dee", "age": 0, "height": 0.0}));
}

#[tokio::test]
async fn test_create_malformed_json_is_bad_request() {
    let (app, _dir) = setup_app();

    let (status, body) = send(&app, post_json("/holden", "{\"name\": ".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, all) = send(&app, get("/holden")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all, json!([]), "nothing should be stored");
}

#[tokio::test]
async fn test_create_without_content_type_is_decoded_as_json() {
    let (app, _dir) = setup_app();

    let request = Request::builder()
        .uri("/holden")
        .method("POST")
        .body(Body::from(r#"{"name":"Anna","age":30,"height":1.7}"#))
        .unwrap();
    let (status, created) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created, json!({"id": 1, "name": "Anna", "age": 30, "height": 1.7}));

    let (status, fetched) = send(&app, get("/holden/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_get_non_numeric_id_is_bad_request() {
    let (app, _dir) = setup_app();

    let (status, body) = send(&app, get("/holden/abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_database_failure_is_internal_error_not_not_found() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("no_schema.db");
    let pool = holden_db::open(
        path.to_str().expect("temp path should be utf-8"),
        HandleSettings::default(),
    )
    .expect("failed to open database");
    let app = app(AppState { pool });

    let (status, body) = send(&app, get("/holden/1")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());

    let (status, _) = send(&app, get("/holden")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_concurrent_creates_are_all_listed() {
    let (app, _dir) = setup_app();

    let mut handles = Vec::new();
    for i in 0..16 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            let body = json!({"name": format!("holden-{i}"), "age": i, "height": 1.5});
            send(&app, post_json("/holden", body.to_string())).await
        }));
    }

    for handle in handles {
        let (status, _) = handle.await.expect("task should not panic");
        assert_eq!(status, StatusCode::OK);
    }

    let (status, all) = send(&app, get("/holden")).await;
    assert_eq!(status, StatusCode::OK);
    let all = all.as_array().expect("list should be an array");
    assert_eq!(all.len(), 16);

    let ids: Vec<i64> = all.iter().map(|h| h["id"].as_i64().unwrap()).collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(ids, sorted, "list should come back in id order");
}

#[tokio::test]
async fn test_health_check_returns_ok() {
    let (app, _dir) = setup_app();

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}
