use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use docsweep_server::state::AppState;

use crate::common::{TEST_API_KEY, app, app_with_auth, body_json, post_json};

fn minimal_spec() -> serde_json::Value {
    json!({
        "start_urls": ["https://docs.example.com/"],
        "index_uid": "docs",
        "meilisearch_url": "http://127.0.0.1:7700"
    })
}

#[tokio::test]
async fn health_returns_200() {
    let response = app(AppState::default())
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn webhook_sink_acknowledges_payloads() {
    let response = app(AppState::default())
        .oneshot(post_json("/webhook", &json!({"status": "started", "index_uid": "docs"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn malformed_json_returns_400() {
    let response = app(AppState::default())
        .oneshot(
            Request::post("/crawl")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "serialization_error");
}

#[tokio::test]
async fn zero_batch_size_is_an_invalid_spec() {
    let mut spec = minimal_spec();
    spec["batch_size"] = json!(0);

    let response = app(AppState::default())
        .oneshot(post_json("/crawl", &spec))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_spec");
    assert!(json["message"].as_str().unwrap().contains("batch_size"));
}

#[tokio::test]
async fn missing_meilisearch_url_is_rejected() {
    let spec = json!({"start_urls": ["https://docs.example.com/"], "index_uid": "docs"});

    let response = app(AppState::default())
        .oneshot(post_json("/crawl", &spec))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_spec");
}

#[tokio::test]
async fn crawl_without_credentials_returns_401() {
    let response = app_with_auth()
        .oneshot(post_json("/crawl", &minimal_spec()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "unauthorized");
}

#[tokio::test]
async fn wrong_api_key_returns_401() {
    let mut request = post_json("/crawl/sync", &minimal_spec());
    request
        .headers_mut()
        .insert("authorization", "Bearer wrong-key".parse().unwrap());

    let response = app_with_auth().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn valid_key_reaches_spec_validation() {
    let mut spec = minimal_spec();
    spec["start_urls"] = json!([]);
    let mut request = post_json("/crawl", &spec);
    request.headers_mut().insert(
        "authorization",
        format!("Bearer {TEST_API_KEY}").parse().unwrap(),
    );

    let response = app_with_auth().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_stays_public_when_auth_is_on() {
    let response = app_with_auth()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
