use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use http_body_util::BodyExt;

use docsweep_server::routes;
use docsweep_server::state::AppState;

pub const TEST_API_KEY: &str = "test-secret-key";

/// Router over the given state, without touching the environment.
pub fn app(state: AppState) -> Router {
    routes::router(Arc::new(state))
}

/// Router that requires [`TEST_API_KEY`] on crawl endpoints.
pub fn app_with_auth() -> Router {
    app(AppState {
        api_key: Some(TEST_API_KEY.to_string()),
        ..AppState::default()
    })
}

pub fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}
