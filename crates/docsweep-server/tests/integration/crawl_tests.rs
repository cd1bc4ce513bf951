use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate, Times};

use docsweep_client::WebhookConfig;
use docsweep_server::state::AppState;

use crate::common::{app, body_json, post_json};

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><head><title>Docs</title></head><body>{body}</body></html>"),
        "text/html; charset=utf-8",
    )
}

fn enqueued(task_uid: u64) -> ResponseTemplate {
    ResponseTemplate::new(202).set_body_json(json!({
        "taskUid": task_uid,
        "indexUid": "docs",
        "status": "enqueued",
        "type": "documentAdditionOrUpdate",
        "enqueuedAt": "2024-01-01T00:00:00Z"
    }))
}

async fn docs_site() -> MockServer {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/"))
        .respond_with(html(
            r#"<h1>Welcome</h1><p>Start here.</p><a href="/docs/a">Next</a><a href="/blog/">Blog</a>"#,
        ))
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/docs/a"))
        .respond_with(html("<h1>Install</h1><p>Run the installer.</p>"))
        .mount(&site)
        .await;
    site
}

/// Meilisearch without the `docs` index, expecting `batches` document additions.
async fn fresh_meilisearch(batches: impl Into<Times>) -> MockServer {
    let meili = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexes/docs"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "Index `docs` not found.",
            "code": "index_not_found"
        })))
        .mount(&meili)
        .await;
    Mock::given(method("POST"))
        .and(path("/indexes"))
        .respond_with(enqueued(1))
        .expect(1)
        .mount(&meili)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/indexes/docs/settings"))
        .respond_with(enqueued(2))
        .expect(1)
        .mount(&meili)
        .await;
    Mock::given(method("POST"))
        .and(path("/indexes/docs/documents"))
        .respond_with(enqueued(3))
        .expect(batches)
        .mount(&meili)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/tasks/\d+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uid": 1,
            "status": "succeeded"
        })))
        .mount(&meili)
        .await;
    meili
}

#[tokio::test]
async fn sync_crawl_indexes_the_site_and_reports() {
    let site = docs_site().await;
    let meili = fresh_meilisearch(1u64..).await;
    let spec = json!({
        "start_urls": [format!("{}/docs/", site.uri())],
        "index_uid": "docs",
        "meilisearch_url": meili.uri(),
        "max_concurrency": 2
    });
    let state = AppState {
        allow_private_urls: true,
        ..AppState::default()
    };

    let response = app(state)
        .oneshot(post_json("/crawl/sync", &spec))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report["index_uid"], "docs");
    assert_eq!(report["staged"], false);
    assert_eq!(report["stats"]["pages_visited"], 2);
    assert_eq!(report["stats"]["documents_sent"], 2);
}

#[tokio::test]
async fn private_hosts_are_refused_by_default() {
    let site = docs_site().await;
    let meili = fresh_meilisearch(0u64).await;
    let spec = json!({
        "start_urls": [format!("{}/docs/", site.uri())],
        "index_uid": "docs",
        "meilisearch_url": meili.uri()
    });

    let response = app(AppState::default())
        .oneshot(post_json("/crawl/sync", &spec))
        .await
        .unwrap();

    // Refused loads are skipped like any other failed page.
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report["stats"]["documents_sent"], 0);
    assert_eq!(site.received_requests().await.unwrap().len(), 0);
}

#[tokio::test]
async fn background_crawl_is_accepted_immediately() {
    let spec = json!({
        "start_urls": ["https://docs.example.com/"],
        "index_uid": "docs",
        "meilisearch_url": "http://127.0.0.1:9"
    });

    let response = app(AppState::default())
        .oneshot(post_json("/crawl", &spec))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    assert_eq!(json["status"], "started");
    assert_eq!(json["index_uid"], "docs");
}

#[tokio::test]
async fn trusted_hosts_are_crawled_without_opening_private_networks() {
    let site = docs_site().await;
    let meili = fresh_meilisearch(1u64..).await;
    let spec = json!({
        "start_urls": [format!("{}/docs/", site.uri())],
        "index_uid": "docs",
        "meilisearch_url": meili.uri()
    });
    let state = AppState {
        trusted_hosts: vec!["127.0.0.1".to_string()],
        ..AppState::default()
    };

    let response = app(state)
        .oneshot(post_json("/crawl/sync", &spec))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report["stats"]["documents_sent"], 2);
}

#[tokio::test]
async fn async_alias_starts_a_background_crawl() {
    let spec = json!({
        "start_urls": ["https://docs.example.com/"],
        "index_uid": "docs",
        "meilisearch_url": "http://127.0.0.1:9"
    });

    let response = app(AppState::default())
        .oneshot(post_json("/crawl/async", &spec))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(body_json(response).await["status"], "started");
}

#[tokio::test]
async fn start_replies_after_the_started_webhook() {
    let hook = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&hook)
        .await;
    let spec = json!({
        "start_urls": ["https://docs.example.com/"],
        "index_uid": "docs",
        "meilisearch_url": "http://127.0.0.1:9"
    });
    let state = AppState {
        webhook: Some(WebhookConfig {
            url: format!("{}/hook", hook.uri()),
            token: None,
        }),
        ..AppState::default()
    };

    let response = app(state)
        .oneshot(post_json("/crawl/start", &spec))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let delivered = hook.received_requests().await.unwrap();
    let first: serde_json::Value = serde_json::from_slice(&delivered[0].body).unwrap();
    assert_eq!(first["status"], "started");
    assert_eq!(first["index_uid"], "docs");
}
