//! HTTP tests for the bookmark routes, driven through the router over the
//! in-memory repository and queue.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use linkstash_api::router;
use linkstash_core::{
    BookmarkRepository, BookmarkService, EnrichmentJobStatus, MemoryBookmarkRepository,
    MemoryEnrichmentQueue, PageMetadata,
};

struct TestApp {
    router: Router,
    repo: Arc<MemoryBookmarkRepository>,
    queue: Arc<MemoryEnrichmentQueue>,
}

fn test_app() -> TestApp {
    let repo = Arc::new(MemoryBookmarkRepository::new());
    let queue = Arc::new(MemoryEnrichmentQueue::new());
    let service = BookmarkService::new(repo.clone(), queue.clone());
    TestApp {
        router: router(service),
        repo,
        queue,
    }
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn create(app: &TestApp, url: &str, tags: &[&str]) -> Value {
    let (status, body) = send(
        app,
        post_json("/api/bookmarks", json!({ "url": url, "tags": tags })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED, "{body}");
    body
}

#[tokio::test]
async fn test_health() {
    let app = test_app();
    let (status, body) = send(&app, get("/up")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_request_id_header_is_set() {
    let app = test_app();
    let response = app.router.clone().oneshot(get("/up")).await.unwrap();
    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap();
    let parsed = uuid::Uuid::parse_str(request_id).unwrap();
    assert_eq!(parsed.get_version_num(), 7);
}

#[tokio::test]
async fn test_create_returns_accepted_pending_bookmark() {
    let app = test_app();
    let body = create(&app, "https://example.com/a", &[" rust ", "rust", ""]).await;

    assert_eq!(body["url"], "https://example.com/a");
    assert_eq!(body["status"], "pending");
    assert_eq!(body["tags"], json!(["rust"]));
    assert!(body["title"].is_null());
    assert!(body["fetched_at"].is_null());
    assert!(body["id"].as_i64().unwrap() > 0);
    assert!(body["created_at"].is_string());
    assert!(body.get("updated_at").is_none());

    let jobs = app.queue.jobs().await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].bookmark_id, body["id"].as_i64().unwrap());
    assert_eq!(jobs[0].status, EnrichmentJobStatus::Pending);
}

#[tokio::test]
async fn test_create_without_tags() {
    let app = test_app();
    let (status, body) = send(
        &app,
        post_json("/api/bookmarks", json!({ "url": "https://example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["tags"], json!([]));
}

#[tokio::test]
async fn test_create_with_null_tags() {
    let app = test_app();
    let (status, body) = send(
        &app,
        post_json(
            "/api/bookmarks",
            json!({ "url": "https://example.com/null-tags", "tags": null }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED, "{body}");
    assert_eq!(body["tags"], json!([]));
    assert_eq!(app.queue.jobs().await.len(), 1);
}

#[tokio::test]
async fn test_create_invalid_url_is_bad_request() {
    let app = test_app();
    for url in ["", "   ", "not a url", "ftp://example.com/file"] {
        let (status, body) =
            send(&app, post_json("/api/bookmarks", json!({ "url": url }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "url {url:?}");
        assert!(body["error"].is_string());
    }
    assert!(app.queue.jobs().await.is_empty());
}

#[tokio::test]
async fn test_create_malformed_body_is_bad_request() {
    let app = test_app();
    let (status, body) = send(&app, post_json("/api/bookmarks", json!({ "tags": [] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_create_duplicate_is_conflict() {
    let app = test_app();
    create(&app, "https://example.com/dup", &[]).await;

    let (status, body) = send(
        &app,
        post_json("/api/bookmarks", json!({ "url": "https://example.com/dup" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already exists"));
    assert_eq!(app.queue.jobs().await.len(), 1);
}

#[tokio::test]
async fn test_get_by_id() {
    let app = test_app();
    let created = create(&app, "https://example.com/get", &["a"]).await;
    let id = created["id"].as_i64().unwrap();

    let (status, body) = send(&app, get(&format!("/api/bookmarks/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, created);
}

#[tokio::test]
async fn test_get_missing_is_not_found() {
    let app = test_app();
    let (status, body) = send(&app, get("/api/bookmarks/999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Bookmark 999 not found");
}

#[tokio::test]
async fn test_non_numeric_id_is_bad_request() {
    let app = test_app();
    for request in [get("/api/bookmarks/abc"), delete("/api/bookmarks/abc")] {
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "invalid id" }));
    }
}

#[tokio::test]
async fn test_list_newest_first() {
    let app = test_app();
    let first = create(&app, "https://example.com/1", &[]).await;
    let second = create(&app, "https://example.com/2", &[]).await;

    let (status, body) = send(&app, get("/api/bookmarks")).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["id"].as_i64().unwrap())
        .collect();
    assert_eq!(
        ids,
        vec![second["id"].as_i64().unwrap(), first["id"].as_i64().unwrap()]
    );
}

#[tokio::test]
async fn test_list_empty() {
    let app = test_app();
    let (status, body) = send(&app, get("/api/bookmarks")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_delete_then_get_is_not_found() {
    let app = test_app();
    let created = create(&app, "https://example.com/del", &[]).await;
    let id = created["id"].as_i64().unwrap();

    let (status, body) = send(&app, delete(&format!("/api/bookmarks/{id}"))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = send(&app, get(&format!("/api/bookmarks/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, delete(&format!("/api/bookmarks/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_search_by_text_and_tags() {
    let app = test_app();
    let rust = create(&app, "https://example.com/rust", &["lang"]).await;
    let go = create(&app, "https://example.com/go", &["lang", "google"]).await;
    create(&app, "https://example.com/soup", &["food"]).await;

    // Enrich directly through the repository, as the worker would.
    for (id, title) in [(&rust["id"], "The Rust Book"), (&go["id"], "Effective Go")] {
        let mut bookmark = app.repo.find_by_id(id.as_i64().unwrap()).await.unwrap();
        bookmark
            .apply_enrichment(
                PageMetadata {
                    title: Some(title.to_string()),
                    ..Default::default()
                },
                chrono::Utc::now(),
            )
            .unwrap();
        app.repo.save(bookmark.into()).await.unwrap();
    }

    let (status, body) = send(&app, get("/api/bookmarks/search?q=rust")).await;
    assert_eq!(status, StatusCode::OK);
    let results = body.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["title"], "The Rust Book");
    assert_eq!(results[0]["status"], "fetched");
    assert!(results[0]["fetched_at"].is_string());

    let (_, body) = send(&app, get("/api/bookmarks/search?tags=google,food")).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = send(&app, get("/api/bookmarks/search?tags=google&tags=food")).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = send(&app, get("/api/bookmarks/search?q=effective&tags=lang")).await;
    let results = body.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["id"], go["id"]);

    // No filters returns everything.
    let (_, body) = send(&app, get("/api/bookmarks/search")).await;
    assert_eq!(body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_search_with_blank_query_returns_everything() {
    let app = test_app();
    create(&app, "https://example.com/one", &[]).await;
    create(&app, "https://example.com/two", &[]).await;

    let (status, body) = send(&app, get("/api/bookmarks/search?q=%20%20")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = test_app();
    let response = app
        .router
        .clone()
        .oneshot(get("/api/unknown"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
