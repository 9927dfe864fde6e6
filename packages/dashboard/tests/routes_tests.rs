//! API routes against the in-memory store and a mock crawling service.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use dashboard::server::{build_app, AppState, USER_ID_HEADER};
use job_list::testing::{MockCrawlCall, MockCrawlService};
use job_list::{CrawledPage, Job, JobId, JobStatus, MemoryJobStore, OwnerId};

struct TestApp {
    app: Router,
    memory: MemoryJobStore,
    service: Arc<MockCrawlService>,
}

fn test_app() -> TestApp {
    let memory = MemoryJobStore::new();
    let service = Arc::new(MockCrawlService::new().backed_by(memory.clone()));
    let app = build_app(AppState {
        stores: Arc::new(memory.clone()),
        crawl_service: service.clone(),
        page_size: 10,
        poll_interval: None,
    });
    TestApp {
        app,
        memory,
        service,
    }
}

fn seed(memory: &MemoryJobStore, owner: &str, n: usize, status: JobStatus) {
    let base = chrono::Utc::now() - chrono::Duration::hours(1);
    for i in 0..n {
        memory.insert_job(
            Job::pending(
                format!("{owner}-{}-{i:02}", status.as_str()),
                "https://example.org",
                OwnerId::new(owner),
            )
            .with_status(status.clone())
            .with_created_at(base + chrono::Duration::seconds(i as i64)),
        );
    }
}

async fn send(app: &Router, method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(USER_ID_HEADER, user);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

#[tokio::test]
async fn test_health() {
    let t = test_app();
    let (status, body) = send(&t.app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_missing_session_is_401() {
    let t = test_app();
    let (status, body) = send(&t.app, "GET", "/api/jobs", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "unauthorized");
}

#[tokio::test]
async fn test_list_jobs_filters_and_paginates() {
    let t = test_app();
    seed(&t.memory, "u1", 23, JobStatus::Running);
    seed(&t.memory, "u1", 4, JobStatus::Failed);
    seed(&t.memory, "u2", 5, JobStatus::Running);

    let (status, body) = send(
        &t.app,
        "GET",
        "/api/jobs?status=running&pageSize=10",
        Some("u1"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 23);
    assert_eq!(body["totalPages"], 3);
    assert_eq!(body["rows"].as_array().unwrap().len(), 10);
    assert_eq!(body["rows"][0]["id"], "u1-running-22");
}

#[tokio::test]
async fn test_invalid_query_is_400() {
    let t = test_app();
    let (status, body) = send(&t.app, "GET", "/api/jobs?pageSize=500", Some("u1"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (status, _) = send(&t.app, "GET", "/api/jobs?status=archived", Some("u1"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_store_outage_is_502() {
    let t = test_app();
    t.memory.set_unavailable(true);
    let (status, body) = send(&t.app, "GET", "/api/jobs", Some("u1"), None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["kind"], "store");
}

#[tokio::test]
async fn test_stop_job() {
    let t = test_app();
    seed(&t.memory, "u1", 1, JobStatus::Running);
    seed(&t.memory, "u1", 1, JobStatus::Completed);

    let (status, body) = send(&t.app, "POST", "/api/jobs/u1-running-00/stop", Some("u1"), None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["stopRequested"], true);
    assert_eq!(t.service.stop_calls(), vec![JobId::from("u1-running-00")]);

    let (status, body) =
        send(&t.app, "POST", "/api/jobs/u1-completed-00/stop", Some("u1"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");
    assert_eq!(t.service.stop_calls().len(), 1);
}

#[tokio::test]
async fn test_delete_job() {
    let t = test_app();
    seed(&t.memory, "u1", 1, JobStatus::Failed);
    seed(&t.memory, "u1", 1, JobStatus::Pending);

    let (status, _) = send(&t.app, "DELETE", "/api/jobs/u1-failed-00", Some("u1"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&t.app, "DELETE", "/api/jobs/u1-pending-00", Some("u1"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Someone else's job is invisible
    let (status, _) = send(&t.app, "DELETE", "/api/jobs/u1-pending-00", Some("u2"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(t.memory.job_count(), 1);
}

#[tokio::test]
async fn test_list_pages() {
    let t = test_app();
    seed(&t.memory, "u1", 1, JobStatus::Crawled);
    t.memory.insert_page(CrawledPage {
        id: "p1".into(),
        job_id: JobId::from("u1-crawled-00"),
        url: "https://example.org/about".into(),
        title: Some("About".into()),
        depth: 1,
        status: "processed".into(),
        content: None,
        created_at: chrono::Utc::now(),
    });

    let (status, body) =
        send(&t.app, "GET", "/api/jobs/u1-crawled-00/pages", Some("u1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = send(&t.app, "GET", "/api/jobs/missing/pages", Some("u1"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_start_crawl() {
    let t = test_app();
    let (status, body) = send(
        &t.app,
        "POST",
        "/api/crawl",
        Some("u1"),
        Some(serde_json::json!({"startUrl": "https://example.org", "maxDepth": 2})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["id"].is_string());
    assert_eq!(t.memory.job_count(), 1);
    assert!(matches!(
        t.service.calls().as_slice(),
        [MockCrawlCall::StartCrawl { max_depth: 2, .. }]
    ));

    let (status, _) = send(
        &t.app,
        "POST",
        "/api/crawl",
        Some("u1"),
        Some(serde_json::json!({"startUrl": "ftp://example.org"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stream_requires_session() {
    let t = test_app();
    let (status, _) = send(&t.app, "GET", "/api/jobs/stream", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
