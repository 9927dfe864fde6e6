//! Exercises the client against a local axum stand-in for the crawling service.

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use crawl_api_client::{CrawlApiClient, CrawlApiError, StartCrawlBody};
use serde_json::{json, Value};
use std::collections::HashMap;

async fn spawn_service() -> String {
    let app = Router::new()
        .route(
            "/api/crawl",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                if headers.get("authorization").and_then(|v| v.to_str().ok())
                    != Some("Bearer secret")
                {
                    return (StatusCode::UNAUTHORIZED, Json(json!({"error": "missing token"})));
                }
                let id = format!("job-for-{}", body["userId"].as_str().unwrap_or_default());
                (StatusCode::OK, Json(json!({ "id": id })))
            }),
        )
        .route(
            "/api/queue/stop/:id",
            post(|Path(id): Path<String>| async move {
                if id == "finished" {
                    (StatusCode::CONFLICT, Json(json!({"error": "job already finished"})))
                } else {
                    (StatusCode::OK, Json(json!({})))
                }
            }),
        )
        .route(
            "/api/queue/status",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let cursor = params.get("cursor").cloned();
                Json(json!({
                    "jobs": [{
                        "id": "q1",
                        "jobId": "job-1",
                        "url": "https://example.org/a",
                        "status": "processing",
                        "depth": 1
                    }],
                    "queueStats": {"pending": 4, "processing": 1},
                    "pagination": {
                        "nextCursor": cursor.map(|c| format!("{c}-next")).unwrap_or_else(|| "c1".into()),
                        "hasMore": true,
                        "pageSize": params.get("pageSize").and_then(|s| s.parse::<u32>().ok())
                    }
                }))
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn body(user: &str) -> StartCrawlBody {
    StartCrawlBody {
        start_url: "https://example.org".into(),
        max_depth: 1,
        allowed_domains: Some(vec!["example.org".into()]),
        user_id: user.into(),
    }
}

#[tokio::test]
async fn start_crawl_returns_service_id() {
    let base = spawn_service().await;
    let client = CrawlApiClient::new(&base, Some("secret".into())).unwrap();

    let started = client.start_crawl(&body("u1")).await.unwrap();
    assert_eq!(started.id, "job-for-u1");
}

#[tokio::test]
async fn start_crawl_without_token_surfaces_status_and_message() {
    let base = spawn_service().await;
    let client = CrawlApiClient::new(&base, None).unwrap();

    let err = client.start_crawl(&body("u1")).await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    match err {
        CrawlApiError::Api { message, .. } => assert_eq!(message, "missing token"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn stop_job_maps_conflict() {
    let base = spawn_service().await;
    let client = CrawlApiClient::new(&base, None).unwrap();

    client.stop_job("running-job").await.unwrap();
    let err = client.stop_job("finished").await.unwrap_err();
    assert_eq!(err.status(), Some(409));
}

#[tokio::test]
async fn queue_status_passes_cursor_and_page_size() {
    let base = spawn_service().await;
    let client = CrawlApiClient::new(&base, None).unwrap();

    let first = client.queue_status(None, 25).await.unwrap();
    assert_eq!(first.jobs.len(), 1);
    assert_eq!(first.jobs[0].job_id.as_deref(), Some("job-1"));
    assert_eq!(first.queue_stats.pending, 4);
    assert_eq!(first.queue_stats.completed, 0);
    assert_eq!(first.pagination.page_size, Some(25));
    assert_eq!(first.pagination.next_cursor.as_deref(), Some("c1"));

    let second = client.queue_status(Some("c1"), 25).await.unwrap();
    assert_eq!(second.pagination.next_cursor.as_deref(), Some("c1-next"));
}
