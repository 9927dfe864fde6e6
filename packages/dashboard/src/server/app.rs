//! Application setup and server configuration.

use std::time::Duration;

use axum::{
    http::{header::CONTENT_TYPE, HeaderName, Method},
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::server::routes::{
    delete_job, health_handler, list_jobs, list_pages, start_crawl, stop_job, stream_jobs,
};
use crate::server::session::USER_ID_HEADER;
use crate::server::state::AppState;

/// Build the Axum application router
pub fn build_app(state: AppState) -> Router {
    // CORS configuration - allow any origin for development
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(USER_ID_HEADER)]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/jobs", get(list_jobs))
        .route("/api/jobs/stream", get(stream_jobs))
        .route("/api/jobs/:id", delete(delete_job))
        .route("/api/jobs/:id/stop", post(stop_job))
        .route("/api/jobs/:id/pages", get(list_pages))
        .route("/api/crawl", post(start_crawl))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
