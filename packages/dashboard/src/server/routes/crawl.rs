//! POST /api/crawl

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use job_list::{JobId, StartCrawl};

use crate::server::error::ApiResult;
use crate::server::session::Session;
use crate::server::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartCrawlRequest {
    pub start_url: String,
    #[serde(default = "default_depth")]
    pub max_depth: u32,
    #[serde(default)]
    pub allowed_domains: Vec<String>,
}

fn default_depth() -> u32 {
    1
}

#[derive(Serialize)]
pub struct StartCrawlResponse {
    pub id: JobId,
}

pub async fn start_crawl(
    State(state): State<AppState>,
    Session(owner): Session,
    Json(body): Json<StartCrawlRequest>,
) -> ApiResult<(StatusCode, Json<StartCrawlResponse>)> {
    let request = StartCrawl::new(&body.start_url, body.max_depth, body.allowed_domains)?;
    let id = state.crawl_service.start_crawl(&request, &owner).await?;
    tracing::info!(job_id = %id, owner = %owner, "Crawl started");
    Ok((StatusCode::CREATED, Json(StartCrawlResponse { id })))
}
