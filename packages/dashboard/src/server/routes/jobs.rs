//! Job list endpoints.
//!
//! GET    /api/jobs?page&pageSize&status
//! POST   /api/jobs/:id/stop
//! DELETE /api/jobs/:id
//! GET    /api/jobs/:id/pages?page&pageSize

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use job_list::actions;
use job_list::{
    CrawledPage, JobId, JobPage, PageRequest, StatusFilter, DEFAULT_PAGE_SIZE,
};

use crate::server::error::{ApiError, ApiResult};
use crate::server::session::Session;
use crate::server::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub status: Option<String>,
}

impl ListQuery {
    pub fn filter(&self) -> job_list::Result<StatusFilter> {
        self.status
            .as_deref()
            .map(str::parse::<StatusFilter>)
            .transpose()
            .map(Option::unwrap_or_default)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListResponse {
    #[serde(flatten)]
    pub page: JobPage,
    pub total_pages: u32,
}

pub async fn list_jobs(
    State(state): State<AppState>,
    Session(owner): Session,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<JobListResponse>> {
    let filter = query.filter()?;
    let page = state
        .query_client(owner)
        .fetch_jobs(
            query.page.unwrap_or(1),
            query.page_size.unwrap_or(state.page_size),
            filter,
        )
        .await?;

    Ok(Json(JobListResponse {
        total_pages: page.total_pages(),
        page,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopResponse {
    pub id: JobId,
    pub stop_requested: bool,
}

pub async fn stop_job(
    State(state): State<AppState>,
    Session(owner): Session,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<StopResponse>)> {
    let stores = state.stores.for_owner(owner);
    let job = actions::resolve_job(&[], stores.store.as_ref(), &JobId::new(id)).await?;
    actions::stop_job(state.crawl_service.as_ref(), &job).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(StopResponse {
            id: job.id,
            stop_requested: true,
        }),
    ))
}

pub async fn delete_job(
    State(state): State<AppState>,
    Session(owner): Session,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let stores = state.stores.for_owner(owner);
    let job = actions::resolve_job(&[], stores.store.as_ref(), &JobId::new(id)).await?;
    actions::delete_job(stores.store.as_ref(), &job).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_pages(
    State(state): State<AppState>,
    Session(owner): Session,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<CrawledPage>>> {
    let request = PageRequest::new(
        query.page.unwrap_or(1),
        query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        StatusFilter::All,
    )?;
    let id = JobId::new(id);
    let stores = state.stores.for_owner(owner);

    if stores.store.get(&id).await?.is_none() {
        return Err(ApiError::NotFound(format!("job {id}")));
    }
    let pages = stores.store.list_pages(&id, request.range()).await?;
    Ok(Json(pages))
}
