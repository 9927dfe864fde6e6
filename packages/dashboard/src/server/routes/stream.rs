//! Live job list over SSE.
//!
//! GET /api/jobs/stream?page&pageSize&status
//!
//! Each connection mounts its own job list controller and streams every
//! published view as a `view` event. The controller lives inside the response
//! stream, so a disconnect drops it and releases its change-feed subscription.

use std::convert::Infallible;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream, StreamExt};

use job_list::{ControllerOptions, JobListController, JobListView, MAX_PAGE_SIZE};

use super::jobs::ListQuery;
use crate::server::error::{ApiResult, ApiError};
use crate::server::session::Session;
use crate::server::state::AppState;

pub async fn stream_jobs(
    State(state): State<AppState>,
    Session(owner): Session,
    Query(query): Query<ListQuery>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let filter = query.filter()?;
    let page_size = query.page_size.unwrap_or(state.page_size);
    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(ApiError::from(job_list::JobListError::validation(format!(
            "page size must be between 1 and {MAX_PAGE_SIZE}"
        ))));
    }

    let controller = JobListController::spawn(
        state.controller_deps(owner.clone()),
        ControllerOptions {
            page_size,
            filter,
            poll_interval: state.poll_interval,
            ..Default::default()
        },
    );

    let page = query.page.unwrap_or(1);
    if page > 1 {
        let mut rx = controller.watch();
        let _ = rx
            .wait_for(|v| v.refreshed_at.is_some() || v.error.is_some())
            .await;
        let outcome = controller.set_page(page).await;
        tracing::debug!(page, ?outcome, "Initial page for stream");
    }
    tracing::info!(owner = %owner, "Job list stream opened");

    let connected =
        stream::once(async { Ok::<_, Infallible>(Event::default().event("connected").data("ok")) });
    let views = view_stream(controller).filter_map(|view| async move {
        Event::default()
            .event("view")
            .json_data(&view)
            .ok()
            .map(Ok)
    });

    Ok(Sse::new(connected.chain(views)).keep_alive(KeepAlive::default()))
}

/// Current view, then one item per published change. Ends when the
/// controller stops.
fn view_stream(controller: JobListController) -> impl Stream<Item = JobListView> {
    let rx = controller.watch();
    stream::unfold((controller, rx, true), |(controller, mut rx, first)| async move {
        if !first {
            rx.changed().await.ok()?;
        }
        let view = rx.borrow_and_update().clone();
        Some((view, (controller, rx, false)))
    })
}
