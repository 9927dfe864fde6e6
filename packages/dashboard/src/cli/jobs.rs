//! `dashboard jobs ...`

use anyhow::{bail, Result};
use std::sync::Arc;

use job_list::actions;
use job_list::{
    ControllerDeps, ControllerOptions, JobId, JobListController, JobQueryClient, JobStore,
    PageRequest, StatusFilter,
};

use super::output;
use super::{CliContext, ListArgs};

fn parse_args(ctx: &CliContext, args: &ListArgs) -> Result<(StatusFilter, u32)> {
    let filter: StatusFilter = args.status.parse()?;
    Ok((filter, args.page_size.unwrap_or(ctx.config.job_list_page_size)))
}

pub async fn list(ctx: &CliContext, args: &ListArgs) -> Result<()> {
    let (filter, page_size) = parse_args(ctx, args)?;
    let store = Arc::new(ctx.store().await?);
    let page = JobQueryClient::new(store)
        .fetch_jobs(args.page, page_size, filter)
        .await?;
    output::print_page(&page);
    Ok(())
}

pub async fn watch(ctx: &CliContext, args: &ListArgs) -> Result<()> {
    let (filter, page_size) = parse_args(ctx, args)?;
    let store = Arc::new(ctx.store().await?);
    let controller = JobListController::spawn(
        ControllerDeps {
            store: store.clone(),
            feed: store,
            crawl_service: ctx.crawl_service()?,
        },
        ControllerOptions {
            page_size,
            filter,
            poll_interval: ctx.config.job_list_poll_interval(),
            ..Default::default()
        },
    );

    let mut rx = controller.watch();
    if args.page > 1 {
        let _ = rx
            .wait_for(|v| v.refreshed_at.is_some() || v.error.is_some())
            .await;
        if let Some(failure) = controller.set_page(args.page).await.failure() {
            bail!("{}", failure.message);
        }
    }

    loop {
        output::print_view(&rx.borrow_and_update().clone());
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    controller.shutdown().await;
    Ok(())
}

pub async fn stop(ctx: &CliContext, id: &str) -> Result<()> {
    let store = ctx.store().await?;
    let service = ctx.crawl_service()?;
    let job = actions::resolve_job(&[], &store, &JobId::from(id)).await?;
    actions::stop_job(service.as_ref(), &job).await?;
    output::success(&format!("Stop requested for {}", job.id));
    Ok(())
}

pub async fn delete(ctx: &CliContext, id: &str) -> Result<()> {
    let store = ctx.store().await?;
    let job = actions::resolve_job(&[], &store, &JobId::from(id)).await?;
    actions::delete_job(&store, &job).await?;
    output::success(&format!("Deleted {}", job.id));
    Ok(())
}

pub async fn pages(ctx: &CliContext, id: &str, page: u32, page_size: u32) -> Result<()> {
    let request = PageRequest::new(page, page_size, StatusFilter::All)?;
    let store = ctx.store().await?;
    let id = JobId::from(id);
    if store.get(&id).await?.is_none() {
        bail!("job {id} not found");
    }
    let pages = store.list_pages(&id, request.range()).await?;
    output::print_pages(&pages);
    Ok(())
}
