//! Row-level mutations shared by the controller and server routes.
//!
//! Both check the job's status before reaching out, so a request that cannot
//! succeed never leaves the process.

use tracing::info;

use crate::error::{JobListError, Result};
use crate::traits::{CrawlService, JobStore};
use crate::types::{Job, JobId};

/// Find a job among the displayed rows, falling back to the store.
pub async fn resolve_job(rows: &[Job], store: &dyn JobStore, id: &JobId) -> Result<Job> {
    if let Some(job) = rows.iter().find(|j| &j.id == id) {
        return Ok(job.clone());
    }
    store
        .get(id)
        .await?
        .ok_or_else(|| JobListError::validation(format!("unknown job {id}")))
}

/// Request a stop for a queued or running job.
pub async fn stop_job(service: &dyn CrawlService, job: &Job) -> Result<()> {
    if !job.is_stoppable() {
        return Err(JobListError::Conflict(format!(
            "job {} is {} and cannot be stopped",
            job.id, job.status
        )));
    }
    service.stop_job(&job.id).await?;
    info!(job_id = %job.id, "Stop requested");
    Ok(())
}

/// Delete a job that is no longer in flight.
pub async fn delete_job(store: &dyn JobStore, job: &Job) -> Result<()> {
    if !job.is_deletable() {
        return Err(JobListError::Conflict(format!(
            "job {} is {} and cannot be deleted",
            job.id, job.status
        )));
    }
    store.delete(&job.id).await?;
    info!(job_id = %job.id, "Job deleted");
    Ok(())
}
