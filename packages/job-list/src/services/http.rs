//! [`CrawlService`] backed by the crawling service's REST API.

use async_trait::async_trait;
use crawl_api_client::{CrawlApiClient, CrawlApiError, QueueStatusResponse, StartCrawlBody};

use crate::error::{JobListError, Result};
use crate::traits::CrawlService;
use crate::types::{
    JobId, OwnerId, QueueJob, QueuePagination, QueueSnapshot, QueueStats, StartCrawl,
};

/// Adapter from the REST client to the [`CrawlService`] seam.
#[derive(Debug, Clone)]
pub struct HttpCrawlService {
    client: CrawlApiClient,
}

impl HttpCrawlService {
    pub fn new(client: CrawlApiClient) -> Self {
        Self { client }
    }
}

impl From<CrawlApiError> for JobListError {
    fn from(err: CrawlApiError) -> Self {
        match err.status() {
            Some(401) | Some(403) => JobListError::Unauthorized(err.to_string()),
            Some(409) => JobListError::Conflict(match &err {
                CrawlApiError::Api { message, .. } => message.clone(),
                other => other.to_string(),
            }),
            Some(400) | Some(422) => JobListError::Validation(err.to_string()),
            _ => JobListError::Store(err.to_string()),
        }
    }
}

fn into_snapshot(resp: QueueStatusResponse) -> QueueSnapshot {
    QueueSnapshot {
        jobs: resp
            .jobs
            .into_iter()
            .map(|j| QueueJob {
                id: j.id,
                job_id: j.job_id.map(JobId::new),
                url: j.url,
                status: j.status,
                depth: j.depth,
                created_at: j.created_at,
            })
            .collect(),
        queue_stats: QueueStats {
            pending: resp.queue_stats.pending,
            processing: resp.queue_stats.processing,
            completed: resp.queue_stats.completed,
            failed: resp.queue_stats.failed,
        },
        pagination: QueuePagination {
            next_cursor: resp.pagination.next_cursor,
            has_more: resp.pagination.has_more,
        },
    }
}

#[async_trait]
impl CrawlService for HttpCrawlService {
    async fn start_crawl(&self, request: &StartCrawl, owner: &OwnerId) -> Result<JobId> {
        let body = StartCrawlBody {
            start_url: request.start_url().to_string(),
            max_depth: request.max_depth(),
            allowed_domains: request.allowed_domains().map(<[String]>::to_vec),
            user_id: owner.as_str().to_string(),
        };
        let started = self.client.start_crawl(&body).await?;
        Ok(JobId::new(started.id))
    }

    async fn stop_job(&self, id: &JobId) -> Result<()> {
        self.client.stop_job(id.as_str()).await?;
        Ok(())
    }

    async fn queue_status(&self, cursor: Option<&str>, page_size: u32) -> Result<QueueSnapshot> {
        let resp = self.client.queue_status(cursor, page_size).await?;
        Ok(into_snapshot(resp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_map_to_error_kinds() {
        let api = |status: u16| CrawlApiError::Api {
            status,
            message: "job already finished".into(),
        };

        assert!(matches!(JobListError::from(api(401)), JobListError::Unauthorized(_)));
        assert!(matches!(JobListError::from(api(403)), JobListError::Unauthorized(_)));
        assert_eq!(
            JobListError::from(api(409)),
            JobListError::Conflict("job already finished".into())
        );
        assert!(matches!(JobListError::from(api(422)), JobListError::Validation(_)));
        assert!(matches!(JobListError::from(api(503)), JobListError::Store(_)));
    }

    #[test]
    fn test_snapshot_conversion() {
        let resp: QueueStatusResponse = serde_json::from_value(serde_json::json!({
            "jobs": [{"id": "q1", "jobId": "j1", "url": "https://example.org", "status": "pending"}],
            "queueStats": {"pending": 1},
            "pagination": {"nextCursor": "abc", "hasMore": true}
        }))
        .unwrap();

        let snapshot = into_snapshot(resp);
        assert_eq!(snapshot.jobs[0].job_id, Some(JobId::from("j1")));
        assert_eq!(snapshot.queue_stats.total(), 1);
        assert_eq!(snapshot.pagination.next_cursor.as_deref(), Some("abc"));
    }
}
