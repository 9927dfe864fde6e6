//! The external crawling service.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{JobId, OwnerId, QueueSnapshot, StartCrawl};

/// Operations the dashboard delegates to the crawling service over HTTP.
#[async_trait]
pub trait CrawlService: Send + Sync {
    /// Initiate a crawl job for `owner`. Returns the new job id.
    async fn start_crawl(&self, request: &StartCrawl, owner: &OwnerId) -> Result<JobId>;

    /// Request cessation of an in-flight job.
    async fn stop_job(&self, id: &JobId) -> Result<()>;

    /// Snapshot of the worker queue.
    async fn queue_status(&self, cursor: Option<&str>, page_size: u32) -> Result<QueueSnapshot>;
}
