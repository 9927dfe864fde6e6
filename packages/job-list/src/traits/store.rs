//! Remote job store interfaces.
//!
//! The store is split along the two things the job list needs from it:
//! - `JobStore`: owner-scoped reads and deletes
//! - `ChangeFeed`: notifications that something changed

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::pagination::RowRange;
use crate::types::{ChangeEvent, ChangeFilter, CrawledPage, Job, JobId, StatusFilter};

/// Stream of change notifications for one subscription.
pub type ChangeStream = BoxStream<'static, ChangeEvent>;

/// Relational store of crawl jobs, scoped to one session owner.
///
/// Implementations must:
/// - order `list` by `created_at` descending (ties by id descending)
/// - compute `count` under the same filter predicate as `list`
/// - return `Unauthorized` when there is no session or the row belongs to someone else
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Rows within `range` matching `filter`.
    async fn list(&self, filter: &StatusFilter, range: RowRange) -> Result<Vec<Job>>;

    /// Number of rows matching `filter`.
    async fn count(&self, filter: &StatusFilter) -> Result<u64>;

    /// Look up one job.
    async fn get(&self, id: &JobId) -> Result<Option<Job>>;

    /// Delete a job and, by cascade, its crawled pages.
    async fn delete(&self, id: &JobId) -> Result<()>;

    /// Crawled pages of a job, ordered by depth then creation time.
    async fn list_pages(&self, job_id: &JobId, range: RowRange) -> Result<Vec<CrawledPage>>;
}

/// Push notifications for inserts, updates and deletes on a table.
///
/// No ordering or completeness guarantee across reconnects; consumers refetch
/// instead of patching.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    async fn subscribe(&self, table: &str, filter: Option<ChangeFilter>) -> Result<ChangeStream>;
}
