//! In-memory job store for testing and development.

use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

use crate::error::{JobListError, Result};
use crate::pagination::RowRange;
use crate::traits::store::{ChangeFeed, ChangeStream, JobStore};
use crate::types::{
    ChangeEvent, ChangeFilter, ChangeKind, CrawledPage, Job, JobId, JobStatus, OwnerId,
    StatusFilter, JOBS_TABLE,
};

const CHANNEL_CAPACITY: usize = 256;

/// A change event tagged with the owner of the row it concerns.
/// `None` reaches every subscriber.
#[derive(Debug, Clone)]
struct OwnedEvent {
    owner: Option<OwnerId>,
    event: ChangeEvent,
}

#[derive(Default)]
struct Shared {
    jobs: RwLock<HashMap<JobId, Job>>,
    pages: RwLock<HashMap<JobId, Vec<CrawledPage>>>,
    channels: RwLock<HashMap<String, broadcast::Sender<OwnedEvent>>>,
    unavailable: AtomicBool,
}

/// In-memory crawl job store with a broadcast change feed.
///
/// Clones share the same dataset. The trait surface is scoped to the session
/// set by [`with_session`](Self::with_session); the inherent `insert_*` and
/// `set_status` methods stand in for the crawling service and bypass scoping.
#[derive(Clone, Default)]
pub struct MemoryJobStore {
    shared: Arc<Shared>,
    session: Option<OwnerId>,
}

impl MemoryJobStore {
    /// Create a new empty store with no session.
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle onto the same data, acting as `owner`.
    pub fn with_session(&self, owner: OwnerId) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            session: Some(owner),
        }
    }

    /// Make every subsequent read and delete fail with a store error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.shared.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Insert or replace a job, emitting a change event.
    pub fn insert_job(&self, job: Job) {
        let status = job.status.clone();
        let owner = job.owner_id.clone();
        let previous = self
            .shared
            .jobs
            .write()
            .unwrap()
            .insert(job.id.clone(), job);
        let kind = if previous.is_some() {
            ChangeKind::Update
        } else {
            ChangeKind::Insert
        };
        self.publish(Some(owner), ChangeEvent::new(JOBS_TABLE, kind, Some(status)));
    }

    /// Attach a crawled page to its job.
    pub fn insert_page(&self, page: CrawledPage) {
        self.shared
            .pages
            .write()
            .unwrap()
            .entry(page.job_id.clone())
            .or_default()
            .push(page);
    }

    /// Move a job to `status`, keeping `completed_at` consistent.
    ///
    /// Returns false when the job does not exist.
    pub fn set_status(&self, id: &JobId, status: JobStatus) -> bool {
        let owner = {
            let mut jobs = self.shared.jobs.write().unwrap();
            jobs.get_mut(id).map(|job| {
                let now = chrono::Utc::now();
                job.updated_at = now;
                job.completed_at = status.is_terminal().then_some(now);
                job.status = status.clone();
                job.owner_id.clone()
            })
        };
        match owner {
            Some(owner) => {
                self.publish(
                    Some(owner),
                    ChangeEvent::new(JOBS_TABLE, ChangeKind::Update, Some(status)),
                );
                true
            }
            None => false,
        }
    }

    /// Emit a resync, as a reconnecting transport would.
    pub fn simulate_reconnect(&self) {
        self.publish(None, ChangeEvent::resync(JOBS_TABLE));
    }

    pub fn job_count(&self) -> usize {
        self.shared.jobs.read().unwrap().len()
    }

    pub fn page_count(&self, job_id: &JobId) -> usize {
        self.shared
            .pages
            .read()
            .unwrap()
            .get(job_id)
            .map_or(0, Vec::len)
    }

    /// Number of live subscriptions on `table`.
    pub fn subscriber_count(&self, table: &str) -> usize {
        self.shared
            .channels
            .read()
            .unwrap()
            .get(table)
            .map_or(0, |tx| tx.receiver_count())
    }

    fn publish(&self, owner: Option<OwnerId>, event: ChangeEvent) {
        let channels = self.shared.channels.read().unwrap();
        if let Some(tx) = channels.get(&event.table) {
            // No receivers is fine
            let _ = tx.send(OwnedEvent { owner, event });
        }
    }

    fn session(&self) -> Result<&OwnerId> {
        self.session
            .as_ref()
            .ok_or_else(|| JobListError::Unauthorized("no active session".into()))
    }

    fn ensure_available(&self) -> Result<()> {
        if self.shared.unavailable.load(Ordering::SeqCst) {
            return Err(JobListError::store("memory store marked unavailable"));
        }
        Ok(())
    }

    fn owned_matching(&self, owner: &OwnerId, filter: &StatusFilter) -> Vec<Job> {
        let mut jobs: Vec<Job> = self
            .shared
            .jobs
            .read()
            .unwrap()
            .values()
            .filter(|j| &j.owner_id == owner && filter.matches(&j.status))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        jobs
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn list(&self, filter: &StatusFilter, range: RowRange) -> Result<Vec<Job>> {
        self.ensure_available()?;
        let owner = self.session()?;
        Ok(self
            .owned_matching(owner, filter)
            .into_iter()
            .skip(range.offset() as usize)
            .take(range.limit() as usize)
            .collect())
    }

    async fn count(&self, filter: &StatusFilter) -> Result<u64> {
        self.ensure_available()?;
        let owner = self.session()?;
        Ok(self.owned_matching(owner, filter).len() as u64)
    }

    async fn get(&self, id: &JobId) -> Result<Option<Job>> {
        self.ensure_available()?;
        let owner = self.session()?;
        Ok(self
            .shared
            .jobs
            .read()
            .unwrap()
            .get(id)
            .filter(|j| &j.owner_id == owner)
            .cloned())
    }

    async fn delete(&self, id: &JobId) -> Result<()> {
        self.ensure_available()?;
        let owner = self.session()?;

        let removed = {
            let mut jobs = self.shared.jobs.write().unwrap();
            match jobs.get(id) {
                None => {
                    return Err(JobListError::Conflict(format!("job {id} no longer exists")))
                }
                Some(job) if &job.owner_id != owner => {
                    return Err(JobListError::Unauthorized(format!(
                        "job {id} belongs to another user"
                    )))
                }
                // Status is re-read under the write lock; the caller's copy may be stale
                Some(job) if !job.is_deletable() => {
                    return Err(JobListError::Conflict(format!(
                        "job {id} is {} and cannot be deleted",
                        job.status
                    )))
                }
                Some(_) => jobs.remove(id),
            }
        };
        self.shared.pages.write().unwrap().remove(id);

        let status = removed.map(|j| j.status);
        self.publish(
            Some(owner.clone()),
            ChangeEvent::new(JOBS_TABLE, ChangeKind::Delete, status),
        );
        Ok(())
    }

    async fn list_pages(&self, job_id: &JobId, range: RowRange) -> Result<Vec<CrawledPage>> {
        if self.get(job_id).await?.is_none() {
            return Ok(Vec::new());
        }
        let mut pages = self
            .shared
            .pages
            .read()
            .unwrap()
            .get(job_id)
            .cloned()
            .unwrap_or_default();
        pages.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.created_at.cmp(&b.created_at)));
        Ok(pages
            .into_iter()
            .skip(range.offset() as usize)
            .take(range.limit() as usize)
            .collect())
    }
}

#[async_trait]
impl ChangeFeed for MemoryJobStore {
    async fn subscribe(&self, table: &str, filter: Option<ChangeFilter>) -> Result<ChangeStream> {
        let session = self.session()?.clone();
        let rx = {
            let mut channels = self.shared.channels.write().unwrap();
            let tx = channels
                .entry(table.to_string())
                .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
            tx.subscribe()
        };

        let table = table.to_string();
        let stream = BroadcastStream::new(rx).filter_map(move |item| {
            let event = match item {
                Ok(OwnedEvent { owner, event }) => owner
                    .map_or(true, |owner| owner == session)
                    .then_some(event),
                // Missed events: tell the consumer to resync
                Err(BroadcastStreamRecvError::Lagged(_)) => Some(ChangeEvent::resync(table.clone())),
            };
            let event = event.filter(|e| filter.as_ref().map_or(true, |f| f.accepts(e)));
            futures::future::ready(event)
        });
        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::row_range;
    use chrono::{Duration, Utc};

    fn seeded(owner: &OwnerId, n: usize) -> MemoryJobStore {
        let store = MemoryJobStore::new();
        let base = Utc::now();
        for i in 0..n {
            store.insert_job(
                Job::pending(format!("job-{i:02}"), "https://example.org", owner.clone())
                    .with_created_at(base + Duration::seconds(i as i64)),
            );
        }
        store
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_paged() {
        let owner = OwnerId::new("u1");
        let store = seeded(&owner, 5).with_session(owner);

        let first = store.list(&StatusFilter::All, row_range(1, 2)).await.unwrap();
        let ids: Vec<_> = first.iter().map(|j| j.id.as_str().to_string()).collect();
        assert_eq!(ids, vec!["job-04", "job-03"]);

        let last = store.list(&StatusFilter::All, row_range(3, 2)).await.unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].id.as_str(), "job-00");
    }

    #[tokio::test]
    async fn test_scoped_to_session_owner() {
        let owner = OwnerId::new("u1");
        let store = seeded(&owner, 3);
        store.insert_job(Job::pending("other", "https://example.org", OwnerId::new("u2")));

        let mine = store.with_session(owner);
        assert_eq!(mine.count(&StatusFilter::All).await.unwrap(), 3);
        assert!(mine.get(&JobId::from("other")).await.unwrap().is_none());

        let err = mine.delete(&JobId::from("other")).await.unwrap_err();
        assert!(matches!(err, JobListError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_no_session_is_unauthorized() {
        let store = seeded(&OwnerId::new("u1"), 1);
        let err = store.count(&StatusFilter::All).await.unwrap_err();
        assert!(matches!(err, JobListError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_delete_cascades_pages() {
        let owner = OwnerId::new("u1");
        let store = seeded(&owner, 1).with_session(owner);
        let id = JobId::from("job-00");
        store.insert_page(CrawledPage {
            id: "p1".into(),
            job_id: id.clone(),
            url: "https://example.org".into(),
            title: None,
            depth: 0,
            status: "processed".into(),
            content: None,
            created_at: Utc::now(),
        });
        assert_eq!(store.page_count(&id), 1);

        store.set_status(&id, JobStatus::Completed);
        store.delete(&id).await.unwrap();
        assert_eq!(store.job_count(), 0);
        assert_eq!(store.page_count(&id), 0);

        let again = store.delete(&id).await.unwrap_err();
        assert!(matches!(again, JobListError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_feed_filters_by_status() {
        let owner = OwnerId::new("u1");
        let store = seeded(&owner, 2).with_session(owner);
        let mut running = store
            .subscribe(JOBS_TABLE, Some(ChangeFilter::Status(JobStatus::Running)))
            .await
            .unwrap();

        store.set_status(&JobId::from("job-00"), JobStatus::Paused);
        store.set_status(&JobId::from("job-01"), JobStatus::Running);

        let event = running.next().await.unwrap();
        assert_eq!(event.kind, ChangeKind::Update);
        assert_eq!(event.status, Some(JobStatus::Running));
    }

    #[tokio::test]
    async fn test_delete_rechecks_stored_status() {
        let owner = OwnerId::new("u1");
        let store = seeded(&owner, 1).with_session(owner);
        let id = JobId::from("job-00");

        let err = store.delete(&id).await.unwrap_err();
        assert!(matches!(err, JobListError::Conflict(_)));

        store.set_status(&id, JobStatus::Running);
        assert!(matches!(store.delete(&id).await, Err(JobListError::Conflict(_))));
        assert_eq!(store.job_count(), 1);

        store.set_status(&id, JobStatus::Failed);
        store.delete(&id).await.unwrap();
        assert_eq!(store.job_count(), 0);
    }

    #[tokio::test]
    async fn test_feed_only_carries_own_changes() {
        let store = MemoryJobStore::new();
        let mut mine = store
            .with_session(OwnerId::new("u1"))
            .subscribe(JOBS_TABLE, None)
            .await
            .unwrap();

        store.insert_job(Job::pending("theirs", "https://example.org", OwnerId::new("u2")));
        store.insert_job(Job::pending("ours", "https://example.org", OwnerId::new("u1")));
        store.simulate_reconnect();

        let first = mine.next().await.unwrap();
        assert_eq!(first.kind, ChangeKind::Insert);
        assert_eq!(first.status, Some(JobStatus::Pending));
        assert_eq!(mine.next().await.unwrap().kind, ChangeKind::Resync);
    }

    #[tokio::test]
    async fn test_unavailable_fails_reads() {
        let owner = OwnerId::new("u1");
        let store = seeded(&owner, 1).with_session(owner);
        store.set_unavailable(true);
        assert!(matches!(
            store.count(&StatusFilter::All).await,
            Err(JobListError::Store(_))
        ));
        store.set_unavailable(false);
        assert_eq!(store.count(&StatusFilter::All).await.unwrap(), 1);
    }
}
