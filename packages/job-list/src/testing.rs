//! Testing utilities including mock implementations.
//!
//! These let applications exercise the job list without a database or a
//! running crawling service.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};

use crate::error::{JobListError, Result};
use crate::pagination::RowRange;
use crate::stores::MemoryJobStore;
use crate::traits::{ChangeFeed, ChangeStream, CrawlService, JobStore};
use crate::types::{
    ChangeFilter, CrawledPage, Job, JobId, JobStatus, OwnerId, QueueSnapshot, StartCrawl,
    StatusFilter,
};

// ============================================================================
// Crawl service
// ============================================================================

/// A mock crawling service.
///
/// Records every call and answers from configured responses. When backed by
/// a [`MemoryJobStore`] it also mirrors what the real service does to the
/// jobs table: starting inserts a pending job, stopping moves it to
/// `stopping`.
#[derive(Default)]
pub struct MockCrawlService {
    /// Store whose rows follow the service's actions
    backing: Option<MemoryJobStore>,

    /// Errors returned from `stop_job`, by job id
    stop_errors: Arc<RwLock<HashMap<JobId, JobListError>>>,

    /// Error returned from every call, if set
    failure: Arc<RwLock<Option<JobListError>>>,

    /// Queue pages by cursor (`None` is the first page)
    queue_pages: Arc<RwLock<HashMap<Option<String>, QueueSnapshot>>>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockCrawlCall>>>,
}

/// Record of a call made to the mock service.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCrawlCall {
    StartCrawl { start_url: String, max_depth: u32, owner: OwnerId },
    StopJob { id: JobId },
    QueueStatus { cursor: Option<String>, page_size: u32 },
}

impl MockCrawlService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply start/stop side effects to `store`.
    pub fn backed_by(mut self, store: MemoryJobStore) -> Self {
        self.backing = Some(store);
        self
    }

    /// Make `stop_job(id)` fail with `err`.
    pub fn with_stop_error(self, id: impl Into<JobId>, err: JobListError) -> Self {
        self.stop_errors.write().unwrap().insert(id.into(), err);
        self
    }

    /// Queue page served for `cursor`.
    pub fn with_queue_page(self, cursor: Option<&str>, snapshot: QueueSnapshot) -> Self {
        self.queue_pages
            .write()
            .unwrap()
            .insert(cursor.map(str::to_string), snapshot);
        self
    }

    /// Fail every call with `err` until cleared with `None`.
    pub fn set_failure(&self, err: Option<JobListError>) {
        *self.failure.write().unwrap() = err;
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockCrawlCall> {
        self.calls.read().unwrap().clone()
    }

    /// Ids passed to `stop_job`, in call order.
    pub fn stop_calls(&self) -> Vec<JobId> {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                MockCrawlCall::StopJob { id } => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.write().unwrap().clear();
    }

    fn record(&self, call: MockCrawlCall) -> Result<()> {
        self.calls.write().unwrap().push(call);
        match self.failure.read().unwrap().as_ref() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CrawlService for MockCrawlService {
    async fn start_crawl(&self, request: &StartCrawl, owner: &OwnerId) -> Result<JobId> {
        self.record(MockCrawlCall::StartCrawl {
            start_url: request.start_url().to_string(),
            max_depth: request.max_depth(),
            owner: owner.clone(),
        })?;

        let id = JobId::new(uuid::Uuid::new_v4().to_string());
        if let Some(store) = &self.backing {
            let mut job = Job::pending(id.clone(), request.start_url(), owner.clone());
            job.max_depth = request.max_depth();
            store.insert_job(job);
        }
        Ok(id)
    }

    async fn stop_job(&self, id: &JobId) -> Result<()> {
        self.record(MockCrawlCall::StopJob { id: id.clone() })?;
        if let Some(err) = self.stop_errors.read().unwrap().get(id) {
            return Err(err.clone());
        }
        if let Some(store) = &self.backing {
            store.set_status(id, JobStatus::Stopping);
        }
        Ok(())
    }

    async fn queue_status(&self, cursor: Option<&str>, page_size: u32) -> Result<QueueSnapshot> {
        self.record(MockCrawlCall::QueueStatus {
            cursor: cursor.map(str::to_string),
            page_size,
        })?;
        Ok(self
            .queue_pages
            .read()
            .unwrap()
            .get(&cursor.map(str::to_string))
            .cloned()
            .unwrap_or_default())
    }
}

// ============================================================================
// Gated store
// ============================================================================

/// A list call held open by a [`GatedJobStore`].
///
/// The rows were already read when the call was captured; they are returned
/// once the call is released (or dropped).
#[derive(Debug)]
pub struct GatedList {
    pub filter: StatusFilter,
    pub range: RowRange,
    pub rows: usize,
    release: oneshot::Sender<()>,
}

impl GatedList {
    pub fn release(self) {
        let _ = self.release.send(());
    }
}

/// Wraps a [`MemoryJobStore`] so tests decide when each `list` call resolves.
///
/// Used to force fetches to complete out of order.
pub struct GatedJobStore {
    inner: MemoryJobStore,
    gated: AtomicBool,
    tx: mpsc::UnboundedSender<GatedList>,
    rx: Mutex<mpsc::UnboundedReceiver<GatedList>>,
}

impl GatedJobStore {
    /// Starts gated.
    pub fn new(inner: MemoryJobStore) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            inner,
            gated: AtomicBool::new(true),
            tx,
            rx: Mutex::new(rx),
        }
    }

    pub fn set_gated(&self, gated: bool) {
        self.gated.store(gated, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &MemoryJobStore {
        &self.inner
    }

    /// Wait for the next held list call.
    ///
    /// # Panics
    ///
    /// Panics if no call arrives within two seconds.
    pub async fn next_list(&self) -> GatedList {
        let mut rx = self.rx.lock().await;
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("no list call arrived")
            .expect("gate channel closed")
    }
}

#[async_trait]
impl JobStore for GatedJobStore {
    async fn list(&self, filter: &StatusFilter, range: RowRange) -> Result<Vec<Job>> {
        let rows = self.inner.list(filter, range).await?;
        if self.gated.load(Ordering::SeqCst) {
            let (release, wait) = oneshot::channel();
            let held = GatedList {
                filter: filter.clone(),
                range,
                rows: rows.len(),
                release,
            };
            if self.tx.send(held).is_ok() {
                let _ = wait.await;
            }
        }
        Ok(rows)
    }

    async fn count(&self, filter: &StatusFilter) -> Result<u64> {
        self.inner.count(filter).await
    }

    async fn get(&self, id: &JobId) -> Result<Option<Job>> {
        self.inner.get(id).await
    }

    async fn delete(&self, id: &JobId) -> Result<()> {
        self.inner.delete(id).await
    }

    async fn list_pages(&self, job_id: &JobId, range: RowRange) -> Result<Vec<CrawledPage>> {
        self.inner.list_pages(job_id, range).await
    }
}

#[async_trait]
impl ChangeFeed for GatedJobStore {
    async fn subscribe(&self, table: &str, filter: Option<ChangeFilter>) -> Result<ChangeStream> {
        self.inner.subscribe(table, filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::row_range;

    #[tokio::test]
    async fn test_mock_records_and_fails_stop() {
        let service = MockCrawlService::new()
            .with_stop_error("j2", JobListError::Conflict("already finished".into()));

        service.stop_job(&JobId::from("j1")).await.unwrap();
        let err = service.stop_job(&JobId::from("j2")).await.unwrap_err();

        assert!(matches!(err, JobListError::Conflict(_)));
        assert_eq!(service.stop_calls(), vec![JobId::from("j1"), JobId::from("j2")]);
    }

    #[tokio::test]
    async fn test_backed_mock_mirrors_service_effects() {
        let owner = OwnerId::new("u1");
        let store = MemoryJobStore::new();
        let service = MockCrawlService::new().backed_by(store.clone());

        let request = StartCrawl::new("https://example.org", 2, vec![]).unwrap();
        let id = service.start_crawl(&request, &owner).await.unwrap();
        service.stop_job(&id).await.unwrap();

        let session = store.with_session(owner);
        let job = session.get(&id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Stopping);
        assert_eq!(job.max_depth, 2);
    }

    #[tokio::test]
    async fn test_gated_list_waits_for_release() {
        let owner = OwnerId::new("u1");
        let memory = MemoryJobStore::new();
        memory.insert_job(Job::pending("j1", "https://example.org", owner.clone()));
        let store = Arc::new(GatedJobStore::new(memory.with_session(owner)));

        let task = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.list(&StatusFilter::All, row_range(1, 10)).await }
        });

        let held = store.next_list().await;
        assert_eq!(held.rows, 1);
        assert!(!task.is_finished());

        held.release();
        assert_eq!(task.await.unwrap().unwrap().len(), 1);
    }
}
