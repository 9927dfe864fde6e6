//! Job list controller.
//!
//! One consumer task owns the query state and the change-feed subscription.
//! Everything that wants the list to move (navigation, row actions, change
//! tokens, the poll timer) goes through that task, and fetches it spawns are
//! tagged with a sequence number so only the most recent request can update
//! what is displayed.
//!
//! ```text
//! ControllerHandle ──Command──►┐
//! Subscription ────token──────►├─► loop ──spawn──► fetch / row action
//! poll interval ──tick────────►┘     ▲                    │
//!                                    └─────Internal───────┘
//!                      watch::Sender<JobListView> ──► presentation
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::actions;
use crate::client::JobQueryClient;
use crate::error::{ErrorKind, JobListError, Result};
use crate::pagination::step_back_target;
use crate::subscriber::{ChangeSubscriber, Subscription};
use crate::traits::{ChangeFeed, CrawlService, JobStore};
use crate::types::{
    ChangeFilter, Job, JobId, JobPage, PageRequest, QueryState, StatusFilter, DEFAULT_PAGE_SIZE,
    JOBS_TABLE, MAX_PAGE_SIZE,
};

// ============================================================================
// Public types
// ============================================================================

/// Collaborators the controller talks to.
#[derive(Clone)]
pub struct ControllerDeps {
    pub store: Arc<dyn JobStore>,
    pub feed: Arc<dyn ChangeFeed>,
    pub crawl_service: Arc<dyn CrawlService>,
}

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub page_size: u32,
    pub filter: StatusFilter,
    /// Table watched on the change feed.
    pub table: String,
    pub change_filter: Option<ChangeFilter>,
    /// Refetch on a timer in addition to change events. `None` disables polling.
    pub poll_interval: Option<Duration>,
    pub command_buffer: usize,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            filter: StatusFilter::All,
            table: JOBS_TABLE.to_string(),
            change_filter: None,
            poll_interval: None,
            command_buffer: 32,
        }
    }
}

/// Why an operation did not apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&JobListError> for Failure {
    fn from(err: &JobListError) -> Self {
        Failure {
            kind: err.kind(),
            message: err.user_message(),
        }
    }
}

/// Result of a controller operation. Never an `Err`: failures carry a
/// user-visible message instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// The operation took effect.
    Applied,
    /// Nothing to do (e.g. a page outside the current range).
    Ignored,
    /// A newer request replaced this one before it resolved.
    Superseded,
    Failed(Failure),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Outcome::Failed(f) => Some(f),
            _ => None,
        }
    }

    fn closed() -> Self {
        Outcome::Failed(Failure {
            kind: ErrorKind::Store,
            message: "The job list is no longer running".to_string(),
        })
    }
}

/// Snapshot published to the presentation layer after every state change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListView {
    pub query: QueryState,
    pub total_pages: u32,
    pub rows: Vec<Job>,
    /// A user-initiated fetch is in flight.
    pub loading: bool,
    /// Last failure, shown without clearing `rows`.
    pub error: Option<String>,
    /// The last background refresh failed; `rows` may be out of date.
    pub stale: bool,
    /// Per-row failures from stop/delete.
    pub row_errors: BTreeMap<JobId, String>,
    /// Whether the change feed is connected.
    pub live: bool,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl JobListView {
    fn new(query: QueryState) -> Self {
        Self {
            total_pages: query.total_pages(),
            query,
            rows: Vec::new(),
            loading: true,
            error: None,
            stale: false,
            row_errors: BTreeMap::new(),
            live: false,
            refreshed_at: None,
        }
    }
}

// ============================================================================
// Handle
// ============================================================================

#[derive(Debug)]
enum Command {
    SetPage { page: u32, reply: oneshot::Sender<Outcome> },
    SetStatusFilter { filter: StatusFilter, reply: oneshot::Sender<Outcome> },
    SetPageSize { page_size: u32, reply: oneshot::Sender<Outcome> },
    Refresh { reply: oneshot::Sender<Outcome> },
    StopJob { id: JobId, reply: oneshot::Sender<Outcome> },
    DeleteJob { id: JobId, reply: oneshot::Sender<Outcome> },
    Shutdown { reply: oneshot::Sender<()> },
}

/// Cloneable front end to a running controller.
#[derive(Clone)]
pub struct ControllerHandle {
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<JobListView>,
}

impl ControllerHandle {
    /// Current snapshot.
    pub fn view(&self) -> JobListView {
        self.view.borrow().clone()
    }

    /// Read-only projection of the displayed page.
    pub fn rows(&self) -> Vec<Job> {
        self.view.borrow().rows.clone()
    }

    pub fn query_state(&self) -> QueryState {
        self.view.borrow().query.clone()
    }

    /// Receiver that wakes on every published snapshot.
    pub fn watch(&self) -> watch::Receiver<JobListView> {
        self.view.clone()
    }

    /// Go to page `page`. Pages outside `[1, total_pages]` are ignored.
    pub async fn set_page(&self, page: u32) -> Outcome {
        self.request(|reply| Command::SetPage { page, reply }).await
    }

    /// Switch the status filter and return to page 1.
    pub async fn set_status_filter(&self, filter: StatusFilter) -> Outcome {
        self.request(|reply| Command::SetStatusFilter { filter, reply })
            .await
    }

    /// Change the page size and return to page 1.
    pub async fn set_page_size(&self, page_size: u32) -> Outcome {
        self.request(|reply| Command::SetPageSize { page_size, reply })
            .await
    }

    pub async fn refresh(&self) -> Outcome {
        self.request(|reply| Command::Refresh { reply }).await
    }

    /// Ask the crawling service to stop a pending or running job.
    pub async fn stop_job(&self, id: JobId) -> Outcome {
        self.request(|reply| Command::StopJob { id, reply }).await
    }

    /// Delete a job that is no longer in flight.
    pub async fn delete_job(&self, id: JobId) -> Outcome {
        self.request(|reply| Command::DeleteJob { id, reply }).await
    }

    async fn request(&self, make: impl FnOnce(oneshot::Sender<Outcome>) -> Command) -> Outcome {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(make(tx)).await.is_err() {
            return Outcome::closed();
        }
        rx.await.unwrap_or_else(|_| Outcome::closed())
    }
}

// ============================================================================
// Controller
// ============================================================================

/// A mounted job list. Dropping it tears the list down, releasing the
/// change-feed subscription.
pub struct JobListController {
    handle: ControllerHandle,
    task: Option<JoinHandle<()>>,
}

impl JobListController {
    /// Start the consumer loop. It subscribes to the change feed and issues
    /// the initial fetch before handling any command.
    pub fn spawn(deps: ControllerDeps, options: ControllerOptions) -> Self {
        let page_size = options.page_size.clamp(1, MAX_PAGE_SIZE);
        let requested = PageRequest::new(1, page_size, options.filter.clone()).unwrap_or_else(|e| {
            warn!(error = %e, "Invalid initial filter, listing all jobs");
            PageRequest::first(StatusFilter::All)
        });
        let query = QueryState::new(requested.page_size(), requested.filter().clone());

        let view = JobListView::new(query);
        let (view_tx, view_rx) = watch::channel(view.clone());
        let (cmd_tx, cmd_rx) = mpsc::channel(options.command_buffer.max(1));
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();

        let event_loop = EventLoop {
            client: JobQueryClient::new(Arc::clone(&deps.store)),
            deps,
            options,
            view,
            view_tx,
            requested,
            latest_seq: 0,
            pending: HashMap::new(),
            internal_tx,
            subscription: None,
        };
        let task = tokio::spawn(event_loop.run(cmd_rx, internal_rx));

        Self {
            handle: ControllerHandle {
                commands: cmd_tx,
                view: view_rx,
            },
            task: Some(task),
        }
    }

    pub fn handle(&self) -> ControllerHandle {
        self.handle.clone()
    }

    /// Stop the loop and wait for it to release its subscription.
    pub async fn shutdown(mut self) {
        let (tx, rx) = oneshot::channel();
        if self
            .handle
            .commands
            .send(Command::Shutdown { reply: tx })
            .await
            .is_ok()
        {
            let _ = rx.await;
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl std::ops::Deref for JobListController {
    type Target = ControllerHandle;

    fn deref(&self) -> &ControllerHandle {
        &self.handle
    }
}

impl Drop for JobListController {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ============================================================================
// Event loop
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowAction {
    Stop,
    Delete,
}

enum Internal {
    Fetched {
        seq: u64,
        result: Result<JobPage>,
    },
    ActionDone {
        action: RowAction,
        id: JobId,
        result: Result<()>,
        reply: oneshot::Sender<Outcome>,
    },
}

/// Bookkeeping for an issued fetch.
struct PendingFetch {
    background: bool,
    waiters: Vec<oneshot::Sender<Outcome>>,
}

struct EventLoop {
    client: JobQueryClient,
    deps: ControllerDeps,
    options: ControllerOptions,
    view: JobListView,
    view_tx: watch::Sender<JobListView>,
    /// Target of the most recent fetch.
    requested: PageRequest,
    latest_seq: u64,
    pending: HashMap<u64, PendingFetch>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    subscription: Option<Subscription>,
}

impl EventLoop {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut internal: mpsc::UnboundedReceiver<Internal>,
    ) {
        self.mount().await;

        let poll_period = self.options.poll_interval.filter(|d| !d.is_zero());
        let mut poll = tokio::time::interval_at(
            Instant::now() + poll_period.unwrap_or(Duration::from_secs(3600)),
            poll_period.unwrap_or(Duration::from_secs(3600)),
        );
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let feed_open = self.subscription.is_some();
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        self.teardown();
                        let _ = reply.send(());
                        return;
                    }
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(message) = internal.recv() => self.handle_internal(message),
                changed = next_change(&mut self.subscription), if feed_open => {
                    if changed {
                        self.refresh(true, None);
                    } else {
                        warn!("Change feed closed, continuing without live updates");
                        self.subscription = None;
                        self.view.live = false;
                        self.publish();
                    }
                }
                _ = poll.tick(), if poll_period.is_some() => self.refresh(true, None),
            }
        }

        self.teardown();
    }

    async fn mount(&mut self) {
        match ChangeSubscriber::subscribe(
            self.deps.feed.as_ref(),
            &self.options.table,
            self.options.change_filter.clone(),
        )
        .await
        {
            Ok(subscription) => {
                self.subscription = Some(subscription);
                self.view.live = true;
            }
            Err(e) => {
                warn!(error = %e, "Could not subscribe to job changes");
                self.view.live = false;
            }
        }
        info!(
            page_size = self.requested.page_size(),
            filter = %self.requested.filter(),
            live = self.view.live,
            "Job list mounted"
        );
        self.refresh(false, None);
    }

    fn teardown(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        for (_, pending) in self.pending.drain() {
            for waiter in pending.waiters {
                let _ = waiter.send(Outcome::closed());
            }
        }
        self.view.live = false;
        self.publish();
        info!("Job list torn down");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::SetPage { page, reply } => {
                if !self.view.query.contains_page(page) {
                    debug!(page, max_page = self.view.query.max_page(), "Ignoring out-of-range page");
                    let _ = reply.send(Outcome::Ignored);
                    return;
                }
                match self.requested.with_page(page) {
                    Ok(request) => self.issue(request, false, Some(reply)),
                    Err(e) => reject(reply, &e),
                }
            }
            Command::SetStatusFilter { filter, reply } => {
                match PageRequest::new(1, self.requested.page_size(), filter) {
                    Ok(request) => self.issue(request, false, Some(reply)),
                    Err(e) => reject(reply, &e),
                }
            }
            Command::SetPageSize { page_size, reply } => {
                match PageRequest::new(1, page_size, self.requested.filter().clone()) {
                    Ok(request) => self.issue(request, false, Some(reply)),
                    Err(e) => reject(reply, &e),
                }
            }
            Command::Refresh { reply } => self.refresh(false, Some(reply)),
            Command::StopJob { id, reply } => self.run_action(RowAction::Stop, id, reply),
            Command::DeleteJob { id, reply } => self.run_action(RowAction::Delete, id, reply),
            Command::Shutdown { .. } => unreachable!("handled by the loop"),
        }
    }

    fn handle_internal(&mut self, message: Internal) {
        match message {
            Internal::Fetched { seq, result } => self.on_fetched(seq, result),
            Internal::ActionDone {
                action,
                id,
                result,
                reply,
            } => self.on_action_done(action, id, result, reply),
        }
    }

    /// Refetch whatever was most recently requested.
    fn refresh(&mut self, background: bool, reply: Option<oneshot::Sender<Outcome>>) {
        let request = self.requested.clone();
        self.issue(request, background, reply);
    }

    fn issue(
        &mut self,
        request: PageRequest,
        background: bool,
        reply: Option<oneshot::Sender<Outcome>>,
    ) {
        let previous_seq = self.latest_seq;
        self.latest_seq += 1;
        let seq = self.latest_seq;

        let mut background = background;
        let mut waiters: Vec<_> = reply.into_iter().collect();
        // A fetch for the same key still in flight: its callers take this result.
        if self.requested == request {
            if let Some(previous) = self.pending.get_mut(&previous_seq) {
                waiters.append(&mut previous.waiters);
                background &= previous.background;
            }
        }

        self.requested = request.clone();
        self.pending.insert(seq, PendingFetch { background, waiters });

        if !background && !self.view.loading {
            self.view.loading = true;
            self.publish();
        }

        debug!(
            seq,
            page = request.page(),
            page_size = request.page_size(),
            filter = %request.filter(),
            background,
            "Fetching jobs"
        );
        let client = self.client.clone();
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            let result = client.fetch(&request).await;
            let _ = tx.send(Internal::Fetched { seq, result });
        });
    }

    fn on_fetched(&mut self, seq: u64, result: Result<JobPage>) {
        let Some(pending) = self.pending.remove(&seq) else {
            return;
        };

        if seq != self.latest_seq {
            debug!(seq, latest = self.latest_seq, "Discarding superseded fetch");
            for waiter in pending.waiters {
                let _ = waiter.send(Outcome::Superseded);
            }
            return;
        }

        match result {
            Ok(page) if page.rows.is_empty() && page.page > 1 => {
                let target = step_back_target(page.page, page.total, page.page_size);
                info!(from = page.page, to = target, total = page.total, "Page emptied, stepping back");
                let request = PageRequest::new(target, page.page_size, self.requested.filter().clone())
                    .unwrap_or_else(|_| PageRequest::first(self.requested.filter().clone()));

                // Callers waiting on the emptied page wait on its replacement.
                self.issue(request, pending.background, None);
                if let Some(next) = self.pending.get_mut(&self.latest_seq) {
                    next.waiters.extend(pending.waiters);
                }
            }
            Ok(page) => {
                self.apply(page);
                for waiter in pending.waiters {
                    let _ = waiter.send(Outcome::Applied);
                }
            }
            Err(e) => {
                warn!(error = %e, background = pending.background, "Job fetch failed");
                // Keep rows and query state; retarget the last good view.
                self.requested = self.view.query.request();
                self.view.loading = false;
                self.view.error = Some(e.user_message());
                self.view.stale = pending.background;
                self.publish();
                for waiter in pending.waiters {
                    reject(waiter, &e);
                }
            }
        }
    }

    fn apply(&mut self, page: JobPage) {
        self.view.query = QueryState {
            page: page.page,
            page_size: page.page_size,
            total: page.total,
            filter: self.requested.filter().clone(),
        };
        self.view.total_pages = page.total_pages();
        self.view
            .row_errors
            .retain(|id, _| page.rows.iter().any(|j| &j.id == id));
        self.view.rows = page.rows;
        self.view.loading = false;
        self.view.error = None;
        self.view.stale = false;
        self.view.refreshed_at = Some(Utc::now());
        self.publish();
    }

    fn run_action(&mut self, action: RowAction, id: JobId, reply: oneshot::Sender<Outcome>) {
        let rows = self.view.rows.clone();
        let deps = self.deps.clone();
        let tx = self.internal_tx.clone();

        tokio::spawn(async move {
            let result: Result<()> = async {
                let job = actions::resolve_job(&rows, deps.store.as_ref(), &id).await?;
                match action {
                    RowAction::Stop => actions::stop_job(deps.crawl_service.as_ref(), &job).await,
                    RowAction::Delete => actions::delete_job(deps.store.as_ref(), &job).await,
                }
            }
            .await;
            let _ = tx.send(Internal::ActionDone {
                action,
                id,
                result,
                reply,
            });
        });
    }

    fn on_action_done(
        &mut self,
        action: RowAction,
        id: JobId,
        result: Result<()>,
        reply: oneshot::Sender<Outcome>,
    ) {
        match result {
            Ok(()) => {
                debug!(?action, job_id = %id, "Row action succeeded, refetching");
                self.view.row_errors.remove(&id);
                self.refresh(false, None);
                let _ = reply.send(Outcome::Applied);
            }
            Err(e) => {
                warn!(?action, job_id = %id, error = %e, "Row action failed");
                match e {
                    JobListError::Conflict(_) => {
                        self.view.row_errors.insert(id, e.user_message());
                    }
                    _ => self.view.error = Some(e.user_message()),
                }
                self.publish();
                reject(reply, &e);
            }
        }
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.view.clone());
    }
}

fn reject(reply: oneshot::Sender<Outcome>, err: &JobListError) {
    let _ = reply.send(Outcome::Failed(Failure::from(err)));
}

async fn next_change(subscription: &mut Option<Subscription>) -> bool {
    match subscription {
        Some(subscription) => subscription.changed().await,
        None => std::future::pending().await,
    }
}
