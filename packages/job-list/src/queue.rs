//! Worker-queue monitor.
//!
//! Polls the crawling service's queue status on a fixed interval and walks its
//! cursor pagination. Polls run one at a time inside the monitor task, so a
//! slow response can never be overtaken by a later one.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::controller::{Failure, Outcome};
use crate::error::JobListError;
use crate::traits::CrawlService;
use crate::types::QueueSnapshot;

#[derive(Debug, Clone)]
pub struct QueueMonitorOptions {
    pub page_size: u32,
    pub poll_interval: Duration,
}

impl Default for QueueMonitorOptions {
    fn default() -> Self {
        Self {
            page_size: 20,
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// Latest queue state as seen by the monitor.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueView {
    pub snapshot: QueueSnapshot,
    /// Cursor the snapshot was fetched with. `None` is the first page.
    pub cursor: Option<String>,
    /// Zero-based position in the cursor chain.
    pub page_index: usize,
    pub error: Option<String>,
    pub stale: bool,
    pub polled_at: Option<DateTime<Utc>>,
}

impl QueueView {
    pub fn has_next(&self) -> bool {
        self.snapshot.pagination.has_more && self.snapshot.pagination.next_cursor.is_some()
    }

    pub fn has_previous(&self) -> bool {
        self.page_index > 0
    }
}

enum QueueCommand {
    NextPage(oneshot::Sender<Outcome>),
    PreviousPage(oneshot::Sender<Outcome>),
    Refresh(oneshot::Sender<Outcome>),
}

/// Handle to a running queue poller. Dropping it stops polling.
pub struct QueueMonitor {
    commands: mpsc::Sender<QueueCommand>,
    view: watch::Receiver<QueueView>,
    task: JoinHandle<()>,
}

impl QueueMonitor {
    /// Start polling. The first poll happens immediately.
    pub fn spawn(service: Arc<dyn CrawlService>, options: QueueMonitorOptions) -> Self {
        let (view_tx, view_rx) = watch::channel(QueueView::default());
        let (cmd_tx, cmd_rx) = mpsc::channel(8);

        let poller = Poller {
            service,
            options,
            view: QueueView::default(),
            view_tx,
            back_stack: Vec::new(),
        };
        let task = tokio::spawn(poller.run(cmd_rx));

        Self {
            commands: cmd_tx,
            view: view_rx,
            task,
        }
    }

    pub fn view(&self) -> QueueView {
        self.view.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<QueueView> {
        self.view.clone()
    }

    /// Follow the current snapshot's next cursor.
    pub async fn next_page(&self) -> Outcome {
        self.request(QueueCommand::NextPage).await
    }

    /// Return to the previously viewed cursor.
    pub async fn previous_page(&self) -> Outcome {
        self.request(QueueCommand::PreviousPage).await
    }

    /// Poll now instead of waiting for the next tick.
    pub async fn refresh(&self) -> Outcome {
        self.request(QueueCommand::Refresh).await
    }

    async fn request(&self, make: fn(oneshot::Sender<Outcome>) -> QueueCommand) -> Outcome {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(make(tx)).await.is_err() {
            return stopped();
        }
        rx.await.unwrap_or_else(|_| stopped())
    }
}

impl Drop for QueueMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn stopped() -> Outcome {
    Outcome::Failed(Failure::from(&JobListError::store("queue monitor stopped")))
}

struct Poller {
    service: Arc<dyn CrawlService>,
    options: QueueMonitorOptions,
    view: QueueView,
    view_tx: watch::Sender<QueueView>,
    /// Cursors of the pages before the current one.
    back_stack: Vec<Option<String>>,
}

impl Poller {
    async fn run(mut self, mut commands: mpsc::Receiver<QueueCommand>) {
        let period = if self.options.poll_interval.is_zero() {
            QueueMonitorOptions::default().poll_interval
        } else {
            self.options.poll_interval
        };
        let mut ticker = tokio::time::interval_at(Instant::now(), period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(QueueCommand::NextPage(reply)) => {
                        let outcome = self.next_page().await;
                        let _ = reply.send(outcome);
                    }
                    Some(QueueCommand::PreviousPage(reply)) => {
                        let outcome = self.previous_page().await;
                        let _ = reply.send(outcome);
                    }
                    Some(QueueCommand::Refresh(reply)) => {
                        let cursor = self.view.cursor.clone();
                        let outcome = self.poll(cursor, false).await;
                        let _ = reply.send(outcome);
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    let cursor = self.view.cursor.clone();
                    self.poll(cursor, true).await;
                }
            }
        }
        debug!("Queue monitor stopped");
    }

    async fn next_page(&mut self) -> Outcome {
        if !self.view.has_next() {
            return Outcome::Ignored;
        }
        let next = self.view.snapshot.pagination.next_cursor.clone();
        let previous = self.view.cursor.clone();
        let outcome = self.poll(next, false).await;
        if outcome.is_applied() {
            self.back_stack.push(previous);
            self.view.page_index = self.back_stack.len();
            self.publish();
        }
        outcome
    }

    async fn previous_page(&mut self) -> Outcome {
        let Some(cursor) = self.back_stack.last().cloned() else {
            return Outcome::Ignored;
        };
        let outcome = self.poll(cursor, false).await;
        if outcome.is_applied() {
            self.back_stack.pop();
            self.view.page_index = self.back_stack.len();
            self.publish();
        }
        outcome
    }

    async fn poll(&mut self, cursor: Option<String>, background: bool) -> Outcome {
        match self
            .service
            .queue_status(cursor.as_deref(), self.options.page_size)
            .await
        {
            Ok(snapshot) => {
                debug!(
                    jobs = snapshot.jobs.len(),
                    pending = snapshot.queue_stats.pending,
                    processing = snapshot.queue_stats.processing,
                    "Queue polled"
                );
                self.view.snapshot = snapshot;
                self.view.cursor = cursor;
                self.view.error = None;
                self.view.stale = false;
                self.view.polled_at = Some(Utc::now());
                self.publish();
                Outcome::Applied
            }
            Err(e) => {
                warn!(error = %e, background, "Queue poll failed");
                self.view.error = Some(e.user_message());
                self.view.stale = background;
                self.publish();
                Outcome::Failed(Failure::from(&e))
            }
        }
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.view.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockCrawlCall, MockCrawlService};
    use crate::types::{QueuePagination, QueueStats};

    fn page(pending: u64, next: Option<&str>) -> QueueSnapshot {
        QueueSnapshot {
            jobs: Vec::new(),
            queue_stats: QueueStats {
                pending,
                ..Default::default()
            },
            pagination: QueuePagination {
                next_cursor: next.map(str::to_string),
                has_more: next.is_some(),
            },
        }
    }

    async fn first_poll(monitor: &QueueMonitor) {
        let mut rx = monitor.watch();
        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|v| v.polled_at.is_some()))
            .await
            .unwrap()
            .unwrap();
    }

    fn options() -> QueueMonitorOptions {
        QueueMonitorOptions {
            page_size: 5,
            poll_interval: Duration::from_secs(60),
        }
    }

    #[tokio::test]
    async fn test_walks_cursor_chain() {
        let service = Arc::new(
            MockCrawlService::new()
                .with_queue_page(None, page(1, Some("c2")))
                .with_queue_page(Some("c2"), page(2, None)),
        );
        let monitor = QueueMonitor::spawn(service.clone(), options());
        first_poll(&monitor).await;

        assert!(monitor.view().has_next());
        assert_eq!(monitor.next_page().await, Outcome::Applied);
        let view = monitor.view();
        assert_eq!(view.cursor.as_deref(), Some("c2"));
        assert_eq!(view.snapshot.queue_stats.pending, 2);
        assert!(view.has_previous());

        assert_eq!(monitor.next_page().await, Outcome::Ignored);

        assert_eq!(monitor.previous_page().await, Outcome::Applied);
        assert_eq!(monitor.view().cursor, None);
        assert_eq!(monitor.previous_page().await, Outcome::Ignored);

        assert!(service.calls().contains(&MockCrawlCall::QueueStatus {
            cursor: Some("c2".into()),
            page_size: 5,
        }));
    }

    #[tokio::test]
    async fn test_failure_keeps_last_snapshot() {
        let service = Arc::new(MockCrawlService::new().with_queue_page(None, page(3, None)));
        let monitor = QueueMonitor::spawn(service.clone(), options());
        first_poll(&monitor).await;

        service.set_failure(Some(JobListError::store("connection refused")));
        let outcome = monitor.refresh().await;
        assert!(outcome.failure().is_some());

        let view = monitor.view();
        assert_eq!(view.snapshot.queue_stats.pending, 3);
        assert!(view.error.is_some());

        service.set_failure(None);
        assert_eq!(monitor.refresh().await, Outcome::Applied);
        assert!(monitor.view().error.is_none());
    }
}
