//! Change-feed subscription that turns events into refresh tokens.
//!
//! The feed only says "something changed". Consumers react by refetching
//! authoritative state, so bursts of events collapse into a single pending
//! token on a capacity-1 channel.

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::traits::ChangeFeed;
use crate::types::{ChangeFilter, ChangeKind};

pub struct ChangeSubscriber;

impl ChangeSubscriber {
    /// Subscribe to `table` and forward every (filtered) event as a token.
    pub async fn subscribe(
        feed: &dyn ChangeFeed,
        table: &str,
        filter: Option<ChangeFilter>,
    ) -> Result<Subscription> {
        let mut stream = feed.subscribe(table, filter).await?;
        let (tx, rx) = mpsc::channel::<()>(1);

        let table_name = table.to_string();
        let task = tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                if event.kind == ChangeKind::Resync {
                    info!(table = %table_name, "Change feed resynced");
                } else {
                    debug!(table = %table_name, kind = ?event.kind, "Change event");
                }
                match tx.try_send(()) {
                    Ok(()) | Err(mpsc::error::TrySendError::Full(())) => {}
                    Err(mpsc::error::TrySendError::Closed(())) => break,
                }
            }
            warn!(table = %table_name, "Change feed ended");
        });

        info!(table, "Subscribed to change feed");
        Ok(Subscription {
            table: table.to_string(),
            rx,
            task: Some(task),
        })
    }
}

/// A live change-feed subscription.
///
/// Released exactly once, either through [`unsubscribe`](Self::unsubscribe) or on drop.
pub struct Subscription {
    table: String,
    rx: mpsc::Receiver<()>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Wait for the next refresh token. Returns false once the feed has ended
    /// or the subscription was released.
    pub async fn changed(&mut self) -> bool {
        if self.task.is_none() {
            return false;
        }
        self.rx.recv().await.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Release the underlying feed. Safe to call more than once.
    pub fn unsubscribe(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            self.rx.close();
            info!(table = %self.table, "Unsubscribed from change feed");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
