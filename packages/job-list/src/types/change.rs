//! Change-feed events.

use serde::{Deserialize, Serialize};

use super::job::JobStatus;

/// Table holding crawl jobs in the remote store.
pub const JOBS_TABLE: &str = "crawl_jobs";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    /// The transport reconnected; events may have been missed.
    Resync,
}

/// A notification that something in `table` changed. Carries no row data
/// beyond the status used for filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: String,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    #[serde(default)]
    pub status: Option<JobStatus>,
}

impl ChangeEvent {
    pub fn new(table: impl Into<String>, kind: ChangeKind, status: Option<JobStatus>) -> Self {
        Self {
            table: table.into(),
            kind,
            status,
        }
    }

    pub fn resync(table: impl Into<String>) -> Self {
        Self::new(table, ChangeKind::Resync, None)
    }
}

/// Optional narrowing of a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeFilter {
    Status(JobStatus),
}

impl ChangeFilter {
    /// Resync always passes; status-less events pass since they cannot be ruled out.
    pub fn accepts(&self, event: &ChangeEvent) -> bool {
        if event.kind == ChangeKind::Resync {
            return true;
        }
        match (self, &event.status) {
            (ChangeFilter::Status(wanted), Some(status)) => wanted == status,
            (ChangeFilter::Status(_), None) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_accepts() {
        let filter = ChangeFilter::Status(JobStatus::Running);
        let running = ChangeEvent::new(JOBS_TABLE, ChangeKind::Update, Some(JobStatus::Running));
        let paused = ChangeEvent::new(JOBS_TABLE, ChangeKind::Update, Some(JobStatus::Paused));

        assert!(filter.accepts(&running));
        assert!(!filter.accepts(&paused));
        assert!(filter.accepts(&ChangeEvent::resync(JOBS_TABLE)));
        assert!(filter.accepts(&ChangeEvent::new(JOBS_TABLE, ChangeKind::Delete, None)));
    }

    #[test]
    fn test_notify_payload_shape() {
        let event: ChangeEvent =
            serde_json::from_str(r#"{"table":"crawl_jobs","type":"delete","status":"failed"}"#)
                .unwrap();
        assert_eq!(event.kind, ChangeKind::Delete);
        assert_eq!(event.status, Some(JobStatus::Failed));
    }
}
