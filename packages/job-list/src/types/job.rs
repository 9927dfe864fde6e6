//! Crawl job model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{JobListError, Result};

// ============================================================================
// Identifiers
// ============================================================================

/// Opaque job identifier assigned by the crawling service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        JobId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        JobId(s.to_string())
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        JobId(s)
    }
}

/// Identity of the session owner, as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        OwnerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Status
// ============================================================================

/// Lifecycle status of a crawl job.
///
/// Transitions are enforced by the crawling service, not here. Anything the
/// service reports outside the known set is kept verbatim as `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Paused,
    Stopping,
    Completed,
    Failed,
    Crawled,
    Unknown(String),
}

impl JobStatus {
    /// Every status the service is known to report.
    pub const KNOWN: [JobStatus; 7] = [
        JobStatus::Pending,
        JobStatus::Running,
        JobStatus::Paused,
        JobStatus::Stopping,
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::Crawled,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Paused => "paused",
            JobStatus::Stopping => "stopping",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Crawled => "crawled",
            JobStatus::Unknown(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, JobStatus::Unknown(_))
    }

    /// Terminal states. `completed_at` is set exactly for these.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Crawled | JobStatus::Failed
        )
    }

    /// A stop request only makes sense while the job is queued or crawling.
    pub fn is_stoppable(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Running)
    }

    /// In-flight jobs must not be deleted.
    pub fn is_deletable(&self) -> bool {
        !self.is_stoppable()
    }

    pub fn can_transition_to(&self, next: &JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Running, Paused)
                | (Running, Stopping)
                | (Running, Completed)
                | (Running, Failed)
                | (Stopping, Crawled)
                | (Stopping, Failed)
                | (Paused, Running)
        )
    }
}

impl FromStr for JobStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let status = match s.trim().to_ascii_lowercase().as_str() {
            "pending" => JobStatus::Pending,
            "running" => JobStatus::Running,
            "paused" => JobStatus::Paused,
            "stopping" => JobStatus::Stopping,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            "crawled" => JobStatus::Crawled,
            _ => JobStatus::Unknown(s.to_string()),
        };
        Ok(status)
    }
}

impl From<&str> for JobStatus {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(status) => status,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for JobStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(JobStatus::from(raw.as_str()))
    }
}

// ============================================================================
// Job
// ============================================================================

/// One crawl task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub start_url: String,
    pub max_depth: u32,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub owner_id: OwnerId,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Job {
    /// A freshly queued job.
    pub fn pending(id: impl Into<JobId>, start_url: impl Into<String>, owner_id: OwnerId) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            start_url: start_url.into(),
            max_depth: 1,
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
            completed_at: None,
            owner_id,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.completed_at = if status.is_terminal() {
            Some(self.completed_at.unwrap_or(self.updated_at))
        } else {
            None
        };
        self.status = status;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.updated_at = created_at;
        if self.completed_at.is_some() {
            self.completed_at = Some(created_at);
        }
        self
    }

    /// `completed_at` is set if and only if the status is terminal.
    pub fn has_consistent_completion(&self) -> bool {
        self.completed_at.is_some() == self.status.is_terminal()
    }

    pub fn is_stoppable(&self) -> bool {
        self.status.is_stoppable()
    }

    pub fn is_deletable(&self) -> bool {
        self.status.is_deletable()
    }
}

// ============================================================================
// Crawled pages
// ============================================================================

/// One crawled URL belonging to a job. Read-only here; removed with its job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawledPage {
    pub id: String,
    pub job_id: JobId,
    pub url: String,
    pub title: Option<String>,
    pub depth: u32,
    pub status: String,
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Crawl initiation
// ============================================================================

/// Deepest crawl the dashboard will request.
pub const MAX_CRAWL_DEPTH: u32 = 10;

/// A validated request to start a crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartCrawl {
    start_url: url::Url,
    max_depth: u32,
    allowed_domains: Option<Vec<String>>,
}

impl StartCrawl {
    pub fn new(start_url: &str, max_depth: u32, allowed_domains: Vec<String>) -> Result<Self> {
        let url = url::Url::parse(start_url)
            .map_err(|e| JobListError::validation(format!("start URL is not valid: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(JobListError::validation(format!(
                "start URL must be http or https, got {}",
                url.scheme()
            )));
        }
        if url.host_str().is_none() {
            return Err(JobListError::validation("start URL has no host"));
        }
        if max_depth > MAX_CRAWL_DEPTH {
            return Err(JobListError::validation(format!(
                "max depth must be at most {MAX_CRAWL_DEPTH}"
            )));
        }

        let allowed_domains: Vec<String> = allowed_domains
            .into_iter()
            .map(|d| d.trim().to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();

        Ok(Self {
            start_url: url,
            max_depth,
            allowed_domains: (!allowed_domains.is_empty()).then_some(allowed_domains),
        })
    }

    pub fn start_url(&self) -> &str {
        self.start_url.as_str()
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn allowed_domains(&self) -> Option<&[String]> {
        self.allowed_domains.as_deref()
    }
}
