use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body for `POST /api/crawl`.
#[derive(Debug, Clone, Serialize)]
pub struct StartCrawlBody {
    #[serde(rename = "startUrl")]
    pub start_url: String,
    #[serde(rename = "maxDepth")]
    pub max_depth: u32,
    #[serde(rename = "allowedDomains", skip_serializing_if = "Option::is_none")]
    pub allowed_domains: Option<Vec<String>>,
    #[serde(rename = "userId")]
    pub user_id: String,
}

/// Response from `POST /api/crawl`.
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlStarted {
    pub id: String,
}

/// Response from `GET /api/queue/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueStatusResponse {
    #[serde(default)]
    pub jobs: Vec<QueueJobEntry>,
    #[serde(rename = "queueStats", default)]
    pub queue_stats: QueueStatsEntry,
    #[serde(default)]
    pub pagination: PaginationEntry,
}

/// One queued URL as reported by the worker queue.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueJobEntry {
    pub id: String,
    #[serde(rename = "jobId")]
    pub job_id: Option<String>,
    pub url: String,
    pub status: String,
    pub depth: Option<u32>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueStatsEntry {
    #[serde(default)]
    pub pending: u64,
    #[serde(default)]
    pub processing: u64,
    #[serde(default)]
    pub completed: u64,
    #[serde(default)]
    pub failed: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationEntry {
    #[serde(rename = "nextCursor")]
    pub next_cursor: Option<String>,
    #[serde(rename = "hasMore", default)]
    pub has_more: bool,
    #[serde(rename = "pageSize")]
    pub page_size: Option<u32>,
}

/// Error payload the service returns on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}
