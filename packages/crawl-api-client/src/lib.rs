//! REST client for the hosted crawling service.
//!
//! The crawler, scheduler and worker queue all live behind this API; this crate
//! only speaks its three endpoints.
//!
//! # Example
//!
//! ```rust,ignore
//! use crawl_api_client::{CrawlApiClient, StartCrawlBody};
//!
//! let client = CrawlApiClient::new("https://crawler.example.com", Some(token))?;
//!
//! let started = client
//!     .start_crawl(&StartCrawlBody {
//!         start_url: "https://example.org".into(),
//!         max_depth: 2,
//!         allowed_domains: None,
//!         user_id: "user-1".into(),
//!     })
//!     .await?;
//! client.stop_job(&started.id).await?;
//! ```

pub mod error;
pub mod types;

pub use error::{CrawlApiError, Result};
pub use types::{
    CrawlStarted, PaginationEntry, QueueJobEntry, QueueStatsEntry, QueueStatusResponse,
    StartCrawlBody,
};

use std::time::Duration;

use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use types::ErrorBody;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct CrawlApiClient {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl CrawlApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        Self::with_timeout(base_url, token, DEFAULT_TIMEOUT)
    }

    /// Build a client whose requests give up after `timeout`.
    pub fn with_timeout(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
            token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Start a crawl job. Returns the id assigned by the service.
    pub async fn start_crawl(&self, body: &StartCrawlBody) -> Result<CrawlStarted> {
        let url = self.endpoint(&["api", "crawl"])?;
        tracing::info!(start_url = %body.start_url, max_depth = body.max_depth, "Starting crawl");

        let resp = self.authorize(self.client.post(url).json(body)).send().await?;
        let started: CrawlStarted = Self::parse(resp).await?;

        tracing::info!(job_id = %started.id, "Crawl started");
        Ok(started)
    }

    /// Ask the service to stop an in-flight job.
    pub async fn stop_job(&self, job_id: &str) -> Result<()> {
        let url = self.endpoint(&["api", "queue", "stop", job_id])?;
        tracing::info!(job_id, "Requesting job stop");

        let resp = self.authorize(self.client.post(url)).send().await?;
        Self::check(resp).await?;
        Ok(())
    }

    /// Fetch one page of the worker-queue snapshot.
    pub async fn queue_status(
        &self,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<QueueStatusResponse> {
        let mut url = self.endpoint(&["api", "queue", "status"])?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(cursor) = cursor {
                query.append_pair("cursor", cursor);
            }
            query.append_pair("pageSize", &page_size.to_string());
        }

        let resp = self.authorize(self.client.get(url)).send().await?;
        let status: QueueStatusResponse = Self::parse(resp).await?;
        tracing::debug!(
            jobs = status.jobs.len(),
            has_more = status.pagination.has_more,
            "Fetched queue status"
        );
        Ok(status)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(resp: Response) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or(body);
        tracing::warn!(status = status.as_u16(), %message, "Crawl API returned an error");
        Err(CrawlApiError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn parse<T: DeserializeOwned>(resp: Response) -> Result<T> {
        let resp = Self::check(resp).await?;
        Ok(resp.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_segments() {
        let client = CrawlApiClient::new("https://crawler.example.com/", None).unwrap();
        let url = client.endpoint(&["api", "queue", "stop", "job-1"]).unwrap();
        assert_eq!(url.as_str(), "https://crawler.example.com/api/queue/stop/job-1");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = CrawlApiClient::new("https://example.com/crawler", None).unwrap();
        let url = client.endpoint(&["api", "crawl"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/crawler/api/crawl");
    }

    #[test]
    fn test_endpoint_escapes_ids() {
        let client = CrawlApiClient::new("https://example.com", None).unwrap();
        let url = client.endpoint(&["api", "queue", "stop", "a/b"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/api/queue/stop/a%2Fb");
    }

    #[test]
    fn test_rejects_relative_base() {
        assert!(CrawlApiClient::new("not a url", None).is_err());
    }

    #[test]
    fn test_start_body_wire_names() {
        let body = StartCrawlBody {
            start_url: "https://example.org".into(),
            max_depth: 2,
            allowed_domains: None,
            user_id: "u1".into(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["startUrl"], "https://example.org");
        assert_eq!(json["maxDepth"], 2);
        assert_eq!(json["userId"], "u1");
        assert!(json.get("allowedDomains").is_none());
    }

    #[test]
    fn test_queue_status_tolerates_missing_sections() {
        let parsed: QueueStatusResponse = serde_json::from_str(r#"{"jobs": []}"#).unwrap();
        assert!(parsed.jobs.is_empty());
        assert_eq!(parsed.queue_stats.pending, 0);
        assert!(!parsed.pagination.has_more);
        assert!(parsed.pagination.next_cursor.is_none());
    }
}
