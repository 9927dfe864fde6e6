use thiserror::Error;

/// Errors returned by the crawling service client.
#[derive(Debug, Error)]
pub enum CrawlApiError {
    /// Transport failure (connect, timeout, body decode)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("crawl API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Base URL could not be joined with an endpoint path
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl CrawlApiError {
    /// HTTP status code, when the service produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            CrawlApiError::Api { status, .. } => Some(*status),
            CrawlApiError::Http(e) => e.status().map(|s| s.as_u16()),
            CrawlApiError::Url(_) => None,
        }
    }

    /// Whether the request timed out before the service answered.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CrawlApiError::Http(e) if e.is_timeout())
    }
}

pub type Result<T> = std::result::Result<T, CrawlApiError>;
