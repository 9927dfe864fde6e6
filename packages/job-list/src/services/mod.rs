//! Crawling service implementations.
//!
//! - `HttpCrawlService` - REST API adapter (requires `http` feature)
//! - `MockCrawlService` lives in [`crate::testing`]

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::HttpCrawlService;
