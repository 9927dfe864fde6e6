pub mod crawl_service;
pub mod store;

pub use crawl_service::CrawlService;
pub use store::{ChangeFeed, ChangeStream, JobStore};
