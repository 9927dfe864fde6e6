//! Crawl job dashboard.
//!
//! Thin HTTP and CLI surfaces over the `job-list` crate: the API server mounts
//! a job list controller per SSE connection and exposes the row actions, and
//! the CLI drives the same operations from a terminal.

pub mod cli;
pub mod config;
pub mod server;

pub use config::Config;
