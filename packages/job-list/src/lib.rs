//! Crawl Job List
//!
//! Keeps a paginated, status-filtered list of a user's crawl jobs in step with
//! a remote store that other actors mutate concurrently.
//!
//! # Model
//!
//! - The store is the single source of truth. Nothing is updated optimistically.
//! - The change feed is a notification only: any event means "refetch".
//! - The most recently issued fetch wins; responses for older requests are
//!   discarded whatever order they arrive in.
//!
//! # Usage
//!
//! ```rust,ignore
//! use job_list::{ControllerDeps, ControllerOptions, JobListController, MemoryJobStore, OwnerId};
//! use job_list::testing::MockCrawlService;
//!
//! let store = Arc::new(MemoryJobStore::new().with_session(OwnerId::new("user-1")));
//! let controller = JobListController::spawn(
//!     ControllerDeps {
//!         store: store.clone(),
//!         feed: store,
//!         crawl_service: Arc::new(MockCrawlService::new()),
//!     },
//!     ControllerOptions::default(),
//! );
//!
//! controller.set_page(2).await;
//! let view = controller.view();
//! ```
//!
//! # Modules
//!
//! - [`types`] - Jobs, statuses, query and queue types
//! - [`traits`] - Store, change feed and crawl service seams
//! - [`stores`] - Storage implementations (MemoryJobStore, PostgresJobStore)
//! - [`services`] - Crawl service implementations (HttpCrawlService)
//! - [`client`] - Job Query Client
//! - [`subscriber`] - Change Subscriber
//! - [`controller`] - Job List Controller
//! - [`queue`] - Worker queue monitor
//! - [`testing`] - Mock implementations for testing

pub mod actions;
pub mod client;
pub mod controller;
pub mod error;
pub mod pagination;
pub mod queue;
pub mod services;
pub mod stores;
pub mod subscriber;
pub mod testing;
pub mod traits;
pub mod types;

pub use error::{ErrorKind, JobListError, Result};
pub use traits::{ChangeFeed, ChangeStream, CrawlService, JobStore};
pub use types::{
    ChangeEvent, ChangeFilter, ChangeKind, CrawledPage, Job, JobId, JobPage, JobStatus, OwnerId,
    PageRequest, QueryState, QueueJob, QueuePagination, QueueSnapshot, QueueStats, StartCrawl,
    StatusFilter, DEFAULT_PAGE_SIZE, JOBS_TABLE, MAX_CRAWL_DEPTH, MAX_PAGE_SIZE,
};

pub use client::JobQueryClient;
pub use controller::{
    ControllerDeps, ControllerHandle, ControllerOptions, Failure, JobListController, JobListView,
    Outcome,
};
pub use queue::{QueueMonitor, QueueMonitorOptions, QueueView};
pub use subscriber::{ChangeSubscriber, Subscription};

// Re-export stores
pub use stores::MemoryJobStore;

#[cfg(feature = "postgres")]
pub use stores::PostgresJobStore;

#[cfg(feature = "http")]
pub use services::HttpCrawlService;

// Re-export testing utilities
pub use testing::{GatedJobStore, MockCrawlService};
