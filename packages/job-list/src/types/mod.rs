pub mod change;
pub mod job;
pub mod query;
pub mod queue;

pub use change::{ChangeEvent, ChangeFilter, ChangeKind, JOBS_TABLE};
pub use job::{CrawledPage, Job, JobId, JobStatus, OwnerId, StartCrawl, MAX_CRAWL_DEPTH};
pub use query::{JobPage, PageRequest, QueryState, StatusFilter, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use queue::{QueueJob, QueuePagination, QueueSnapshot, QueueStats};
