//! Paginated, filtered reads against the job store.

use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::pagination::trim_rows;
use crate::traits::JobStore;
use crate::types::{JobPage, PageRequest, StatusFilter};

/// Issues page fetches against a [`JobStore`].
///
/// Rows come back newest first and the total is counted under the same
/// filter, so `ceil(total / page_size)` is always a page count the caller can
/// actually walk.
#[derive(Clone)]
pub struct JobQueryClient {
    store: Arc<dyn JobStore>,
}

impl JobQueryClient {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Validate and fetch. Invalid input fails without touching the store.
    pub async fn fetch_jobs(
        &self,
        page: u32,
        page_size: u32,
        status_filter: StatusFilter,
    ) -> Result<JobPage> {
        let request = PageRequest::new(page, page_size, status_filter)?;
        self.fetch(&request).await
    }

    #[instrument(skip(self, request), fields(page = request.page(), page_size = request.page_size(), filter = %request.filter()))]
    pub async fn fetch(&self, request: &PageRequest) -> Result<JobPage> {
        let (rows, total) = tokio::try_join!(
            self.store.list(request.filter(), request.range()),
            self.store.count(request.filter()),
        )?;
        let rows = trim_rows(rows, request.page_size());

        debug!(rows = rows.len(), total, "Fetched job page");
        Ok(JobPage {
            rows,
            total,
            page: request.page(),
            page_size: request.page_size(),
        })
    }
}
