//! Query inputs and results for the job list.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::job::{Job, JobStatus};
use crate::error::{JobListError, Result};
use crate::pagination::{self, RowRange};

/// Largest page the store will be asked for.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page size used when nothing else is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

// ============================================================================
// Status filter
// ============================================================================

/// Status predicate for listing. `All` applies no predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(JobStatus),
}

impl StatusFilter {
    pub fn only(status: JobStatus) -> Result<Self> {
        if !status.is_known() {
            return Err(JobListError::validation(format!(
                "unknown status filter: {status}"
            )));
        }
        Ok(StatusFilter::Only(status))
    }

    pub fn matches(&self, status: &JobStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => wanted == status,
        }
    }

    pub fn status(&self) -> Option<&JobStatus> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Only(status) => Some(status),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Only(status) => status.as_str(),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = JobListError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        StatusFilter::only(JobStatus::from(s))
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StatusFilter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StatusFilter {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Page request
// ============================================================================

/// A validated `(page, page_size, filter)` triple.
///
/// Construction is the only place bounds are checked; out-of-range values are
/// rejected rather than clamped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
    filter: StatusFilter,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32, filter: StatusFilter) -> Result<Self> {
        if page < 1 {
            return Err(JobListError::validation("page must be at least 1"));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(JobListError::validation(format!(
                "page size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        if let StatusFilter::Only(status) = &filter {
            if !status.is_known() {
                return Err(JobListError::validation(format!(
                    "unknown status filter: {status}"
                )));
            }
        }
        Ok(Self {
            page,
            page_size,
            filter,
        })
    }

    /// First page of `filter` at the default size.
    pub fn first(filter: StatusFilter) -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            filter,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn filter(&self) -> &StatusFilter {
        &self.filter
    }

    pub fn range(&self) -> RowRange {
        pagination::row_range(self.page, self.page_size)
    }

    pub fn with_page(&self, page: u32) -> Result<Self> {
        Self::new(page, self.page_size, self.filter.clone())
    }
}

// ============================================================================
// Results
// ============================================================================

/// One fetched page of jobs, plus the filtered total.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPage {
    pub rows: Vec<Job>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl JobPage {
    pub fn total_pages(&self) -> u32 {
        pagination::total_pages(self.total, self.page_size)
    }
}

/// Pagination and filter state owned by a job list controller.
///
/// Holds `1 <= page <= max(1, total_pages)` after every applied fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryState {
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub filter: StatusFilter,
}

impl QueryState {
    pub fn new(page_size: u32, filter: StatusFilter) -> Self {
        Self {
            page: 1,
            page_size,
            total: 0,
            filter,
        }
    }

    pub fn total_pages(&self) -> u32 {
        pagination::total_pages(self.total, self.page_size)
    }

    pub fn max_page(&self) -> u32 {
        self.total_pages().max(1)
    }

    pub fn contains_page(&self, page: u32) -> bool {
        (1..=self.max_page()).contains(&page)
    }

    pub fn request(&self) -> PageRequest {
        PageRequest {
            page: self.page,
            page_size: self.page_size,
            filter: self.filter.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_parse() {
        assert_eq!("all".parse::<StatusFilter>().unwrap(), StatusFilter::All);
        assert_eq!(
            "running".parse::<StatusFilter>().unwrap(),
            StatusFilter::Only(JobStatus::Running)
        );
        assert!("bogus".parse::<StatusFilter>().is_err());
    }

    #[test]
    fn test_filter_matches() {
        assert!(StatusFilter::All.matches(&JobStatus::Failed));
        let running = StatusFilter::Only(JobStatus::Running);
        assert!(running.matches(&JobStatus::Running));
        assert!(!running.matches(&JobStatus::Paused));
    }

    #[test]
    fn test_page_request_bounds() {
        assert!(PageRequest::new(1, 1, StatusFilter::All).is_ok());
        assert!(PageRequest::new(7, MAX_PAGE_SIZE, StatusFilter::All).is_ok());

        let err = PageRequest::new(0, 10, StatusFilter::All).unwrap_err();
        assert!(matches!(err, JobListError::Validation(_)));
        assert!(PageRequest::new(1, 0, StatusFilter::All).is_err());
        assert!(PageRequest::new(1, MAX_PAGE_SIZE + 1, StatusFilter::All).is_err());
        assert!(PageRequest::new(
            1,
            10,
            StatusFilter::Only(JobStatus::Unknown("x".into()))
        )
        .is_err());
    }

    #[test]
    fn test_query_state_page_bounds() {
        let mut state = QueryState::new(10, StatusFilter::All);
        assert_eq!(state.total_pages(), 0);
        assert_eq!(state.max_page(), 1);
        assert!(state.contains_page(1));
        assert!(!state.contains_page(2));

        state.total = 23;
        assert_eq!(state.total_pages(), 3);
        assert!(state.contains_page(3));
        assert!(!state.contains_page(4));
        assert!(!state.contains_page(0));
    }
}
