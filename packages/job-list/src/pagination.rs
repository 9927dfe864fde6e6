//! Offset pagination math.
//!
//! The store is addressed by inclusive row ranges ordered by `created_at DESC`,
//! so a page number maps to a fixed window as long as the filter does not change.

use serde::Serialize;

/// Inclusive `[from, to]` row offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RowRange {
    pub from: u64,
    pub to: u64,
}

impl RowRange {
    /// `LIMIT` for SQL-style stores.
    pub fn limit(&self) -> i64 {
        (self.to - self.from + 1) as i64
    }

    /// `OFFSET` for SQL-style stores.
    pub fn offset(&self) -> i64 {
        self.from as i64
    }
}

/// `ceil(total / page_size)`, zero for an empty set.
pub fn total_pages(total: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size as u64) as u32
}

/// Row window for a 1-based page.
pub fn row_range(page: u32, page_size: u32) -> RowRange {
    let from = (page.max(1) as u64 - 1) * page_size as u64;
    RowRange {
        from,
        to: from + page_size.max(1) as u64 - 1,
    }
}

/// Page to show after `page` came back empty.
///
/// Steps back toward the last page that still has rows; page 1 once the whole
/// filtered set is gone.
pub fn step_back_target(page: u32, total: u64, page_size: u32) -> u32 {
    if total == 0 {
        return 1;
    }
    page.saturating_sub(1)
        .min(total_pages(total, page_size))
        .max(1)
}

/// Trim results to the requested limit. Stores may over-deliver.
pub fn trim_rows<T>(mut rows: Vec<T>, limit: u32) -> Vec<T> {
    rows.truncate(limit as usize);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(23, 10), 3);
        assert_eq!(total_pages(5, 0), 0);
    }

    #[test]
    fn test_row_range() {
        assert_eq!(row_range(1, 10), RowRange { from: 0, to: 9 });
        assert_eq!(row_range(3, 10), RowRange { from: 20, to: 29 });
        assert_eq!(row_range(2, 1), RowRange { from: 1, to: 1 });
        assert_eq!(row_range(3, 10).limit(), 10);
        assert_eq!(row_range(3, 10).offset(), 20);
    }

    #[test]
    fn test_step_back_target() {
        // Deleted the only row on page 2 of 2
        assert_eq!(step_back_target(2, 10, 10), 1);
        // Several pages vanished at once
        assert_eq!(step_back_target(5, 12, 10), 2);
        // Everything is gone
        assert_eq!(step_back_target(3, 0, 10), 1);
        assert_eq!(step_back_target(1, 0, 10), 1);
    }

    #[test]
    fn test_trim_rows() {
        let rows: Vec<i32> = (1..=12).collect();
        assert_eq!(trim_rows(rows, 10).len(), 10);

        let rows: Vec<i32> = (1..=5).collect();
        assert_eq!(trim_rows(rows, 10).len(), 5);
    }
}
