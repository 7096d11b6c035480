//! Pagination types for list endpoints.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pagination parameter errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    /// Page numbers start at 1.
    #[error("page must be at least 1")]
    ZeroPage,

    /// Page size outside the accepted range.
    #[error("limit must be between 1 and {max}, got {limit}")]
    LimitOutOfRange {
        /// Requested page size.
        limit: u32,
        /// Largest accepted page size.
        max: u32,
    },
}

/// Request parameters for paginated queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number (1-indexed).
    #[serde(default = "default_page")]
    pub page: u32,
    /// Number of items per page.
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    100
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl PageRequest {
    /// Creates a page request.
    #[must_use]
    pub const fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    /// Checks that `page >= 1` and `1 <= limit <= max_limit`.
    pub fn validate(&self, max_limit: u32) -> Result<(), PaginationError> {
        if self.page == 0 {
            return Err(PaginationError::ZeroPage);
        }
        if self.limit == 0 || self.limit > max_limit {
            return Err(PaginationError::LimitOutOfRange {
                limit: self.limit,
                max: max_limit,
            });
        }
        Ok(())
    }

    /// Calculates the offset of the first item on this page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    /// Returns the page size.
    #[must_use]
    pub fn limit(&self) -> u64 {
        u64::from(self.limit)
    }

    /// Cuts this page out of an already sorted, fully materialized list.
    #[must_use]
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        let offset = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit()).unwrap_or(usize::MAX);
        items.into_iter().skip(offset).take(limit).collect()
    }
}

/// Response wrapper for paginated data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    /// The items in the current page.
    pub items: Vec<T>,
    /// Total number of items across all pages.
    pub total: u64,
    /// Current page number.
    pub page: u32,
    /// Items per page.
    pub limit: u32,
    /// Total number of pages.
    pub total_pages: u32,
}

impl<T> PageResponse<T> {
    /// Creates a new paginated response.
    #[must_use]
    pub fn new(items: Vec<T>, page: u32, limit: u32, total: u64) -> Self {
        let total_pages = if total == 0 || limit == 0 {
            1
        } else {
            u32::try_from(total.div_ceil(u64::from(limit))).unwrap_or(u32::MAX)
        };

        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }

    /// Paginates a fully materialized list.
    #[must_use]
    pub fn from_sorted(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len() as u64;
        Self::new(request.slice(all), request.page, request.limit, total)
    }
}

#[cfg(test)]
#[path = "pagination_tests.rs"]
mod tests;
