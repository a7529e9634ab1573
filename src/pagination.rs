//! Page-number to `limit`/`offset` conversion for list endpoints.

use crate::error::ApiError;
use serde::Serialize;

/// Items per page used by the document lists unless configured otherwise.
pub const DEFAULT_ITEMS_PER_PAGE: u32 = 12;

/// A 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    per_page: u32,
}

impl PageRequest {
    /// Create a page request. Page numbers below 1 are clamped to 1.
    pub fn new(page: u32, per_page: u32) -> Result<Self, ApiError> {
        if per_page == 0 {
            return Err(ApiError::InvalidRequest(
                "items per page must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            page: page.max(1),
            per_page,
        })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// `limit` query parameter.
    pub fn limit(&self) -> u64 {
        u64::from(self.per_page)
    }

    /// `offset` query parameter: `(page - 1) * per_page`.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }

    /// Slice one page out of an already fetched list.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let len = items.len() as u64;
        let start = self.offset().min(len) as usize;
        let end = (self.offset() + self.limit()).min(len) as usize;
        &items[start..end]
    }
}

/// Number of pages needed for `total` items: `ceil(total / per_page)`.
pub fn total_pages(total: u64, per_page: u32) -> u64 {
    if per_page == 0 {
        return 0;
    }
    total.div_ceil(u64::from(per_page))
}

/// Position of a page within a result set, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl PageInfo {
    pub fn new(request: PageRequest, total: u64) -> Self {
        Self {
            page: request.page(),
            per_page: request.per_page(),
            total,
            total_pages: total_pages(total, request.per_page()),
        }
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages
    }
}
