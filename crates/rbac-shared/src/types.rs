//! Common types

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Paging request. `only_count` asks for the total without loading rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    #[serde(default)]
    pub paginate: bool,
    #[serde(default)]
    pub only_count: bool,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, per_page: DEFAULT_PAGE_SIZE, paginate: false, only_count: false }
    }
}

impl Pagination {
    pub fn page(page: u32, per_page: u32) -> Self {
        Self { page, per_page, paginate: true, only_count: false }
    }

    pub fn count_only() -> Self {
        Self { only_count: true, ..Self::default() }
    }

    pub fn limit(&self) -> i64 {
        self.per_page.clamp(1, MAX_PAGE_SIZE) as i64
    }

    pub fn offset(&self) -> i64 {
        (self.page.max(1) as i64 - 1) * self.limit()
    }
}

/// One page of results plus the total row count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult<T> {
    pub data: Vec<T>,
    pub total: i64,
}

impl<T> PageResult<T> {
    pub fn new(data: Vec<T>, total: i64) -> Self {
        Self { data, total }
    }

    pub fn count(total: i64) -> Self {
        Self { data: Vec::new(), total }
    }
}

impl<T> Default for PageResult<T> {
    fn default() -> Self {
        Self { data: Vec::new(), total: 0 }
    }
}
