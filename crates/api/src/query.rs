//! Shared query parameter types for API handlers.

use serde::Deserialize;
use vitashop_core::pagination::Page;

/// Page-based pagination parameters (`?page=&limit=`).
///
/// Values are clamped by [`Page::new`].
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageParams {
    pub fn resolve(&self) -> Page {
        Page::new(self.page, self.limit)
    }
}

/// Listing filter for status-bearing resources (`?status=&page=&limit=`).
#[derive(Debug, Default, Deserialize)]
pub struct StatusPageParams {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl StatusPageParams {
    pub fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }
}
