//! Page/limit pagination shared by every listing endpoint

use serde::Serialize;
use serde_json::{Map, Value};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// A 1-indexed page request with a clamped page size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    /// Build a request from optional query parameters, falling back to
    /// page 1 / limit 10 and clamping the limit to `1..=MAX_LIMIT`.
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(DEFAULT_PAGE).max(1),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.limit)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results together with the totals needed to render a pager
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub total_pages: i64,
    pub current_page: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: i64, request: PageRequest) -> Self {
        Self {
            items,
            total_count,
            total_pages: total_pages(total_count, request.limit()),
            current_page: request.page(),
        }
    }

    /// Render the page with the items under a collection-specific key,
    /// e.g. `{"businesses": [...], "totalCount": 15, ...}`.
    pub fn into_json(self, key: &str) -> Value
    where
        T: Serialize,
    {
        let mut body = Map::new();
        body.insert(
            key.to_string(),
            serde_json::to_value(self.items).unwrap_or_else(|_| Value::Array(Vec::new())),
        );
        body.insert("totalCount".to_string(), Value::from(self.total_count));
        body.insert("totalPages".to_string(), Value::from(self.total_pages));
        body.insert("currentPage".to_string(), Value::from(self.current_page));
        Value::Object(body)
    }
}

/// `ceil(total / limit)`, zero when there is nothing to show
pub fn total_pages(total_count: i64, limit: i64) -> i64 {
    if total_count <= 0 || limit <= 0 {
        return 0;
    }
    (total_count + limit - 1) / limit
}
