//! API models for request and response payloads

use common::pagination::PageRequest;
use serde::Deserialize;

pub mod business;
pub mod event;
pub mod forum;
pub mod tourism;

/// Query parameters shared by the listing endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    /// Page number (1-based)
    pub page: Option<u32>,
    /// Number of items per page
    pub limit: Option<u32>,
    /// Exact category filter
    pub category: Option<String>,
    /// Case-insensitive substring search
    pub search: Option<String>,
    /// Sort order, where the listing supports one
    pub sort: Option<String>,
}

impl ListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }

    pub fn filter(&self) -> ListFilter {
        ListFilter {
            category: non_blank(&self.category),
            search: non_blank(&self.search),
        }
    }
}

/// Optional filters applied to a listing; blank values are dropped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub category: Option<String>,
    pub search: Option<String>,
}

impl ListFilter {
    pub fn search(term: &str) -> Self {
        Self {
            category: None,
            search: non_blank(&Some(term.to_string())),
        }
    }
}

/// `?limit=` for the short "featured"/"upcoming"/"recent" listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

impl LimitQuery {
    pub fn limit_or(&self, default: u32) -> i64 {
        i64::from(self.limit.unwrap_or(default).clamp(1, 50))
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_filters_are_ignored() {
        let query = ListQuery {
            category: Some("  ".to_string()),
            search: Some(" lake ".to_string()),
            ..Default::default()
        };

        let filter = query.filter();
        assert_eq!(filter.category, None);
        assert_eq!(filter.search.as_deref(), Some("lake"));
    }

    #[test]
    fn limit_defaults_and_clamps() {
        assert_eq!(LimitQuery::default().limit_or(3), 3);
        assert_eq!(LimitQuery { limit: Some(500) }.limit_or(3), 50);
    }
}
