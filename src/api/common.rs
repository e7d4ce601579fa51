//! Common API utilities and shared types
//!
//! The `page`/`limit` pagination query and the paginated envelope with
//! relative `next`/`previous` links.

use serde::{Deserialize, Serialize};

use crate::models::{ListParams, PagedResult, DEFAULT_PAGE_SIZE};

// ============================================================================
// Query Types
// ============================================================================

/// Pagination query parameters
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl PaginationQuery {
    pub fn list_params(&self) -> ListParams {
        ListParams::new(self.page, self.limit)
    }
}

pub fn default_page() -> u32 { 1 }
pub fn default_limit() -> u32 { DEFAULT_PAGE_SIZE }

/// `1` or `true` (case-insensitive) switch a boolean filter on
pub fn flag(value: Option<&str>) -> bool {
    value
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

// ============================================================================
// Paginated Envelope
// ============================================================================

/// Paginated list response
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Paginated<T> {
    /// Wrap a page of results. Links keep the request's other query
    /// parameters as sent and replace `page`.
    pub fn new(result: PagedResult<T>, path: &str, raw_query: Option<&str>) -> Self {
        let link = |page: u32| format!("{}?{}", path, page_query(raw_query, page));
        let next = result.has_next().then(|| link(result.page + 1));
        let previous = result.has_prev().then(|| link(result.page - 1));
        Self {
            count: result.total,
            next,
            previous,
            results: result.items,
        }
    }
}

/// The raw query with its `page` pair replaced. Other pairs are copied
/// still encoded.
fn page_query(raw_query: Option<&str>, page: u32) -> String {
    let mut parts: Vec<String> = raw_query
        .unwrap_or_default()
        .split('&')
        .filter(|part| !part.is_empty() && *part != "page" && !part.starts_with("page="))
        .map(String::from)
        .collect();
    parts.push(format!("page={}", page));
    parts.join("&")
}
