//! Page/limit handling shared by the paginated listings.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// Raw query-string values as the client sent them. Kept as strings so junk
/// input falls back to the defaults instead of failing the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    /// Coerces raw values to positive integers. Missing, unparseable or
    /// non-positive values use the defaults; `limit` is capped at
    /// [`MAX_LIMIT`].
    pub fn coerce(page: Option<&str>, limit: Option<&str>) -> Self {
        let page = positive(page).unwrap_or(DEFAULT_PAGE);
        let limit = positive(limit).unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        Self { page, limit }
    }

    pub fn from_params(params: &PageParams) -> Self {
        Self::coerce(params.page.as_deref(), params.limit.as_deref())
    }

    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }
}

fn positive(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|value| *value > 0)
}

/// One page of results plus the bookkeeping a client needs to walk the rest.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub docs: Vec<T>,
    pub total_docs: u64,
    pub limit: u32,
    pub page: u32,
    pub total_pages: u64,
    pub has_prev_page: bool,
    pub has_next_page: bool,
}

impl<T> Page<T> {
    pub fn new(docs: Vec<T>, total_docs: u64, request: PageRequest) -> Self {
        let total_pages = total_docs.div_ceil(u64::from(request.limit));
        Self {
            docs,
            total_docs,
            limit: request.limit,
            page: request.page,
            total_pages,
            has_prev_page: request.page > 1,
            has_next_page: u64::from(request.page) < total_pages,
        }
    }
}
