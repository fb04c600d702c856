//! The `{count, next, previous, results}` list envelope.

use axum::http::Uri;
use rr_core::pagination::{Page, PageParams};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Paginated<T> {
    /// `next`/`previous` are relative links to the neighbouring windows of `uri`.
    pub fn from_page(page: Page<T>, uri: &Uri) -> Self {
        let PageParams { limit, offset } = page.params;
        let next = page.has_next().then(|| page_link(uri, limit, offset.saturating_add(limit)));
        let previous = page.has_previous().then(|| page_link(uri, limit, offset.saturating_sub(limit).max(0)));
        Paginated { count: page.count, next, previous, results: page.results }
    }
}

/// Rewrites `limit`/`offset` in the query of `uri`, keeping every other pair.
fn page_link(uri: &Uri, limit: i64, offset: i64) -> String {
    let mut pairs: Vec<String> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or_default();
            key != "limit" && key != "offset"
        })
        .map(str::to_string)
        .collect();
    pairs.push(format!("limit={}", limit));
    if offset > 0 {
        pairs.push(format!("offset={}", offset));
    }
    format!("{}?{}", uri.path(), pairs.join("&"))
}
