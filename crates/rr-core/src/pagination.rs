//! Limit/offset pagination and list filters.

use serde::Deserialize;

pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const MAX_PAGE_LIMIT: i64 = 100;
/// Largest offset for which `offset + limit` cannot overflow.
pub const MAX_PAGE_OFFSET: i64 = i64::MAX - MAX_PAGE_LIMIT;

/// Raw `?limit=&offset=` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Sanitized window into a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub limit: i64,
    pub offset: i64,
}

impl Default for PageParams {
    fn default() -> Self {
        Self { limit: DEFAULT_PAGE_LIMIT, offset: 0 }
    }
}

impl From<PageQuery> for PageParams {
    /// Non-positive limits fall back to the default; oversized ones are capped.
    fn from(query: PageQuery) -> Self {
        let limit = match query.limit {
            Some(limit) if limit > 0 => limit.min(MAX_PAGE_LIMIT),
            _ => DEFAULT_PAGE_LIMIT,
        };
        let offset = query.offset.unwrap_or(0).clamp(0, MAX_PAGE_OFFSET);
        Self { limit, offset }
    }
}

/// One page of results plus the total size of the filtered set.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub count: i64,
    pub results: Vec<T>,
    pub params: PageParams,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            results: self.results.into_iter().map(f).collect(),
            params: self.params,
        }
    }

    pub fn has_next(&self) -> bool {
        self.params.offset.saturating_add(self.params.limit) < self.count
    }

    pub fn has_previous(&self) -> bool {
        self.params.offset > 0
    }
}

/// `?ordering=` on name-bearing resources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NameOrdering {
    #[default]
    Ascending,
    Descending,
}

impl NameOrdering {
    /// Unknown ordering fields are ignored rather than rejected.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("-name") => NameOrdering::Descending,
            _ => NameOrdering::Ascending,
        }
    }
}

/// Query parameters accepted by the category and genre lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaxonFilter {
    /// Partial, case-insensitive name match
    pub search: Option<String>,
    pub ordering: Option<String>,
    /// Exact name
    pub name: Option<String>,
    /// Exact slug
    pub slug: Option<String>,
}

/// Query parameters accepted by the title list. All filters combine.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitleFilter {
    /// Partial, case-insensitive name match
    pub name: Option<String>,
    pub year: Option<i32>,
    /// Category slug
    pub category: Option<String>,
    /// Genre slug
    pub genre: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    /// Partial username match
    pub search: Option<String>,
}
