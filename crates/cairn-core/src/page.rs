//! Pagination and sorting primitives shared by all list operations.

use serde::Serialize;

/// Requested page window, already clamped to sane bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: u64,
    pub limit: u64,
}

impl PageParams {
    /// Clamps `page` to at least 1 and `limit` to `1..=max_limit`.
    #[must_use]
    pub fn clamped(page: u64, limit: u64, max_limit: u64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, max_limit.max(1)),
        }
    }

    /// Zero-based offset of the first item on this page.
    #[must_use]
    pub fn offset(&self) -> usize {
        usize::try_from((self.page - 1).saturating_mul(self.limit)).unwrap_or(usize::MAX)
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

/// One page of results plus the totals the response envelope needs.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub limit: u64,
    pub total: u64,
}

impl<T> Page<T> {
    /// Total page count: `ceil(total / limit)`.
    #[must_use]
    pub fn pages(&self) -> u64 {
        if self.total == 0 {
            0
        } else {
            self.total.div_ceil(self.limit)
        }
    }

    /// Cuts one page out of an already-filtered, already-sorted vector.
    ///
    /// A page past the end yields an empty item list with the full total,
    /// which the envelope renders as `success: true` with empty data.
    #[must_use]
    pub fn slice(items: Vec<T>, params: &PageParams) -> Self {
        let total = items.len() as u64;
        let items = items
            .into_iter()
            .skip(params.offset())
            .take(usize::try_from(params.limit).unwrap_or(usize::MAX))
            .collect();
        Self {
            items,
            page: params.page,
            limit: params.limit,
            total,
        }
    }

    /// Maps the items while keeping the page window intact.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            limit: self.limit,
            total: self.total,
        }
    }
}

/// Sort order parsed from the `sort` query parameter: a field name with an
/// optional `-` prefix for descending (`sort=-createdAt`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub descending: bool,
}

impl Sort {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix('-') {
            Some(field) => Self {
                field: field.to_string(),
                descending: true,
            },
            None => Self {
                field: raw.to_string(),
                descending: false,
            },
        }
    }
}

impl Default for Sort {
    /// Newest first.
    fn default() -> Self {
        Self {
            field: "createdAt".to_string(),
            descending: true,
        }
    }
}
