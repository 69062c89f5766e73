//! Pagination request types and the sanitizer.
//!
//! Page and page-size values arrive as untrusted query-string input. The
//! sanitizer is the single checkpoint that bounds them before anything
//! reaches the store, so it coerces instead of rejecting.

use serde::{Deserialize, Serialize};

/// Upper bound on rows returned by a single page.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Page size used when a request does not specify one.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Sort direction requested by a caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Pagination as requested by a caller.
///
/// Values are kept as `f64` because they come straight from a query string
/// and may be fractional, negative or NaN.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParams {
    pub page: Option<f64>,
    pub page_size: Option<f64>,
    pub order: Option<SortOrder>,
}

impl PaginationParams {
    pub const fn new(page: f64, page_size: f64) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
            order: None,
        }
    }

    #[must_use]
    pub const fn with_order(mut self, order: SortOrder) -> Self {
        self.order = Some(order);
        self
    }

    /// Apply defaults for missing values, then sanitize.
    pub fn sanitize(&self) -> Pagination {
        #[allow(clippy::cast_precision_loss)]
        let default_size = DEFAULT_PAGE_SIZE as f64;
        sanitize_pagination(
            self.page.unwrap_or(1.0),
            self.page_size.unwrap_or(default_size),
        )
    }
}

/// Bounded pagination in `skip`/`take` terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
    pub skip: u64,
    pub take: u64,
}

/// Bounded pagination in store-facing `limit`/`offset` terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageWindow {
    pub page: u64,
    pub page_size: u64,
    pub limit: u64,
    pub offset: u64,
}

impl From<Pagination> for PageWindow {
    fn from(p: Pagination) -> Self {
        Self {
            page: p.page,
            page_size: p.page_size,
            limit: p.take,
            offset: p.skip,
        }
    }
}

/// Convert a requested page/page-size pair into bounded values.
///
/// `page` is floored and raised to at least 1. `page_size` is floored and
/// clamped to `1..=MAX_PAGE_SIZE`. NaN and infinities are normalized, never
/// rejected.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn sanitize_pagination(page: f64, page_size: f64) -> Pagination {
    // f64::max/min return the non-NaN operand, so NaN collapses to the bound.
    let page = page.floor().max(1.0) as u64;
    let page_size = page_size.floor().max(1.0).min(MAX_PAGE_SIZE as f64) as u64;

    Pagination {
        page,
        page_size,
        skip: (page - 1).saturating_mul(page_size),
        take: page_size,
    }
}
