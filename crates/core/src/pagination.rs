//! Page arithmetic for the log table.

use serde::Serialize;

use crate::error::CoreError;
use crate::params::RequestParams;

/// Rows per page when the request names none.
pub const DEFAULT_PAGE_SIZE: u32 = 500;

/// Upper bound for `limit`.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Clamp a requested page size into `[1, MAX_PAGE_SIZE]`.
pub fn clamp_limit(limit: Option<i64>, default: u32) -> u32 {
    match limit {
        Some(l) => l.clamp(1, i64::from(MAX_PAGE_SIZE)) as u32,
        None => default.clamp(1, MAX_PAGE_SIZE),
    }
}

/// A 1-indexed page of `size` rows, covering rows `[(n-1)*size, n*size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    number: u32,
    size: u32,
}

impl Page {
    pub fn new(number: u32, size: u32) -> Result<Self, CoreError> {
        if number == 0 {
            return Err(CoreError::invalid("page numbers start at 1"));
        }
        if size == 0 {
            return Err(CoreError::invalid("limit must be at least 1"));
        }
        Ok(Self { number, size })
    }

    /// `page`, adjusted by `nav=Previous|Next`, with a clamped `limit`.
    pub fn from_params(params: &RequestParams, default_size: u32) -> Result<Self, CoreError> {
        let number = params.parse::<i64>("page")?.unwrap_or(1);
        let number = match params.get("nav") {
            Some(nav) if nav.eq_ignore_ascii_case("previous") => number - 1,
            Some(nav) if nav.eq_ignore_ascii_case("next") => number + 1,
            _ => number,
        };
        if number < 1 {
            return Err(CoreError::invalid(format!("page {number} is out of range")));
        }
        let number = u32::try_from(number)
            .map_err(|_| CoreError::invalid(format!("page {number} is out of range")))?;
        let size = clamp_limit(params.parse::<i64>("limit")?, default_size);
        Self::new(number, size)
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Rows skipped before this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.size)
    }

    /// Exclusive end row of this page.
    pub fn end(&self) -> u64 {
        u64::from(self.number) * u64::from(self.size)
    }
}

/// Position of a page within the full result, for the table header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageSummary {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    /// 1-based number of the first row shown; 0 when the page is empty.
    pub first: u64,
    pub last: u64,
    pub has_previous: bool,
    pub has_next: bool,
}

impl PageSummary {
    pub fn new(page: &Page, rows_on_page: usize, total: u64) -> Self {
        let first = if rows_on_page == 0 {
            0
        } else {
            page.offset() + 1
        };
        let last = page.offset() + rows_on_page as u64;
        Self {
            page: page.number(),
            limit: page.size(),
            total,
            first,
            last,
            has_previous: page.number() > 1,
            has_next: page.end() < total,
        }
    }
}
