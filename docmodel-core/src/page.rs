//! Pagination parameters and search result pages.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// A 1-based page number and a page size.
///
/// # Example
///
/// ```ignore
/// use docmodel::page::PaginationParams;
///
/// let params = PaginationParams::new(3, 20);
/// assert_eq!(params.offset(), 40);
/// assert_eq!(params.page_count(41), 3);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationParams {
    /// The page number (1-indexed).
    pub page: usize,
    /// Number of items per page.
    pub per_page: usize,
}

impl PaginationParams {
    pub fn new(page: usize, per_page: usize) -> Self {
        Self { page, per_page }
    }

    pub fn builder() -> PaginationParamsBuilder {
        PaginationParamsBuilder::new()
    }

    /// Rejects parameters that cannot describe a page.
    pub fn validate(&self) -> ModelResult<()> {
        if self.per_page == 0 {
            return Err(ModelError::InvalidPagination("per_page must be at least 1".into()));
        }

        Ok(())
    }

    /// Number of items preceding this page. Page 0 is treated like page 1.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1) * self.per_page
    }

    /// Number of pages needed for `total` items.
    pub fn page_count(&self, total: usize) -> usize {
        if self.per_page == 0 {
            return 0;
        }

        total.div_ceil(self.per_page)
    }

    /// Returns the items belonging to this page.
    ///
    /// Page 0, and pages past the end, select nothing.
    pub fn select<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        if self.page == 0 || self.offset() >= items.len() {
            return &[];
        }

        let end = (self.offset() + self.per_page).min(items.len());

        &items[self.offset()..end]
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self { page: 1, per_page: 10 }
    }
}

/// Builder for [`PaginationParams`]; unset values default to page 1 and 10 per page.
#[derive(Debug, Default)]
pub struct PaginationParamsBuilder {
    page: Option<usize>,
    per_page: Option<usize>,
}

impl PaginationParamsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_per_page(mut self, per_page: usize) -> Self {
        self.per_page = Some(per_page);
        self
    }

    pub fn build(self) -> PaginationParams {
        PaginationParams {
            page: self.page.unwrap_or(1),
            per_page: self.per_page.unwrap_or(10),
        }
    }
}

/// One page of a client-filtered search.
#[derive(Debug)]
pub struct SearchPage<T> {
    /// Pages needed to show every match found by the scan.
    pub all_pages: usize,
    /// The loaded documents of the requested page.
    pub docs: Vec<T>,
}

impl<T> Default for SearchPage<T> {
    fn default() -> Self {
        Self { all_pages: 0, docs: Vec::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_rounds_up() {
        let params = PaginationParams::new(1, 2);

        assert_eq!(params.page_count(0), 0);
        assert_eq!(params.page_count(4), 2);
        assert_eq!(params.page_count(5), 3);
    }

    #[test]
    fn select_takes_the_requested_slice() {
        let items = ["a", "b", "c", "d", "e"];

        assert_eq!(PaginationParams::new(2, 2).select(&items), &["c", "d"]);
        assert_eq!(PaginationParams::new(3, 2).select(&items), &["e"]);
        assert!(PaginationParams::new(4, 2).select(&items).is_empty());
        assert!(PaginationParams::new(0, 2).select(&items).is_empty());
    }

    #[test]
    fn zero_per_page_is_rejected() {
        assert!(matches!(
            PaginationParams::new(1, 0).validate(),
            Err(ModelError::InvalidPagination(_))
        ));
        assert!(PaginationParams::default().validate().is_ok());
    }

    #[test]
    fn builder_defaults() {
        assert_eq!(PaginationParams::builder().build(), PaginationParams::new(1, 10));
        assert_eq!(
            PaginationParams::builder().with_page(4).with_per_page(25).build(),
            PaginationParams::new(4, 25)
        );
    }
}
