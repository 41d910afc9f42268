//! Pagination result bundle
//!
//! One page of audit entries together with the metadata a caller needs to
//! render pagination controls without issuing a second count query.

use spoor_core::domain::Entry;

/// One page of audit entries plus pagination metadata
#[derive(Debug, Clone, PartialEq)]
pub struct AuditPager {
    entries: Vec<Entry>,
    page: u32,
    page_size: u32,
    total_count: u64,
}

impl AuditPager {
    /// Creates a pager from a fetched page and the total match count
    pub(crate) fn new(entries: Vec<Entry>, page: u32, page_size: u32, total_count: u64) -> Self {
        Self {
            entries,
            page,
            page_size,
            total_count,
        }
    }

    /// Returns the entries of the current page
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Consumes the pager and returns the current page's entries
    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }

    /// Returns the 1-indexed current page number
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Returns the page size the pager was built with
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Returns the total number of matching entries across all pages
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Returns the total number of pages (0 when there are no matches)
    pub fn page_count(&self) -> u64 {
        self.total_count.div_ceil(u64::from(self.page_size))
    }

    /// Returns true when the matches exceed one page
    pub fn have_to_paginate(&self) -> bool {
        self.total_count > u64::from(self.page_size)
    }
}
