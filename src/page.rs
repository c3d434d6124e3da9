//! Paginated result snapshot.

use serde::{Deserialize, Serialize};

/// One page of a listing, replaced wholesale on every successful fetch and
/// never merged with a prior snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl<T> ListResult<T> {
    /// `max(1, ceil(total / page_size))` — an empty collection still has one
    /// (empty) page so the pagination footer always has something to render.
    pub fn total_pages_for(total: u64, page_size: u32) -> u32 {
        let pages = total.div_ceil(page_size.max(1) as u64);
        pages.max(1) as u32
    }

    pub fn empty(page: u32, page_size: u32) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page,
            page_size,
            total_pages: 1,
        }
    }

    /// Slice an already filtered collection into the requested page.
    ///
    /// The requested `page` is kept even when it lies beyond `total_pages`
    /// (the items just come back empty); clamping is the controller's call.
    pub fn paginate(filtered: Vec<T>, page: u32, page_size: u32) -> Self {
        let total = filtered.len() as u64;
        let total_pages = Self::total_pages_for(total, page_size);
        let start = (page.max(1) as usize - 1).saturating_mul(page_size as usize);
        let items: Vec<T> = filtered
            .into_iter()
            .skip(start)
            .take(page_size as usize)
            .collect();
        Self {
            items,
            total,
            page: page.max(1),
            page_size,
            total_pages,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
