//! Shared wire models
//!
//! Pagination follows the dashboard convention: pages are 1-based, a page
//! number below 1 falls back to the first page and one past the end falls
//! back to the last page.

use serde::{Deserialize, Serialize};

/// One page of a larger result set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub total_count: u64,
    pub page_number: u64,
    pub pages_available: u64,
    pub page_items: Vec<T>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Page {
            total_count: 0,
            page_number: 1,
            pages_available: 0,
            page_items: vec![],
        }
    }
}

impl<T> Page<T> {
    pub fn new(total_count: u64, page_number: u64, page_size: u64, page_items: Vec<T>) -> Self {
        let pages_available = (total_count as f64 / page_size as f64).ceil() as u64;

        Page {
            total_count,
            page_number,
            pages_available,
            page_items,
        }
    }

    /// Slice `items` down to the requested page, clamping the page number
    /// into the valid range.
    pub fn paginate(items: Vec<T>, page_number: u64, page_size: u64) -> Self {
        let total_count = items.len() as u64;
        let pages_available = (total_count as f64 / page_size as f64).ceil() as u64;
        let page_number = if pages_available == 0 {
            1
        } else {
            page_number.clamp(1, pages_available)
        };

        let start = ((page_number - 1) * page_size) as usize;
        let page_items: Vec<T> = items
            .into_iter()
            .skip(start)
            .take(page_size as usize)
            .collect();

        Page {
            total_count,
            page_number,
            pages_available,
            page_items,
        }
    }
}
