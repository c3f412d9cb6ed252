//! When to ask for the next page while the reader scrolls a list.

use crate::news::QUERY_PAGE_SIZE;

/// Number of page requests after which the feed is exhausted.
///
/// Integer division rounds down, so one page is added for the remainder and
/// one more so the final request is allowed to come back short.
pub fn total_pages(total_results: u32) -> u32 {
    total_results / QUERY_PAGE_SIZE + 2
}

/// True once the cursor has advanced past the last page the server can fill.
pub fn is_last_page(next_page: u32, total_results: u32) -> bool {
    next_page == total_pages(total_results)
}

/// Snapshot of a scrolled list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollWindow {
    /// Index of the first visible row
    pub first_visible: usize,
    /// Number of rows on screen
    pub visible_count: usize,
    /// Rows in the list
    pub total_count: usize,
    /// The user is actively scrolling
    pub is_scrolling: bool,
}

impl ScrollWindow {
    /// Window of a reader that has scrolled through all `count` rows, as a
    /// line-oriented terminal does after printing a page.
    pub fn showing_all(count: usize) -> Self {
        Self {
            first_visible: 0,
            visible_count: count,
            total_count: count,
            is_scrolling: true,
        }
    }

    pub fn is_at_last_item(&self) -> bool {
        self.first_visible.saturating_add(self.visible_count) >= self.total_count
    }
}

/// Decide whether scrolling to `window` should trigger the next page.
///
/// Never while a request is in flight or after the last page, and only once
/// the list already holds at least one full page.
pub fn should_paginate(window: &ScrollWindow, is_loading: bool, is_last_page: bool) -> bool {
    !is_loading
        && !is_last_page
        && window.is_at_last_item()
        && window.total_count >= QUERY_PAGE_SIZE as usize
        && window.is_scrolling
}
