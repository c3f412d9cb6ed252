use std::sync::Arc;

use crate::news::NewsResponse;

/// Per-feed pagination bookkeeping.
///
/// `page` is the page the *next* request will ask for. `accumulated` holds
/// every article received since the last reset, in page order. It is shared
/// with published states, so handing it out only clones the `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedCursor {
    pub page: u32,
    pub accumulated: Option<Arc<NewsResponse>>,
    pub parameter: Option<String>,
}

impl Default for FeedCursor {
    fn default() -> Self {
        Self {
            page: 1,
            accumulated: None,
            parameter: None,
        }
    }
}

impl FeedCursor {
    /// True if a request for `parameter` would start the feed over.
    pub fn would_reset(&self, parameter: &str) -> bool {
        self.parameter
            .as_deref()
            .is_some_and(|current| current != parameter)
    }

    /// Page a request for `parameter` would fetch, without touching the
    /// cursor.
    pub fn page_for(&self, parameter: &str) -> u32 {
        if self.would_reset(parameter) {
            1
        } else {
            self.page
        }
    }

    /// Point the cursor at `parameter`, starting over from page 1 when it
    /// differs from the one the accumulated pages belong to.
    ///
    /// Returns true if the cursor was reset.
    pub fn retarget(&mut self, parameter: &str) -> bool {
        match self.parameter.as_deref() {
            Some(current) if current == parameter => false,
            Some(_) => {
                *self = Self {
                    parameter: Some(parameter.to_string()),
                    ..Self::default()
                };
                true
            }
            None => {
                self.parameter = Some(parameter.to_string());
                false
            }
        }
    }

    /// Fold a freshly fetched page into the cursor and advance to the next
    /// page.
    ///
    /// The first page is kept whole; later pages only contribute their
    /// articles, appended in order. Duplicates across pages are kept.
    ///
    /// Appending copies the accumulated response only while an earlier
    /// snapshot of it is still held elsewhere.
    pub fn merge(&mut self, page: NewsResponse) -> Arc<NewsResponse> {
        self.page = self.page.saturating_add(1);
        let merged = match self.accumulated.take() {
            Some(mut accumulated) => {
                Arc::make_mut(&mut accumulated).articles.extend(page.articles);
                accumulated
            }
            None => Arc::new(page),
        };
        self.accumulated = Some(Arc::clone(&merged));
        merged
    }

    pub fn article_count(&self) -> usize {
        self.accumulated.as_ref().map_or(0, |r| r.articles.len())
    }
}
