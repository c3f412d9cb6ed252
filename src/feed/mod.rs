//! Paginated breaking-news and search feeds.
//!
//! - [`NewsViewModel`] - The fetch-and-merge state machine and its channels
//! - [`FeedCursor`] - Per-feed page counter and accumulated results
//! - [`paging`] - Scroll-driven pagination policy
//!
//! # Example
//!
//! ```ignore
//! let vm = NewsViewModel::new(client, db, SysfsConnectivity::default());
//! let mut rx = vm.subscribe(FeedKind::BreakingNews);
//! vm.breaking_news("us", &cancel).await;
//! ```

mod cursor;
pub mod paging;
mod view_model;

pub use cursor::FeedCursor;
pub use view_model::{
    FeedKind, FeedState, NewsViewModel, PageRequest, CONVERSION_ERROR_MESSAGE,
    NETWORK_FAILURE_MESSAGE, NO_CONNECTION_MESSAGE,
};
