//! Terminal news reader: paginated headlines and search over a NewsAPI-compatible
//! service, with articles saved to SQLite for offline reading.

pub mod config;
pub mod connectivity;
pub mod feed;
pub mod news;
pub mod resource;
pub mod storage;
pub mod util;
