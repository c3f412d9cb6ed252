//! News API access: article types, the [`NewsSource`] seam, and the HTTP client.
//!
//! - [`types`] - Serde models for pages, articles, and sources
//! - [`source`] - The [`NewsSource`] trait and its error taxonomy
//! - [`client`] - [`NewsApiClient`], the reqwest-backed source

mod client;
mod source;
mod types;

pub use client::{NewsApiClient, DEFAULT_BASE_URL, QUERY_PAGE_SIZE};
pub use source::{NewsSource, SourceError};
pub use types::{Article, NewsResponse, Source};
