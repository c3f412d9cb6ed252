use async_trait::async_trait;
use thiserror::Error;

use super::types::NewsResponse;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures a [`NewsSource`] can report.
///
/// The feed state machine maps each variant to a fixed user-facing message,
/// except `Unsuccessful`, whose message is shown as-is.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Server answered with a non-2xx status or an empty body
    #[error("{message}")]
    Unsuccessful {
        status: Option<u16>,
        message: String,
    },
    /// Connection, timeout, or body read failure
    #[error("Request failed: {0}")]
    Network(#[source] BoxError),
    /// Body could not be decoded into a page of articles
    #[error("Conversion error: {0}")]
    Conversion(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(Box::new(err))
    }
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        SourceError::Network(Box::new(err))
    }
}

impl SourceError {
    pub fn unsuccessful(status: Option<u16>, message: impl Into<String>) -> Self {
        SourceError::Unsuccessful {
            status,
            message: message.into(),
        }
    }
}

/// Remote provider of paginated article listings.
///
/// Pages are 1-based.
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn top_headlines(&self, country: &str, page: u32) -> Result<NewsResponse, SourceError>;

    async fn search(&self, query: &str, page: u32) -> Result<NewsResponse, SourceError>;
}

#[async_trait]
impl<T: NewsSource + ?Sized> NewsSource for std::sync::Arc<T> {
    async fn top_headlines(&self, country: &str, page: u32) -> Result<NewsResponse, SourceError> {
        (**self).top_headlines(country, page).await
    }

    async fn search(&self, query: &str, page: u32) -> Result<NewsResponse, SourceError> {
        (**self).search(query, page).await
    }
}
