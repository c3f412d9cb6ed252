use async_trait::async_trait;
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use url::Url;

use super::source::{NewsSource, SourceError};
use super::types::{ApiErrorBody, NewsResponse};
use crate::util::{validate_api_base, UrlValidationError};

/// Articles requested per page; also drives the last-page computation.
pub const QUERY_PAGE_SIZE: u32 = 20;

pub const DEFAULT_BASE_URL: &str = "https://newsapi.org";

const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// [`NewsSource`] backed by a NewsAPI-compatible REST service.
///
/// The API key is sent as the `apiKey` query parameter and is never logged.
#[derive(Clone)]
pub struct NewsApiClient {
    client: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
}

impl std::fmt::Debug for NewsApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewsApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl NewsApiClient {
    /// Build a client for `base_url`.
    ///
    /// # Errors
    ///
    /// Rejects non-HTTPS base URLs unless they point at localhost.
    pub fn new(
        base_url: &str,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, UrlValidationError> {
        let base_url = validate_api_base(base_url)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("headlines/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to build tuned HTTP client, using defaults");
                reqwest::Client::new()
            });

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)], page: u32) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(path);
        {
            let mut query = url.query_pairs_mut();
            query.clear();
            for (key, value) in params {
                query.append_pair(key, value);
            }
            query.append_pair("page", &page.to_string());
            query.append_pair("pageSize", &QUERY_PAGE_SIZE.to_string());
            query.append_pair("apiKey", self.api_key.expose_secret());
        }
        url
    }

    async fn get_page(&self, url: Url) -> Result<NewsResponse, SourceError> {
        tracing::debug!(path = %url.path(), "Requesting news page");

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Unknown status").to_string();
            // NewsAPI explains failures (bad key, rate limit) in a JSON body
            let message = match read_limited_bytes(response, MAX_RESPONSE_SIZE).await {
                Ok(bytes) => serde_json::from_slice::<ApiErrorBody>(&bytes)
                    .ok()
                    .and_then(|body| body.message)
                    .unwrap_or(reason),
                Err(_) => reason,
            };
            tracing::warn!(status = status.as_u16(), message = %message, "News API returned an error status");
            return Err(SourceError::unsuccessful(Some(status.as_u16()), message));
        }

        let bytes = read_limited_bytes(response, MAX_RESPONSE_SIZE).await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            let reason = status.canonical_reason().unwrap_or("Empty response");
            return Err(SourceError::unsuccessful(Some(status.as_u16()), reason));
        }

        serde_json::from_slice(&bytes).map_err(|e| SourceError::Conversion(e.to_string()))
    }
}

#[async_trait]
impl NewsSource for NewsApiClient {
    async fn top_headlines(&self, country: &str, page: u32) -> Result<NewsResponse, SourceError> {
        let url = self.endpoint("/v2/top-headlines", &[("country", country)], page);
        self.get_page(url).await
    }

    async fn search(&self, query: &str, page: u32) -> Result<NewsResponse, SourceError> {
        let url = self.endpoint("/v2/everything", &[("q", query)], page);
        self.get_page(url).await
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, SourceError> {
    let too_large = || SourceError::Conversion(format!("Response exceeds {} bytes", limit));

    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(too_large());
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(too_large());
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
