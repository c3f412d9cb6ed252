use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Errors that can occur during URL validation.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
    /// Plain HTTP to a remote host would leak the API key.
    #[error("Insecure API base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
}

/// Validates the news API base URL.
///
/// HTTPS is required because the API key travels in the query string.
/// Plain HTTP is accepted only for loopback hosts, which is what mock
/// servers in tests bind to.
///
/// # Examples
///
/// ```
/// use headlines::util::validate_api_base;
///
/// assert!(validate_api_base("https://newsapi.org").is_ok());
/// assert!(validate_api_base("http://127.0.0.1:8080").is_ok());
/// assert!(validate_api_base("http://newsapi.org").is_err());
/// ```
pub fn validate_api_base(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;
    let host = url.host_str().ok_or(UrlValidationError::MissingHost)?;

    match url.scheme() {
        "https" => Ok(url),
        "http" if is_loopback_host(host) => {
            tracing::warn!(base_url = %url, "Using non-HTTPS news API base URL (localhost only)");
            Ok(url)
        }
        "http" => Err(UrlValidationError::InsecureBaseUrl),
        scheme => Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }
}

/// Validates an article URL before it is used as a storage key.
///
/// Only absolute http(s) URLs with a host are accepted.
pub fn validate_article_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(url)
}

fn is_loopback_host(host: &str) -> bool {
    if host == "localhost" {
        return true;
    }
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_base_accepted() {
        let url = validate_api_base("https://newsapi.org").unwrap();
        assert_eq!(url.host_str(), Some("newsapi.org"));
    }

    #[test]
    fn test_http_base_rejected_for_remote_host() {
        assert!(matches!(
            validate_api_base("http://newsapi.org"),
            Err(UrlValidationError::InsecureBaseUrl)
        ));
    }

    #[test]
    fn test_http_base_allowed_for_loopback() {
        assert!(validate_api_base("http://localhost:9000").is_ok());
        assert!(validate_api_base("http://127.0.0.1:9000").is_ok());
        assert!(validate_api_base("http://[::1]:9000").is_ok());
    }

    #[test]
    fn test_base_with_other_scheme_rejected() {
        assert!(matches!(
            validate_api_base("ftp://newsapi.org"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_article_url_accepted() {
        assert!(validate_article_url("https://example.com/story?id=4").is_ok());
        assert!(validate_article_url("http://example.com/a").is_ok());
    }

    #[test]
    fn test_article_url_rejects_non_http() {
        assert!(validate_article_url("file:///etc/passwd").is_err());
        assert!(validate_article_url("javascript:alert(1)").is_err());
    }

    #[test]
    fn test_article_url_rejects_garbage() {
        assert!(matches!(
            validate_article_url(""),
            Err(UrlValidationError::InvalidUrl(_))
        ));
        assert!(validate_article_url("not a url").is_err());
    }
}
