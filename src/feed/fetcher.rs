//! Feed fetcher.
//!
//! [`FeedSource`] is the seam the check cycle fetches through. [`HttpFetcher`]
//! implements it with a single pooled `reqwest::Client` shared by all workers.

use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8};
use reqwest::Client;
use thiserror::Error;

use crate::config::CheckConfig;
use crate::{FeedCheckError, Result};

/// Classified fetch failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The URL is malformed or not an http(s) URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The request did not complete within the fetch timeout.
    #[error("request timed out")]
    Timeout,

    /// Connection, DNS, TLS or other transport failure.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The server answered with a non-success status.
    #[error("HTTP error: {0}")]
    Status(u16),

    /// The response body exceeds the configured limit.
    #[error("feed too large: {size} bytes (max {limit} bytes)")]
    TooLarge { size: u64, limit: u64 },

    /// The response body could not be read.
    #[error("failed to read response: {0}")]
    Body(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = e.status() {
            FetchError::Status(status.as_u16())
        } else if e.is_body() || e.is_decode() {
            FetchError::Body(e.to_string())
        } else {
            FetchError::Connection(e.to_string())
        }
    }
}

/// Source of feed documents.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the document body at `url`.
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError>;
}

/// HTTP feed fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_feed_size: u64,
}

impl HttpFetcher {
    /// Create a fetcher from the check configuration.
    ///
    /// `fetch_timeout_secs` bounds each request as a whole, body included.
    pub fn new(config: &CheckConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.fetch_timeout())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| FeedCheckError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_feed_size: config.max_feed_size_bytes,
        })
    }
}

#[async_trait]
impl FeedSource for HttpFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
        validate_url(url)?;

        let mut response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_feed_size {
                return Err(FetchError::TooLarge {
                    size: content_length,
                    limit: self.max_feed_size,
                });
            }
        }

        let encoding = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_from_content_type)
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .unwrap_or(UTF_8);

        // Content-Length may be absent or wrong; enforce the limit while reading.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            body.extend_from_slice(&chunk);
            if body.len() as u64 > self.max_feed_size {
                return Err(FetchError::TooLarge {
                    size: body.len() as u64,
                    limit: self.max_feed_size,
                });
            }
        }

        let (text, _, _) = encoding.decode(&body);
        Ok(text.into_owned())
    }
}

/// Extract the `charset` parameter of a Content-Type header value.
fn charset_from_content_type(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if name.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"'))
        } else {
            None
        }
    })
}

/// Check that `url` is an absolute http(s) URL with a host.
pub fn validate_url(url: &str) -> std::result::Result<url::Url, FetchError> {
    let parsed = url::Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(FetchError::InvalidUrl(format!(
                "unsupported URL scheme: {}",
                scheme
            )));
        }
    }

    if parsed.host().is_none() {
        return Err(FetchError::InvalidUrl(format!("{url}: URL has no host")));
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve a single canned HTTP response and return a URL pointing at it.
    async fn serve_once(response: impl Into<Vec<u8>>, hold: Option<Duration>) -> String {
        let response = response.into();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf).await;
                if let Some(hold) = hold {
                    tokio::time::sleep(hold).await;
                }
                let _ = stream.write_all(&response).await;
                let _ = stream.shutdown().await;
            }
        });

        format!("http://{}/feed.xml", addr)
    }

    fn response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: application/rss+xml; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
    }

    fn test_config() -> CheckConfig {
        CheckConfig {
            fetch_timeout_secs: 2,
            ..CheckConfig::default()
        }
    }

    #[test]
    fn test_validate_url_valid() {
        assert!(validate_url("https://example.com/feed.xml").is_ok());
        assert!(validate_url("http://127.0.0.1:8080/rss").is_ok());
    }

    #[test]
    fn test_validate_url_unparsable() {
        assert!(matches!(
            validate_url("not a url"),
            Err(FetchError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_validate_url_invalid_scheme() {
        let result = validate_url("ftp://example.com/feed.xml");
        assert!(matches!(result, Err(FetchError::InvalidUrl(msg)) if msg.contains("unsupported URL scheme")));
    }

    #[test]
    fn test_fetch_error_display() {
        assert_eq!(FetchError::Status(404).to_string(), "HTTP error: 404");
        assert_eq!(
            FetchError::TooLarge { size: 20, limit: 10 }.to_string(),
            "feed too large: 20 bytes (max 10 bytes)"
        );
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let url = serve_once(response("200 OK", "<rss></rss>"), None).await;
        let fetcher = HttpFetcher::new(&test_config()).unwrap();

        let body = fetcher.fetch(&url).await.unwrap();
        assert_eq!(body, "<rss></rss>");
    }

    #[tokio::test]
    async fn test_fetch_classifies_status() {
        let url = serve_once(response("404 Not Found", ""), None).await;
        let fetcher = HttpFetcher::new(&test_config()).unwrap();

        assert_eq!(fetcher.fetch(&url).await, Err(FetchError::Status(404)));
    }

    #[tokio::test]
    async fn test_fetch_server_error() {
        let url = serve_once(response("503 Service Unavailable", "busy"), None).await;
        let fetcher = HttpFetcher::new(&test_config()).unwrap();

        assert_eq!(fetcher.fetch(&url).await, Err(FetchError::Status(503)));
    }

    #[tokio::test]
    async fn test_fetch_too_large() {
        let body = "x".repeat(64);
        let url = serve_once(response("200 OK", &body), None).await;
        let config = CheckConfig {
            max_feed_size_bytes: 16,
            ..test_config()
        };
        let fetcher = HttpFetcher::new(&config).unwrap();

        assert_eq!(
            fetcher.fetch(&url).await,
            Err(FetchError::TooLarge { size: 64, limit: 16 })
        );
    }

    #[tokio::test]
    async fn test_fetch_too_large_without_content_length() {
        let body = "x".repeat(64 * 1024);
        let raw = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/rss+xml\r\nConnection: close\r\n\r\n{}",
            body
        );
        let url = serve_once(raw, None).await;
        let config = CheckConfig {
            max_feed_size_bytes: 1024,
            ..test_config()
        };
        let fetcher = HttpFetcher::new(&config).unwrap();

        match fetcher.fetch(&url).await {
            Err(FetchError::TooLarge { size, limit }) => {
                assert_eq!(limit, 1024);
                assert!(size > 1024 && size <= 64 * 1024);
            }
            other => panic!("expected TooLarge, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_decodes_declared_charset() {
        let mut raw = b"HTTP/1.1 200 OK\r\nContent-Type: text/xml; charset=\"ISO-8859-1\"\r\nContent-Length: 4\r\nConnection: close\r\n\r\n".to_vec();
        raw.extend_from_slice(b"caf\xe9");
        let url = serve_once(raw, None).await;
        let fetcher = HttpFetcher::new(&test_config()).unwrap();

        assert_eq!(fetcher.fetch(&url).await.unwrap(), "caf\u{e9}");
    }

    #[test]
    fn test_charset_from_content_type() {
        assert_eq!(
            charset_from_content_type("application/rss+xml; charset=utf-8"),
            Some("utf-8")
        );
        assert_eq!(
            charset_from_content_type("text/xml;Charset=\"windows-1252\""),
            Some("windows-1252")
        );
        assert_eq!(charset_from_content_type("text/xml"), None);
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let url = serve_once(
            response("200 OK", "<rss></rss>"),
            Some(Duration::from_secs(10)),
        )
        .await;
        let config = CheckConfig {
            fetch_timeout_secs: 1,
            ..CheckConfig::default()
        };
        let fetcher = HttpFetcher::new(&config).unwrap();

        assert_eq!(fetcher.fetch(&url).await, Err(FetchError::Timeout));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = HttpFetcher::new(&test_config()).unwrap();
        let result = fetcher.fetch(&format!("http://{}/feed.xml", addr)).await;

        assert!(matches!(result, Err(FetchError::Connection(_))));
    }

    #[tokio::test]
    async fn test_fetch_invalid_url_does_no_io() {
        let fetcher = HttpFetcher::new(&test_config()).unwrap();
        assert!(matches!(
            fetcher.fetch("file:///etc/passwd").await,
            Err(FetchError::InvalidUrl(_))
        ));
    }
}
