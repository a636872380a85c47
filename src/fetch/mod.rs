//! Source image fetcher.
//!
//! Fetches the bytes of the source image over HTTP(S). The fetcher sits
//! behind the [`SourceFetcher`] trait so the request pipeline can be driven
//! by a stub in tests.
//!
//! # Limits
//!
//! - Total request timeout (connect + body), default 30 seconds
//! - Maximum body size, checked against `Content-Length` and again while
//!   streaming the body
//! - Only `http` and `https` sources are fetched
//! - Redirects are followed only while they stay on the source host, so an
//!   allowlisted origin cannot bounce the fetch somewhere else

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::time::Duration;
use url::Url;

use crate::constants::{
    DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_MAX_SOURCE_BYTES, MAX_FETCH_REDIRECTS, USER_AGENT,
};

/// Errors produced while fetching a source image.
///
/// Every variant surfaces to the client as a 502.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    #[error("Invalid source URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported source URL scheme: {0}")]
    UnsupportedScheme(String),

    /// Upstream answered with a non-success status
    #[error("Upstream returned {0}")]
    Status(u16),

    #[error("{0}")]
    Request(String),

    #[error("Source image exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Request(format!("Upstream fetch timed out: {err}"))
        } else {
            FetchError::Request(format!("Upstream fetch failed: {err}"))
        }
    }
}

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Total time allowed for one fetch.
    pub timeout: Duration,
    /// Largest accepted body in bytes.
    pub max_bytes: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            max_bytes: DEFAULT_MAX_SOURCE_BYTES,
        }
    }
}

/// Capability: fetch the raw bytes behind a source URL.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// reqwest-backed fetcher.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl HttpFetcher {
    /// Create a new fetcher.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Client` if the HTTP client cannot be built
    /// (e.g., TLS backend initialisation failure).
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .redirect(same_host_redirects())
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            max_bytes: config.max_bytes,
        })
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let parsed = parse_source_url(url)?;

        let mut response = self.client.get(parsed).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_bytes as u64 {
                return Err(FetchError::TooLarge {
                    limit: self.max_bytes,
                });
            }
        }

        // Content-Length may be absent or wrong, so count while reading
        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body.freeze())
    }
}

/// Follow redirects that keep the host of the first request.
///
/// A stopped redirect hands the 3xx response back, which the status check
/// turns into `FetchError::Status`.
fn same_host_redirects() -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(|attempt| {
        let same_host = attempt
            .previous()
            .first()
            .map(|first| first.host_str() == attempt.url().host_str())
            .unwrap_or(false);

        if attempt.previous().len() > MAX_FETCH_REDIRECTS {
            attempt.error("too many redirects")
        } else if same_host {
            attempt.follow()
        } else {
            tracing::warn!(target_host = ?attempt.url().host_str(), "Refusing cross-host redirect");
            attempt.stop()
        }
    })
}

/// Parse a source URL, accepting only http and https.
fn parse_source_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(FetchError::UnsupportedScheme(other.to_string())),
    }
}
