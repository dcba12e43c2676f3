//! The fetch seam used by scheduler workers, plus its `reqwest` implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument, warn};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::FetchError;
use crate::user_agent;

/// Performs exactly one HTTP GET for a URL.
///
/// The scheduler treats implementations as opaque: it never retries, and any
/// error returned here becomes that request's result.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url` and returns the full response body.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] describing why the body could not be obtained.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Transport settings for [`HttpFetcher`].
#[derive(Debug, Clone, Copy)]
pub struct FetchClientOptions {
    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout, including reading the body.
    pub read_timeout: Duration,
    /// Verify TLS certificates. Off by default so self-signed and
    /// misconfigured hosts can still be fetched.
    pub verify_tls: bool,
}

impl Default for FetchClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
            verify_tls: false,
        }
    }
}

/// HTTP fetcher backed by a pooled `reqwest` client.
///
/// Create once and share (it is cheap to clone); connections are pooled
/// per host across all workers.
///
/// # Example
///
/// ```no_run
/// use hostfetch_core::fetch::{FetchClientOptions, Fetcher, HttpFetcher};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = HttpFetcher::new(FetchClientOptions::default())?;
/// let body = fetcher.fetch("https://example.com/").await?;
/// println!("{} bytes", body.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Builds a fetcher with the given transport options.
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` builder error if the TLS backend cannot be
    /// initialised.
    #[instrument(level = "debug")]
    pub fn new(options: FetchClientOptions) -> Result<Self, reqwest::Error> {
        if !options.verify_tls {
            warn!("TLS certificate verification is disabled");
        }
        let client = Client::builder()
            .connect_timeout(options.connect_timeout)
            .timeout(options.read_timeout)
            .gzip(true)
            .danger_accept_invalid_certs(!options.verify_tls)
            .user_agent(user_agent::default_fetch_user_agent())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::timeout(url)
            } else {
                FetchError::network(url, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(url, status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::timeout(url)
            } else {
                FetchError::body(url, e)
            }
        })?;

        debug!(status = status.as_u16(), bytes = body.len(), "fetch complete");
        Ok(body.to_vec())
    }
}
