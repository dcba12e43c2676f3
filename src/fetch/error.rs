//! Error types for the fetch module.
//!
//! A [`FetchError`] is per-request data: it ends up inside that request's
//! [`FetchResult`](crate::scheduler::FetchResult) and never aborts a run.

use thiserror::Error;

/// Errors that can occur while resolving a single fetch request.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed to fetch.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The response body could not be read to completion.
    #[error("error reading response body from {url}: {source}")]
    Body {
        /// The URL whose body failed.
        url: String,
        /// The underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// A duplicate request waited on its owner, but the owner never published an outcome.
    #[error("request #{owner_idx} fetching {url} ended without reporting an outcome")]
    OwnerAbandoned {
        /// The shared URL.
        url: String,
        /// Index of the request that claimed the URL.
        owner_idx: usize,
    },

    /// The worker task panicked before producing a result.
    #[error("fetch worker for {url} panicked: {message}")]
    WorkerPanicked {
        /// The URL the worker was handling.
        url: String,
        /// Panic payload, when it was a string.
        message: String,
    },
}

impl FetchError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates a body read error.
    pub fn body(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Body {
            url: url.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an owner-abandoned error for a duplicate request.
    pub fn owner_abandoned(url: impl Into<String>, owner_idx: usize) -> Self {
        Self::OwnerAbandoned {
            url: url.into(),
            owner_idx,
        }
    }

    /// Creates a worker-panicked error.
    pub fn worker_panicked(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WorkerPanicked {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Short machine-readable label used in the run summary.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network { .. } => "network",
            Self::Timeout { .. } => "timeout",
            Self::HttpStatus { .. } => "http_status",
            Self::Body { .. } => "body",
            Self::InvalidUrl { .. } => "invalid_url",
            Self::OwnerAbandoned { .. } => "owner_abandoned",
            Self::WorkerPanicked { .. } => "worker_panicked",
        }
    }
}

// No `From<reqwest::Error>`: every variant needs the URL, which the source
// error does not reliably carry. Use the constructors above.
