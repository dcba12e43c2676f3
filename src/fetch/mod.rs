//! HTTP fetch client used by scheduler workers.
//!
//! The scheduler only sees the [`Fetcher`] trait: one call, one body or one
//! error. [`HttpFetcher`] is the production implementation over `reqwest`;
//! tests substitute their own.
//!
//! # Features
//!
//! - Connection pooling across all workers
//! - Configurable timeouts (30s connect, 5min read by default)
//! - Optional TLS certificate verification (off by default)
//! - Non-2xx responses are reported as [`FetchError::HttpStatus`]

mod client;
pub mod constants;
mod error;

pub use client::{FetchClientOptions, Fetcher, HttpFetcher};
pub use error::FetchError;
