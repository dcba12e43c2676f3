//! Hostfetch Core Library
//!
//! This library provides the core functionality for the hostfetch tool,
//! which fetches a batch of URLs while bounding how many requests are
//! outstanding against any single host, fetching each distinct URL once, and
//! reporting a per-URL outcome when the whole batch has resolved.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`fetch`] - HTTP fetch client behind the [`Fetcher`] trait
//! - [`scheduler`] - per-host admission, dedup, workers and result collection
//! - [`input`] - URL list reading
//! - [`report`] - run summary rendering

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod fetch;
pub mod input;
pub mod report;
pub mod scheduler;
mod user_agent;

// Re-export commonly used types
pub use fetch::{FetchClientOptions, FetchError, Fetcher, HttpFetcher};
pub use input::{InputError, InputSource, parse_url_lines, read_requests};
pub use report::{SummaryFormat, SummaryRecord, SummaryStatus, write_summary};
pub use scheduler::{
    DEFAULT_PER_HOST_LIMIT, DEFAULT_POLL_INTERVAL, DuplicatePolicy, FetchResult, Request,
    RunReport, Scheduler, SchedulerConfig, SchedulerError,
};
