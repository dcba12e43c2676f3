//! Request and result records flowing through the scheduler.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::fetch::FetchError;

/// One URL to fetch, identified by its position in the input.
///
/// `idx` is assigned once at ingestion and is the stable identity used for
/// output naming and duplicate cross-referencing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// 0-based position in the input.
    pub idx: usize,
    /// The URL as read from the input.
    pub url: String,
}

impl Request {
    /// Creates a request.
    pub fn new(idx: usize, url: impl Into<String>) -> Self {
        Self {
            idx,
            url: url.into(),
        }
    }
}

/// The outcome of one request. Exactly one is produced per submitted request.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Index of the request this result belongs to.
    pub idx: usize,
    /// The request's URL.
    pub url: String,
    /// Where the body was written. For duplicates, the owner's file.
    pub output_file: Option<PathBuf>,
    /// Why the request failed, if it did.
    pub error: Option<Arc<FetchError>>,
    /// For duplicates, the index of the request that performed the fetch.
    pub duplicate_of: Option<usize>,
}

impl FetchResult {
    /// A request that fetched its own URL successfully.
    #[must_use]
    pub fn fetched(idx: usize, url: impl Into<String>, output_file: Option<PathBuf>) -> Self {
        Self {
            idx,
            url: url.into(),
            output_file,
            error: None,
            duplicate_of: None,
        }
    }

    /// A request that failed.
    #[must_use]
    pub fn failed(idx: usize, url: impl Into<String>, error: FetchError) -> Self {
        Self {
            idx,
            url: url.into(),
            output_file: None,
            error: Some(Arc::new(error)),
            duplicate_of: None,
        }
    }

    /// A request whose URL was already claimed by `owner_idx`.
    #[must_use]
    pub fn duplicate(
        idx: usize,
        url: impl Into<String>,
        owner_idx: usize,
        outcome: FetchOutcome,
    ) -> Self {
        Self {
            idx,
            url: url.into(),
            output_file: outcome.output_file,
            error: outcome.error,
            duplicate_of: Some(owner_idx),
        }
    }

    /// Returns true when the request did not fail.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Returns true when the request reused another request's fetch.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        self.duplicate_of.is_some()
    }
}

/// The shareable part of a result: what a duplicate copies from its owner.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// Owner's output file, if one was written.
    pub output_file: Option<PathBuf>,
    /// Owner's error, if the fetch failed.
    pub error: Option<Arc<FetchError>>,
}

impl From<&FetchResult> for FetchOutcome {
    fn from(result: &FetchResult) -> Self {
        Self {
            output_file: result.output_file.clone(),
            error: result.error.clone(),
        }
    }
}

/// File name for the body fetched by request `idx`.
///
/// ```
/// use hostfetch_core::scheduler::output_file_name;
///
/// assert_eq!(output_file_name(0), "url_0.html");
/// assert_eq!(output_file_name(42), "url_42.html");
/// ```
#[must_use]
pub fn output_file_name(idx: usize) -> String {
    format!("url_{idx}.html")
}

/// Full output path for request `idx` under `output_dir`.
#[must_use]
pub fn output_path(output_dir: &Path, idx: usize) -> PathBuf {
    output_dir.join(output_file_name(idx))
}
