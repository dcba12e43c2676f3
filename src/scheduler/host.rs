//! Per-host admission control.
//!
//! Requests are grouped into buckets by [`host_key`]. Each bucket holds a FIFO
//! of pending requests and a count of fetches in flight; [`HostAdmission::admit`]
//! never lets that count exceed the configured ceiling. Distinct hosts are
//! independent, so total parallelism is `hosts × ceiling`.
//!
//! # Example
//!
//! ```
//! use hostfetch_core::scheduler::{HostAdmission, Request, host_key};
//!
//! let mut hosts = HostAdmission::new(2);
//! for (idx, url) in ["http://a.com/1", "http://a.com/2", "http://a.com/3"].iter().enumerate() {
//!     hosts.enqueue(&host_key(url), Request::new(idx, *url));
//! }
//!
//! // Only two may be in flight at once.
//! assert_eq!(hosts.admit("a.com").len(), 2);
//! assert!(hosts.admit("a.com").is_empty());
//!
//! // A completion frees one slot.
//! hosts.release("a.com");
//! assert_eq!(hosts.admit("a.com").len(), 1);
//! ```

use std::collections::{HashMap, VecDeque};

use tracing::{trace, warn};
use url::Url;

use super::Request;

/// Bucket key for URLs that have no parseable host.
pub const DEFAULT_HOST_KEY: &str = "";

/// Derives the admission bucket key for a URL.
///
/// The key is the lowercased host, with `:port` appended when the URL names a
/// non-default port. Unparseable or host-less URLs share [`DEFAULT_HOST_KEY`];
/// their fetch is still attempted and fails on its own.
///
/// # Examples
///
/// ```
/// use hostfetch_core::scheduler::host_key;
///
/// assert_eq!(host_key("https://Example.COM/path?q=1"), "example.com");
/// assert_eq!(host_key("http://example.com:8080/x"), "example.com:8080");
/// assert_eq!(host_key("http://example.com:80/x"), "example.com");
/// assert_eq!(host_key("not a url"), "");
/// ```
#[must_use]
pub fn host_key(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return DEFAULT_HOST_KEY.to_string();
    };
    let Some(host) = parsed.host_str() else {
        return DEFAULT_HOST_KEY.to_string();
    };
    let host = host.to_ascii_lowercase();
    match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host,
    }
}

#[derive(Debug, Default)]
struct HostBucket {
    pending: VecDeque<Request>,
    in_flight: usize,
}

impl HostBucket {
    fn is_drained(&self) -> bool {
        self.pending.is_empty() && self.in_flight == 0
    }
}

/// Host buckets plus the uniform per-host ceiling.
///
/// Not synchronised on its own; the scheduler keeps it behind one lock.
#[derive(Debug)]
pub struct HostAdmission {
    ceiling: usize,
    buckets: HashMap<String, HostBucket>,
}

impl HostAdmission {
    /// Creates an empty controller. A ceiling of zero is raised to one so a
    /// host can never stall permanently.
    #[must_use]
    pub fn new(ceiling: usize) -> Self {
        Self {
            ceiling: ceiling.max(1),
            buckets: HashMap::new(),
        }
    }

    /// The per-host concurrency ceiling.
    #[must_use]
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Appends `request` to `host`'s pending queue, creating the bucket if needed.
    pub fn enqueue(&mut self, host: &str, request: Request) {
        trace!(host, idx = request.idx, "enqueue");
        self.buckets
            .entry(host.to_string())
            .or_default()
            .pending
            .push_back(request);
    }

    /// Takes up to `ceiling - in_flight` requests from the front of `host`'s
    /// queue and counts them as in flight.
    pub fn admit(&mut self, host: &str) -> Vec<Request> {
        let Some(bucket) = self.buckets.get_mut(host) else {
            return Vec::new();
        };
        let capacity = self.ceiling.saturating_sub(bucket.in_flight);
        let take = capacity.min(bucket.pending.len());
        let admitted: Vec<Request> = bucket.pending.drain(..take).collect();
        bucket.in_flight += admitted.len();
        admitted
    }

    /// Records one finished fetch for `host`, removing the bucket once it has
    /// nothing pending and nothing in flight.
    ///
    /// Returns false if `host` had no bucket or nothing in flight.
    pub fn release(&mut self, host: &str) -> bool {
        let Some(bucket) = self.buckets.get_mut(host) else {
            warn!(host, "release for unknown host");
            return false;
        };
        if bucket.in_flight == 0 {
            warn!(host, "release with nothing in flight");
            return false;
        }
        bucket.in_flight -= 1;
        if bucket.is_drained() {
            self.buckets.remove(host);
            trace!(host, "host drained");
        }
        true
    }

    /// Snapshot of the hosts that currently have a bucket.
    #[must_use]
    pub fn hosts(&self) -> Vec<String> {
        self.buckets.keys().cloned().collect()
    }

    /// Returns true when no buckets remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Number of live buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Requests waiting for admission on `host`.
    #[must_use]
    pub fn pending_len(&self, host: &str) -> usize {
        self.buckets.get(host).map_or(0, |b| b.pending.len())
    }

    /// Requests currently admitted and not yet released on `host`.
    #[must_use]
    pub fn in_flight(&self, host: &str) -> usize {
        self.buckets.get(host).map_or(0, |b| b.in_flight)
    }
}
