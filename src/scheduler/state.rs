//! Run-scoped scheduler state shared by the loop and its workers.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tracing::debug;

use super::dedup::{Claim, DedupTable};
use super::host::{HostAdmission, host_key};
use super::Request;

/// Everything the scheduler loop and fetch workers mutate during one run.
///
/// Owned by a single run (behind an `Arc`). The host buckets sit behind one
/// mutex and the dedup table is a sharded map; no method holds both at once
/// and neither is held across an `.await`.
#[derive(Debug)]
pub struct SchedulerState {
    hosts: Mutex<HostAdmission>,
    dedup: DedupTable,
    wake: Notify,
    wake_on_release: bool,
}

impl SchedulerState {
    /// Creates empty state with the given per-host ceiling.
    ///
    /// With `wake_on_release`, every [`release`](Self::release) wakes the
    /// scheduler loop instead of leaving it to the next poll tick.
    #[must_use]
    pub fn new(per_host_limit: usize, wake_on_release: bool) -> Self {
        Self {
            hosts: Mutex::new(HostAdmission::new(per_host_limit)),
            dedup: DedupTable::new(),
            wake: Notify::new(),
            wake_on_release,
        }
    }

    fn hosts(&self) -> MutexGuard<'_, HostAdmission> {
        // A worker panic never leaves the buckets half-updated, so a
        // poisoned lock is still usable.
        self.hosts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Routes `request` to its host bucket and returns the host key.
    pub fn enqueue(&self, request: Request) -> String {
        let host = host_key(&request.url);
        self.hosts().enqueue(&host, request);
        host
    }

    /// Admits as many of `host`'s pending requests as its free capacity allows.
    pub fn admit(&self, host: &str) -> Vec<Request> {
        self.hosts().admit(host)
    }

    /// Frees one in-flight slot on `host`.
    pub fn release(&self, host: &str) {
        let released = self.hosts().release(host);
        if released && self.wake_on_release {
            self.wake.notify_one();
        }
    }

    /// Claims `url` for request `idx` in the dedup table.
    pub fn claim(&self, url: &str, idx: usize) -> Claim {
        self.dedup.claim(url, idx)
    }

    pub(crate) fn host_snapshot(&self) -> Vec<String> {
        self.hosts().hosts()
    }

    pub(crate) fn is_drained(&self) -> bool {
        let hosts = self.hosts();
        let drained = hosts.is_empty();
        if !drained {
            debug!(hosts = hosts.len(), "hosts still active");
        }
        drained
    }

    /// Completes when a release has happened since the last wake-up.
    pub(crate) async fn released(&self) {
        self.wake.notified().await;
    }

    /// Current in-flight count for `host`.
    #[must_use]
    pub fn in_flight(&self, host: &str) -> usize {
        self.hosts().in_flight(host)
    }

    /// Number of distinct URLs claimed so far.
    #[must_use]
    pub fn claimed_urls(&self) -> usize {
        self.dedup.len()
    }
}
