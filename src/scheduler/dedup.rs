//! URL deduplication.
//!
//! The first request to claim a URL becomes its owner and performs the only
//! network fetch for it. Later requests for the same URL get a
//! [`DuplicateClaim`] that can either infer the owner's output path right away
//! or wait for the owner's published outcome (see [`DuplicatePolicy`]).
//!
//! Entries are write-once and live for the whole run.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::FetchOutcome;
use crate::fetch::FetchError;

/// How a duplicate request obtains its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Wait for the owner's fetch to finish and copy its output file or error.
    #[default]
    AwaitOwner,
    /// Report the owner's output path immediately, derived from the owner's
    /// index. The file may not exist yet, or at all if the owner fails.
    Eager,
}

impl DuplicatePolicy {
    /// Stable label used in configuration and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AwaitOwner => "await_owner",
            Self::Eager => "eager",
        }
    }
}

#[derive(Debug)]
struct DedupEntry {
    owner_idx: usize,
    outcome: watch::Sender<Option<FetchOutcome>>,
}

/// URL → owning request index, with a per-URL outcome slot.
#[derive(Debug, Default)]
pub struct DedupTable {
    entries: DashMap<String, Arc<DedupEntry>>,
}

impl DedupTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claims `url` for request `idx`.
    ///
    /// Returns [`Claim::Owner`] if nobody had claimed it yet, otherwise
    /// [`Claim::Duplicate`] naming the existing owner.
    pub fn claim(&self, url: &str, idx: usize) -> Claim {
        match self.entries.entry(url.to_string()) {
            Entry::Occupied(occupied) => {
                let entry = occupied.get();
                debug!(url, idx, owner_idx = entry.owner_idx, "duplicate URL");
                Claim::Duplicate(DuplicateClaim {
                    owner_idx: entry.owner_idx,
                    outcome: entry.outcome.subscribe(),
                })
            }
            Entry::Vacant(vacant) => {
                let (outcome, _) = watch::channel(None);
                let entry = Arc::new(DedupEntry {
                    owner_idx: idx,
                    outcome,
                });
                vacant.insert(Arc::clone(&entry));
                Claim::Owner(OwnerTicket {
                    url: url.to_string(),
                    entry,
                    published: false,
                })
            }
        }
    }

    /// The owner index recorded for `url`, if claimed.
    #[must_use]
    pub fn owner_of(&self, url: &str) -> Option<usize> {
        self.entries.get(url).map(|entry| entry.owner_idx)
    }

    /// Number of distinct URLs claimed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing has been claimed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of [`DedupTable::claim`].
#[derive(Debug)]
pub enum Claim {
    /// This request owns the URL and must fetch it.
    Owner(OwnerTicket),
    /// Another request owns the URL.
    Duplicate(DuplicateClaim),
}

impl Claim {
    /// True if the URL had already been claimed.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }

    /// Index of the request that owns the URL.
    #[must_use]
    pub fn owner_idx(&self) -> usize {
        match self {
            Self::Owner(ticket) => ticket.entry.owner_idx,
            Self::Duplicate(dup) => dup.owner_idx,
        }
    }
}

/// Held by the owning request until it publishes its outcome.
///
/// Dropping an unpublished ticket (for example when the owner's worker
/// panics) publishes an [`FetchError::OwnerAbandoned`] outcome so waiting
/// duplicates are released.
#[derive(Debug)]
pub struct OwnerTicket {
    url: String,
    entry: Arc<DedupEntry>,
    published: bool,
}

impl OwnerTicket {
    /// Publishes the owner's outcome to every current and future duplicate.
    pub fn publish(mut self, outcome: FetchOutcome) {
        self.entry.outcome.send_replace(Some(outcome));
        self.published = true;
    }
}

impl Drop for OwnerTicket {
    fn drop(&mut self) {
        if self.published {
            return;
        }
        warn!(url = %self.url, owner_idx = self.entry.owner_idx, "owner finished without an outcome");
        let error = FetchError::owner_abandoned(self.url.clone(), self.entry.owner_idx);
        self.entry.outcome.send_replace(Some(FetchOutcome {
            output_file: None,
            error: Some(Arc::new(error)),
        }));
    }
}

/// Handed to a duplicate request.
#[derive(Debug)]
pub struct DuplicateClaim {
    owner_idx: usize,
    outcome: watch::Receiver<Option<FetchOutcome>>,
}

impl DuplicateClaim {
    /// Index of the owning request.
    #[must_use]
    pub fn owner_idx(&self) -> usize {
        self.owner_idx
    }

    /// Waits until the owner publishes its outcome.
    ///
    /// Returns `None` only if the table itself was dropped first.
    pub async fn wait(mut self) -> Option<FetchOutcome> {
        let published = self.outcome.wait_for(Option::is_some).await.ok()?;
        (*published).clone()
    }
}
