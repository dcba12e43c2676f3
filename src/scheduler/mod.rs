//! Host-aware, rate-limited fetch scheduling.
//!
//! This module turns a stream of [`Request`]s into one [`FetchResult`] per
//! request while keeping at most `per_host_limit` fetches in flight against
//! any single host.
//!
//! # Components
//!
//! - [`HostAdmission`] - per-host pending FIFOs and in-flight counts
//! - [`DedupTable`] - first-claim-wins URL ownership
//! - [`SchedulerState`] - the run-scoped state shared by loop and workers
//! - [`Scheduler`] - the ingest/admit/dispatch loop
//! - [`ResultAggregator`] / [`RunReport`] - completion detection and results
//!
//! # Guarantees
//!
//! - Exactly one result per submitted request, duplicates included
//! - A URL seen more than once is fetched once; later requests reuse it
//! - A failed fetch never blocks or aborts other requests
//! - The run ends once input is closed, every host has drained, and every
//!   result has been collected

mod aggregator;
mod dedup;
mod engine;
mod host;
mod item;
mod state;
mod worker;

pub use aggregator::{ResultAggregator, RunReport};
pub use dedup::{Claim, DedupTable, DuplicateClaim, DuplicatePolicy, OwnerTicket};
pub use engine::{
    DEFAULT_PER_HOST_LIMIT, DEFAULT_POLL_INTERVAL, Scheduler, SchedulerConfig, SchedulerError,
};
pub use host::{DEFAULT_HOST_KEY, HostAdmission, host_key};
pub use item::{FetchOutcome, FetchResult, Request, output_file_name, output_path};
pub use state::SchedulerState;
