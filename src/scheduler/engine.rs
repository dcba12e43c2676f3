//! The scheduler loop: ingest requests, admit per host, dispatch workers,
//! collect results.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use hostfetch_core::fetch::{FetchClientOptions, HttpFetcher};
//! use hostfetch_core::scheduler::{Request, Scheduler, SchedulerConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = Arc::new(HttpFetcher::new(FetchClientOptions::default())?);
//! let scheduler = Scheduler::new(SchedulerConfig::default(), fetcher)?;
//! let report = scheduler
//!     .run_requests(vec![
//!         Request::new(0, "http://a.com/1"),
//!         Request::new(1, "http://b.com/1"),
//!         Request::new(2, "http://a.com/1"),
//!     ])
//!     .await?;
//! println!("{} ok, {} failed", report.succeeded(), report.failed());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{Semaphore, mpsc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, trace, warn};

use super::aggregator::{ResultAggregator, RunReport};
use super::dedup::DuplicatePolicy;
use super::item::{FetchResult, Request};
use super::state::SchedulerState;
use super::worker::{WorkerContext, run_worker};
use crate::fetch::Fetcher;

/// Minimum allowed per-host concurrency.
const MIN_PER_HOST_LIMIT: usize = 1;

/// Maximum allowed per-host concurrency.
const MAX_PER_HOST_LIMIT: usize = 100;

/// Default per-host concurrency ceiling.
pub const DEFAULT_PER_HOST_LIMIT: usize = 3;

/// Default interval between admission passes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Shortest accepted poll interval.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Capacity of the request channel used by [`Scheduler::run_requests`].
const REQUEST_CHANNEL_CAPACITY: usize = 1024;

/// Error type for scheduler setup and run failures.
///
/// Individual fetch failures are never reported here; they are carried in
/// each request's [`FetchResult`].
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Invalid per-host limit.
    #[error(
        "invalid per-host limit {value}: must be between {MIN_PER_HOST_LIMIT} and {MAX_PER_HOST_LIMIT}"
    )]
    InvalidPerHostLimit {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Poll interval too short.
    #[error("invalid poll interval {value:?}: must be at least {MIN_POLL_INTERVAL:?}")]
    InvalidPollInterval {
        /// The invalid value that was provided.
        value: Duration,
    },

    /// Global in-flight cap of zero.
    #[error("invalid global in-flight limit 0: must be at least 1")]
    InvalidGlobalLimit,

    /// The output directory could not be created.
    #[error("cannot create output directory {path}: {source}")]
    OutputDir {
        /// The directory that failed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Workers exited without reporting every result.
    #[error("run ended with {received} of {expected} results")]
    ResultsLost {
        /// Number of requests submitted.
        expected: usize,
        /// Number of results collected.
        received: usize,
    },
}

/// Scheduler settings.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum fetches in flight per host (1-100).
    pub per_host_limit: usize,
    /// Interval between admission passes when nothing else wakes the loop.
    pub poll_interval: Duration,
    /// Re-run admission as soon as any fetch releases its slot.
    pub wake_on_release: bool,
    /// How duplicate URLs obtain their result.
    pub duplicate_policy: DuplicatePolicy,
    /// Directory that receives `url_<idx>.html` files.
    pub output_dir: PathBuf,
    /// Optional deadline for each network fetch.
    pub fetch_timeout: Option<Duration>,
    /// Optional cap on concurrent network fetches across all hosts.
    pub max_total_in_flight: Option<usize>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            per_host_limit: DEFAULT_PER_HOST_LIMIT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            wake_on_release: true,
            duplicate_policy: DuplicatePolicy::default(),
            output_dir: PathBuf::from("."),
            fetch_timeout: None,
            max_total_in_flight: None,
        }
    }
}

impl SchedulerConfig {
    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns the first [`SchedulerError`] found.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if !(MIN_PER_HOST_LIMIT..=MAX_PER_HOST_LIMIT).contains(&self.per_host_limit) {
            return Err(SchedulerError::InvalidPerHostLimit {
                value: self.per_host_limit,
            });
        }
        if self.poll_interval < MIN_POLL_INTERVAL {
            return Err(SchedulerError::InvalidPollInterval {
                value: self.poll_interval,
            });
        }
        if self.max_total_in_flight == Some(0) {
            return Err(SchedulerError::InvalidGlobalLimit);
        }
        Ok(())
    }
}

/// Host-aware fetch scheduler.
///
/// # Concurrency Model
///
/// - One control loop ingests requests and runs admission passes
/// - Each admitted request runs in its own Tokio task
/// - A host never has more than `per_host_limit` requests in flight
/// - Distinct hosts proceed in parallel; there is no global cap unless
///   `max_total_in_flight` is set
///
/// # Admission
///
/// Each pass snapshots the live hosts, admits what each one has room for, and
/// claims the admitted URLs in the dedup table. Passes run after every batch
/// of ingested requests, on every poll tick, and (with `wake_on_release`)
/// whenever a worker frees a slot.
pub struct Scheduler {
    config: SchedulerConfig,
    fetcher: Arc<dyn Fetcher>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Creates a scheduler.
    ///
    /// # Errors
    ///
    /// Returns a [`SchedulerError`] if the configuration is out of range.
    #[instrument(level = "debug", skip(fetcher))]
    pub fn new(config: SchedulerConfig, fetcher: Arc<dyn Fetcher>) -> Result<Self, SchedulerError> {
        config.validate()?;
        debug!(
            per_host_limit = config.per_host_limit,
            poll_interval_ms = config.poll_interval.as_millis(),
            wake_on_release = config.wake_on_release,
            duplicate_policy = config.duplicate_policy.as_str(),
            "creating scheduler"
        );
        Ok(Self { config, fetcher })
    }

    /// Runs a fixed batch of requests to completion.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub async fn run_requests(&self, requests: Vec<Request>) -> Result<RunReport, SchedulerError> {
        let (tx, rx) = mpsc::channel(REQUEST_CHANNEL_CAPACITY);
        let feeder = tokio::spawn(async move {
            for request in requests {
                if tx.send(request).await.is_err() {
                    break;
                }
            }
        });
        let report = self.run(rx).await;
        feeder.abort();
        report
    }

    /// Consumes `requests` until the channel closes and returns once every
    /// received request has produced a result.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::OutputDir`] if the output directory cannot
    /// be created (nothing has been fetched at that point), or
    /// [`SchedulerError::ResultsLost`] if workers vanished without reporting.
    ///
    /// Failed fetches do NOT cause this method to error.
    #[instrument(skip_all, fields(per_host_limit = self.config.per_host_limit, output_dir = %self.config.output_dir.display()))]
    pub async fn run(&self, mut requests: mpsc::Receiver<Request>) -> Result<RunReport, SchedulerError> {
        let started = Instant::now();
        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .map_err(|source| SchedulerError::OutputDir {
                path: self.config.output_dir.clone(),
                source,
            })?;

        let state = Arc::new(SchedulerState::new(
            self.config.per_host_limit,
            self.config.wake_on_release,
        ));
        let (results_tx, mut results_rx) = mpsc::unbounded_channel::<FetchResult>();
        let ctx = Arc::new(WorkerContext {
            state: Arc::clone(&state),
            fetcher: Arc::clone(&self.fetcher),
            output_dir: self.config.output_dir.clone(),
            duplicate_policy: self.config.duplicate_policy,
            fetch_timeout: self.config.fetch_timeout,
            global_limit: self
                .config
                .max_total_in_flight
                .map(|limit| Arc::new(Semaphore::new(limit))),
            results: results_tx,
        });

        let mut aggregator = ResultAggregator::new();
        let mut submitted = 0usize;
        let mut input_open = true;
        let mut poll = tokio::time::interval(self.config.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("starting scheduler");

        loop {
            let spawned = admission_pass(&state, &ctx);
            if spawned > 0 {
                trace!(spawned, "admission pass");
            }

            if !input_open && state.is_drained() {
                break;
            }

            tokio::select! {
                received = requests.recv(), if input_open => {
                    match received {
                        Some(request) => {
                            submitted += 1;
                            state.enqueue(request);
                            // Batch whatever else is already queued before the next pass.
                            loop {
                                match requests.try_recv() {
                                    Ok(request) => {
                                        submitted += 1;
                                        state.enqueue(request);
                                    }
                                    Err(TryRecvError::Empty) => break,
                                    Err(TryRecvError::Disconnected) => {
                                        input_open = false;
                                        break;
                                    }
                                }
                            }
                        }
                        None => input_open = false,
                    }
                    if !input_open {
                        aggregator.set_expected(submitted);
                        info!(submitted, "request stream closed");
                    }
                }
                Some(result) = results_rx.recv() => {
                    aggregator.accept(result);
                }
                () = state.released(), if self.config.wake_on_release => {}
                _ = poll.tick() => {}
            }
        }

        debug!(
            received = aggregator.received(),
            submitted, "all hosts drained, collecting remaining results"
        );

        // Workers hold the only other senders; once they finish, recv() ends.
        drop(ctx);
        while !aggregator.is_done() {
            let Some(result) = results_rx.recv().await else {
                warn!(
                    expected = submitted,
                    received = aggregator.received(),
                    "result channel closed early"
                );
                return Err(SchedulerError::ResultsLost {
                    expected: submitted,
                    received: aggregator.received(),
                });
            };
            aggregator.accept(result);
        }

        let report = aggregator.into_report(started.elapsed());
        info!(
            total = report.total(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            duplicates = report.duplicates(),
            urls = state.claimed_urls(),
            elapsed_ms = report.elapsed().as_millis(),
            "scheduler run complete"
        );
        Ok(report)
    }
}

/// Admits what every live host has room for and spawns a worker per request.
///
/// Host keys are snapshotted first so buckets may be created or removed by
/// workers while the pass runs.
fn admission_pass(state: &Arc<SchedulerState>, ctx: &Arc<WorkerContext>) -> usize {
    let mut spawned = 0;
    for host in state.host_snapshot() {
        let admitted = state.admit(&host);
        if admitted.is_empty() {
            continue;
        }
        debug!(host = %host, admitted = admitted.len(), in_flight = state.in_flight(&host), "admitting requests");
        for request in admitted {
            let claim = state.claim(&request.url, request.idx);
            tokio::spawn(run_worker(Arc::clone(ctx), host.clone(), request, claim));
            spawned += 1;
        }
    }
    spawned
}
