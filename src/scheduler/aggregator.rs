//! Result collection and completion detection.

use std::time::Duration;

use super::FetchResult;

/// Collects one [`FetchResult`] per submitted request.
///
/// The expected total is only known once ingestion ends, so completion is
/// reported only after [`set_expected`](Self::set_expected) has been called.
/// Draining every host bucket does not by itself complete a run: a worker can
/// release its slot before its result arrives here.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    expected: Option<usize>,
    results: Vec<FetchResult>,
}

impl ResultAggregator {
    /// Creates an aggregator with no expected total yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixes the number of results that completes the run.
    pub fn set_expected(&mut self, total: usize) {
        self.expected = Some(total);
    }

    /// Records a result. Returns true if this completed the run.
    pub fn accept(&mut self, result: FetchResult) -> bool {
        self.results.push(result);
        self.is_done()
    }

    /// True once every submitted request has reported.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.expected
            .is_some_and(|expected| self.results.len() >= expected)
    }

    /// Results accepted so far.
    #[must_use]
    pub fn received(&self) -> usize {
        self.results.len()
    }

    /// Consumes the aggregator into a report.
    #[must_use]
    pub fn into_report(self, elapsed: Duration) -> RunReport {
        RunReport {
            results: self.results,
            elapsed,
        }
    }
}

/// Every result from one run, in completion order.
#[derive(Debug, Clone)]
pub struct RunReport {
    results: Vec<FetchResult>,
    elapsed: Duration,
}

impl RunReport {
    /// Results in the order they completed.
    #[must_use]
    pub fn results(&self) -> &[FetchResult] {
        &self.results
    }

    /// Results ordered by request index.
    #[must_use]
    pub fn sorted_by_idx(&self) -> Vec<&FetchResult> {
        let mut sorted: Vec<&FetchResult> = self.results.iter().collect();
        sorted.sort_by_key(|result| result.idx);
        sorted
    }

    /// The result for request `idx`.
    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&FetchResult> {
        self.results.iter().find(|result| result.idx == idx)
    }

    /// Wall-clock duration of the run.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Total number of results.
    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Results without an error (including successful duplicates).
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    /// Results with an error.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    /// Results that reused another request's fetch.
    #[must_use]
    pub fn duplicates(&self) -> usize {
        self.results.iter().filter(|r| r.is_duplicate()).count()
    }

    /// Requests that performed their own network fetch.
    #[must_use]
    pub fn fetched(&self) -> usize {
        self.results
            .iter()
            .filter(|r| !r.is_duplicate() && !is_worker_panic(r))
            .count()
    }
}

fn is_worker_panic(result: &FetchResult) -> bool {
    matches!(
        result.error.as_deref(),
        Some(crate::fetch::FetchError::WorkerPanicked { .. })
    )
}
