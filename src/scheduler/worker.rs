//! Fetch worker: resolves one admitted request end-to-end.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, info, instrument, warn};

use super::dedup::{Claim, DuplicateClaim, DuplicatePolicy};
use super::item::{FetchOutcome, FetchResult, Request, output_path};
use super::state::SchedulerState;
use crate::fetch::{FetchError, Fetcher};

/// Shared, read-only inputs for every worker in a run.
pub(crate) struct WorkerContext {
    pub(crate) state: Arc<SchedulerState>,
    pub(crate) fetcher: Arc<dyn Fetcher>,
    pub(crate) output_dir: PathBuf,
    pub(crate) duplicate_policy: DuplicatePolicy,
    pub(crate) fetch_timeout: Option<Duration>,
    pub(crate) global_limit: Option<Arc<Semaphore>>,
    pub(crate) results: mpsc::UnboundedSender<FetchResult>,
}

/// Releases the host slot when dropped, so capacity comes back even if the
/// worker unwinds.
struct HostSlot {
    state: Arc<SchedulerState>,
    host: String,
}

impl Drop for HostSlot {
    fn drop(&mut self) {
        self.state.release(&self.host);
    }
}

/// Runs one admitted request: fetch or resolve as a duplicate, release the
/// host slot, then emit exactly one result.
#[instrument(skip_all, fields(idx = request.idx, url = %request.url, host = %host))]
pub(crate) async fn run_worker(
    ctx: Arc<WorkerContext>,
    host: String,
    request: Request,
    claim: Claim,
) {
    let slot = HostSlot {
        state: Arc::clone(&ctx.state),
        host,
    };
    let idx = request.idx;
    let url = request.url.clone();

    // The slot moves into `resolve`; an unwind drops it with the future.
    let result = match AssertUnwindSafe(resolve(&ctx, request, claim, slot))
        .catch_unwind()
        .await
    {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(error = %message, "fetch worker panicked");
            let error = FetchError::worker_panicked(url.clone(), message);
            FetchResult::failed(idx, url, error)
        }
    };

    if ctx.results.send(result).is_err() {
        warn!("result receiver dropped before worker finished");
    }
}

async fn resolve(ctx: &WorkerContext, request: Request, claim: Claim, slot: HostSlot) -> FetchResult {
    match claim {
        Claim::Owner(ticket) => {
            let result = fetch_and_persist(ctx, request).await;
            ticket.publish(FetchOutcome::from(&result));
            drop(slot);
            result
        }
        Claim::Duplicate(dup) => {
            // Duplicates never touch the network, so they give the slot back
            // before waiting on the owner.
            drop(slot);
            resolve_duplicate(ctx, request, dup).await
        }
    }
}

async fn fetch_and_persist(ctx: &WorkerContext, request: Request) -> FetchResult {
    let Request { idx, url } = request;

    // Closed semaphores are never produced here; fall through without a permit.
    let _permit = match &ctx.global_limit {
        Some(limit) => Arc::clone(limit).acquire_owned().await.ok(),
        None => None,
    };

    let fetched = match ctx.fetch_timeout {
        Some(deadline) => tokio::time::timeout(deadline, ctx.fetcher.fetch(&url))
            .await
            .unwrap_or_else(|_| Err(FetchError::timeout(&url))),
        None => ctx.fetcher.fetch(&url).await,
    };

    let body = match fetched {
        Ok(body) => body,
        Err(error) => {
            warn!(error = %error, "fetch failed");
            return FetchResult::failed(idx, url, error);
        }
    };

    let path = output_path(&ctx.output_dir, idx);
    match tokio::fs::write(&path, &body).await {
        Ok(()) => {
            info!(path = %path.display(), bytes = body.len(), "fetched");
            FetchResult::fetched(idx, url, Some(path))
        }
        Err(error) => {
            warn!(
                path = %path.display(),
                error = %error,
                "fetch succeeded but output file could not be written"
            );
            FetchResult::fetched(idx, url, None)
        }
    }
}

async fn resolve_duplicate(ctx: &WorkerContext, request: Request, dup: DuplicateClaim) -> FetchResult {
    let Request { idx, url } = request;
    let owner_idx = dup.owner_idx();

    let outcome = match ctx.duplicate_policy {
        DuplicatePolicy::Eager => FetchOutcome {
            output_file: Some(output_path(&ctx.output_dir, owner_idx)),
            error: None,
        },
        DuplicatePolicy::AwaitOwner => {
            debug!(owner_idx, "waiting for owner");
            dup.wait().await.unwrap_or_else(|| FetchOutcome {
                output_file: None,
                error: Some(Arc::new(FetchError::owner_abandoned(url.clone(), owner_idx))),
            })
        }
    };

    debug!(owner_idx, "resolved duplicate");
    FetchResult::duplicate(idx, url, owner_idx, outcome)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;

    struct StaticFetcher(Result<&'static [u8], u16>);

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            match self.0 {
                Ok(body) => Ok(body.to_vec()),
                Err(status) => Err(FetchError::http_status(url, status)),
            }
        }
    }

    struct PanickingFetcher;

    #[async_trait]
    impl Fetcher for PanickingFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
            panic!("fetcher exploded");
        }
    }

    fn context(
        fetcher: Arc<dyn Fetcher>,
        dir: &TempDir,
        policy: DuplicatePolicy,
    ) -> (Arc<WorkerContext>, mpsc::UnboundedReceiver<FetchResult>) {
        let (results, rx) = mpsc::unbounded_channel();
        let ctx = Arc::new(WorkerContext {
            state: Arc::new(SchedulerState::new(3, true)),
            fetcher,
            output_dir: dir.path().to_path_buf(),
            duplicate_policy: policy,
            fetch_timeout: None,
            global_limit: None,
            results,
        });
        (ctx, rx)
    }

    fn admit_one(ctx: &WorkerContext, request: Request) -> (String, Request, Claim) {
        let host = ctx.state.enqueue(request);
        let admitted = ctx.state.admit(&host).pop().unwrap();
        let claim = ctx.state.claim(&admitted.url, admitted.idx);
        (host, admitted, claim)
    }

    #[tokio::test]
    async fn test_owner_writes_indexed_file_and_releases() {
        let dir = TempDir::new().unwrap();
        let (ctx, mut rx) = context(Arc::new(StaticFetcher(Ok(b"hello".as_slice()))), &dir, DuplicatePolicy::AwaitOwner);

        let (host, request, claim) = admit_one(&ctx, Request::new(4, "http://a.com/x"));
        run_worker(Arc::clone(&ctx), host.clone(), request, claim).await;

        let result = rx.recv().await.unwrap();
        assert!(result.is_success());
        let path = result.output_file.unwrap();
        assert!(path.ends_with("url_4.html"));
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
        assert_eq!(ctx.state.in_flight(&host), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_recorded_and_slot_released() {
        let dir = TempDir::new().unwrap();
        let (ctx, mut rx) = context(Arc::new(StaticFetcher(Err(503))), &dir, DuplicatePolicy::AwaitOwner);

        let (host, request, claim) = admit_one(&ctx, Request::new(0, "http://a.com/down"));
        run_worker(Arc::clone(&ctx), host.clone(), request, claim).await;

        let result = rx.recv().await.unwrap();
        assert!(!result.is_success());
        assert!(result.output_file.is_none());
        assert!(!dir.path().join("url_0.html").exists());
        assert!(ctx.state.is_drained());
    }

    #[tokio::test]
    async fn test_unwritable_output_still_reports_success() {
        let dir = TempDir::new().unwrap();
        let (results, mut rx) = mpsc::unbounded_channel();
        let ctx = Arc::new(WorkerContext {
            state: Arc::new(SchedulerState::new(3, true)),
            fetcher: Arc::new(StaticFetcher(Ok(b"body".as_slice()))),
            output_dir: dir.path().join("missing-subdir"),
            duplicate_policy: DuplicatePolicy::AwaitOwner,
            fetch_timeout: None,
            global_limit: None,
            results,
        });

        let (host, request, claim) = admit_one(&ctx, Request::new(1, "http://a.com/"));
        run_worker(ctx, host, request, claim).await;

        let result = rx.recv().await.unwrap();
        assert!(result.is_success());
        assert!(result.output_file.is_none());
    }

    #[tokio::test]
    async fn test_eager_duplicate_reports_owner_path_without_waiting() {
        let dir = TempDir::new().unwrap();
        let (ctx, mut rx) = context(Arc::new(StaticFetcher(Ok(b"x".as_slice()))), &dir, DuplicatePolicy::Eager);

        let _owner = ctx.state.claim("http://a.com/1", 0);
        let host = ctx.state.enqueue(Request::new(2, "http://a.com/1"));
        let request = ctx.state.admit(&host).pop().unwrap();
        let claim = ctx.state.claim(&request.url, request.idx);
        run_worker(Arc::clone(&ctx), host, request, claim).await;

        let result = rx.recv().await.unwrap();
        assert_eq!(result.duplicate_of, Some(0));
        assert_eq!(result.output_file, Some(dir.path().join("url_0.html")));
    }

    #[tokio::test]
    async fn test_waiting_duplicate_gives_back_host_slot() {
        let dir = TempDir::new().unwrap();
        let (ctx, mut rx) = context(Arc::new(StaticFetcher(Ok(b"x".as_slice()))), &dir, DuplicatePolicy::AwaitOwner);

        let Claim::Owner(ticket) = ctx.state.claim("http://a.com/1", 0) else {
            panic!("expected owner");
        };
        let (host, request, claim) = admit_one(&ctx, Request::new(1, "http://a.com/1"));
        assert_eq!(ctx.state.in_flight(&host), 1);
        let waiter = tokio::spawn(run_worker(Arc::clone(&ctx), host.clone(), request, claim));

        tokio::time::timeout(Duration::from_secs(2), async {
            while ctx.state.in_flight(&host) != 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert!(rx.try_recv().is_err(), "duplicate must still be waiting");

        let owner_path = dir.path().join("url_0.html");
        ticket.publish(FetchOutcome {
            output_file: Some(owner_path.clone()),
            error: None,
        });
        waiter.await.unwrap();
        let result = rx.recv().await.unwrap();
        assert_eq!(result.duplicate_of, Some(0));
        assert_eq!(result.output_file, Some(owner_path));
    }

    #[tokio::test]
    async fn test_panicking_owner_yields_failed_result_and_abandons_duplicates() {
        let dir = TempDir::new().unwrap();
        let (ctx, mut rx) = context(Arc::new(PanickingFetcher), &dir, DuplicatePolicy::AwaitOwner);

        let (host, owner_request, owner_claim) = admit_one(&ctx, Request::new(0, "http://a.com/p"));
        let dup_claim = ctx.state.claim("http://a.com/p", 1);

        run_worker(Arc::clone(&ctx), host, owner_request, owner_claim).await;
        let owner_result = rx.recv().await.unwrap();
        assert!(matches!(
            owner_result.error.as_deref(),
            Some(FetchError::WorkerPanicked { .. })
        ));

        let Claim::Duplicate(dup) = dup_claim else {
            panic!("expected duplicate");
        };
        let outcome = dup.wait().await.unwrap();
        assert!(matches!(
            outcome.error.as_deref(),
            Some(FetchError::OwnerAbandoned { owner_idx: 0, .. })
        ));
    }

    #[test]
    fn test_panic_message_extracts_strings() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(boxed.as_ref()), "non-string panic payload");
    }
}
