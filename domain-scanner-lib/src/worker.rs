//! Per-domain guarded check and the worker loop.
//!
//! Every dequeued name is checked in its own tokio task so that the worker
//! can race the check against the deadline. A check that loses the race is
//! cancelled and aborted; the worker records a timeout and moves on.

use crate::capabilities::{AvailabilityChecker, SignatureChecker, StatusReporter};
use crate::error::ScanError;
use crate::types::{DomainResult, STATUS_CHECK_TIMEOUT};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Everything a worker needs besides its channels. Shared by all workers.
pub(crate) struct WorkerContext {
    pub checker: Arc<dyn AvailabilityChecker>,
    /// `None` when signature checks are disabled or no checker is installed
    pub signatures: Option<Arc<dyn SignatureChecker>>,
    pub reporter: Arc<dyn StatusReporter>,
    pub timeout: Duration,
    pub delay: Duration,
    /// One permit per running guarded task, abandoned ones included
    pub permits: Arc<Semaphore>,
}

/// Check one domain under the deadline and build its result record.
///
/// Never fails: lookup errors, timeouts and panics inside the capability or
/// the reporter all end up in the returned record.
pub(crate) async fn check_domain_guarded(ctx: &WorkerContext, domain: String) -> DomainResult {
    // Waits here while too many abandoned checks are still running
    let permit = match Arc::clone(&ctx.permits).acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            return DomainResult::failed(domain, ScanError::internal("check permits closed"));
        }
    };

    let cancel = CancellationToken::new();
    let task_domain = domain.clone();
    let task_cancel = cancel.clone();
    let checker = Arc::clone(&ctx.checker);
    let signature_checker = ctx.signatures.clone();

    let mut handle = tokio::spawn(async move {
        let _permit = permit;
        run_checks(checker, signature_checker, task_domain, task_cancel).await
    });

    match tokio::time::timeout(ctx.timeout, &mut handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => {
            error!(domain = %domain, error = %join_err, "guarded domain check did not finish");
            DomainResult::failed(domain, join_err.into())
        }
        Err(_) => {
            cancel.cancel();
            handle.abort();
            warn!(domain = %domain, timeout = ?ctx.timeout, "domain check timed out");

            report_status(ctx.reporter.as_ref(), &domain, STATUS_CHECK_TIMEOUT);
            DomainResult::timed_out(domain, ctx.timeout)
        }
    }
}

/// Notify the reporter without letting an error or a panic escape.
fn report_status(reporter: &dyn StatusReporter, domain: &str, status: &str) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        reporter.report_special_status(domain, status)
    }));

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            warn!(domain, status, error = %err, "failed to report special status");
        }
        Err(_) => {
            warn!(domain, status, "status reporter panicked");
        }
    }
}

/// Body of the guarded task: availability first, then signatures for
/// domains that are not available (lookup failures included).
async fn run_checks(
    checker: Arc<dyn AvailabilityChecker>,
    signature_checker: Option<Arc<dyn SignatureChecker>>,
    domain: String,
    cancel: CancellationToken,
) -> DomainResult {
    let (available, lookup_error) = match checker.check_availability(&domain, cancel.clone()).await
    {
        Ok(available) => (available, None),
        Err(err) => {
            debug!(domain = %domain, error = %err, "availability lookup failed");
            (false, Some(err))
        }
    };

    let signatures = match (&signature_checker, available) {
        (Some(signature_checker), false) => {
            match signature_checker.check_signatures(&domain, cancel).await {
                Ok(signatures) => signatures,
                Err(err) => {
                    debug!(domain = %domain, error = %err, "signature check failed, ignoring");
                    Vec::new()
                }
            }
        }
        _ => Vec::new(),
    };

    match lookup_error {
        Some(err) => DomainResult::failed_with_signatures(domain, err, signatures),
        None => {
            debug!(domain = %domain, available, signatures = signatures.len(), "domain checked");
            DomainResult::completed(domain, available, signatures)
        }
    }
}

/// Drain the shared queue until it is closed and empty.
///
/// Returns the number of domains this worker processed. Stops early if the
/// result receiver has been dropped.
pub(crate) async fn run_worker(
    id: usize,
    jobs: Arc<Mutex<mpsc::Receiver<String>>>,
    results: mpsc::Sender<DomainResult>,
    ctx: Arc<WorkerContext>,
) -> usize {
    let mut processed = 0;

    loop {
        // The lock is only held while waiting for the next name
        let next = jobs.lock().await.recv().await;
        let Some(domain) = next else {
            break;
        };

        debug!(worker = id, domain = %domain, "dequeued domain");
        let result = check_domain_guarded(&ctx, domain).await;
        processed += 1;

        if results.send(result).await.is_err() {
            debug!(worker = id, "result receiver dropped, stopping worker");
            break;
        }

        if !ctx.delay.is_zero() {
            tokio::time::sleep(ctx.delay).await;
        }
    }

    debug!(worker = id, processed, "worker finished");
    processed
}
