//! Worker pool driver.
//!
//! The driver owns the bounded work queue and the result channel, starts a
//! fixed number of uniform workers, and hands the caller both ends: a
//! [`JobSender`] to feed names in and a [`ScanHandle`] to drain results.
//! The result stream ends once the queue is closed and every worker exited.

use crate::capabilities::{
    AvailabilityChecker, LogStatusReporter, SignatureChecker, StatusReporter,
};
use crate::error::ScanError;
use crate::types::{DomainResult, ScanConfig, ScanSummary};
use crate::worker::{run_worker, WorkerContext};
use futures::stream::{self, Stream};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info};

/// Bounded pool of workers checking domains against injected capabilities.
///
/// # Example
///
/// ```rust,no_run
/// use async_trait::async_trait;
/// use domain_scanner_lib::{AvailabilityChecker, ScanConfig, ScanError, WorkerPool};
/// use std::sync::Arc;
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// struct AlwaysFree;
///
/// #[async_trait]
/// impl AvailabilityChecker for AlwaysFree {
///     async fn check_availability(
///         &self,
///         _domain: &str,
///         _cancel: CancellationToken,
///     ) -> Result<bool, ScanError> {
///         Ok(true)
///     }
/// }
///
/// #[tokio::main]
/// async fn main() -> Result<(), ScanError> {
///     let config = ScanConfig::default()
///         .with_workers(4)
///         .with_delay(Duration::from_millis(200));
///     let pool = WorkerPool::new(config, Arc::new(AlwaysFree))?;
///
///     let mut scan = pool.run(vec!["abc.com".to_string(), "xyz.com".to_string()]);
///     while let Some(result) = scan.recv().await {
///         println!("{}: {}", result.domain, result.available);
///     }
///     Ok(())
/// }
/// ```
pub struct WorkerPool {
    config: ScanConfig,
    checker: Arc<dyn AvailabilityChecker>,
    signature_checker: Option<Arc<dyn SignatureChecker>>,
    reporter: Arc<dyn StatusReporter>,
}

impl WorkerPool {
    /// Create a pool from a configuration and the availability capability.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::ConfigError` if the configuration is invalid.
    pub fn new(
        config: ScanConfig,
        checker: Arc<dyn AvailabilityChecker>,
    ) -> Result<Self, ScanError> {
        config.validate()?;
        Ok(Self {
            config,
            checker,
            signature_checker: None,
            reporter: Arc::new(LogStatusReporter),
        })
    }

    /// Install the secondary signature capability.
    ///
    /// It is only called when `include_signatures` is set in the config.
    pub fn with_signature_checker(mut self, checker: Arc<dyn SignatureChecker>) -> Self {
        self.signature_checker = Some(checker);
        self
    }

    /// Replace the default tracing-based status reporter.
    pub fn with_status_reporter(mut self, reporter: Arc<dyn StatusReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Get the configuration for this pool.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Start the workers and return both ends of the pool.
    ///
    /// Must be called from within a tokio runtime. Does not block: the
    /// workers run in the background until every [`JobSender`] clone is
    /// closed or dropped and the queue is drained.
    pub fn spawn(&self) -> (JobSender, ScanHandle) {
        let capacity = self.config.effective_queue_capacity();
        let (job_tx, job_rx) = mpsc::channel::<String>(capacity);
        let (result_tx, result_rx) = mpsc::channel::<DomainResult>(capacity);

        let signatures = if self.config.include_signatures {
            self.signature_checker.clone()
        } else {
            None
        };
        let ctx = Arc::new(WorkerContext {
            checker: Arc::clone(&self.checker),
            signatures,
            reporter: Arc::clone(&self.reporter),
            timeout: self.config.timeout,
            delay: self.config.delay,
            // Room for every worker's current check plus one abandoned check each
            permits: Arc::new(Semaphore::new(self.config.workers.saturating_mul(2))),
        });

        let jobs = Arc::new(Mutex::new(job_rx));
        let mut workers = JoinSet::new();
        for id in 0..self.config.workers {
            workers.spawn(run_worker(
                id,
                Arc::clone(&jobs),
                result_tx.clone(),
                Arc::clone(&ctx),
            ));
        }
        // Only the workers hold result senders, so the channel closes with them
        drop(result_tx);

        info!(
            workers = self.config.workers,
            timeout = ?self.config.timeout,
            delay = ?self.config.delay,
            signatures = ctx.signatures.is_some(),
            "worker pool started"
        );

        tokio::spawn(async move {
            let mut processed = 0;
            while let Some(joined) = workers.join_next().await {
                match joined {
                    Ok(count) => processed += count,
                    Err(err) => error!(error = %err, "worker task failed"),
                }
            }
            info!(processed, "all workers finished");
        });

        (JobSender { tx: job_tx }, ScanHandle { results: result_rx })
    }

    /// Start the workers and feed them every name from `domains`, in order.
    ///
    /// The queue is closed once the source is exhausted, so the returned
    /// handle yields exactly one result per name and then ends.
    pub fn run<I>(&self, domains: I) -> ScanHandle
    where
        I: IntoIterator<Item = String> + Send + 'static,
        I::IntoIter: Send + 'static,
    {
        let (jobs, handle) = self.spawn();
        tokio::spawn(async move {
            let mut submitted = 0usize;
            for domain in domains {
                if let Err(err) = jobs.submit(domain).await {
                    error!(
                        error = %err,
                        submitted,
                        "work queue closed before the source was exhausted"
                    );
                    break;
                }
                submitted += 1;
            }
            info!(submitted, "all domains dispatched");
            jobs.close();
        });
        handle
    }
}

/// Producer side of the work queue. Clone it to feed a pool from several tasks.
#[derive(Clone)]
pub struct JobSender {
    tx: mpsc::Sender<String>,
}

impl JobSender {
    /// Queue a domain, waiting for capacity if the queue is full.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::QueueClosed` if every worker has already exited.
    pub async fn submit(&self, domain: impl Into<String>) -> Result<(), ScanError> {
        self.tx
            .send(domain.into())
            .await
            .map_err(|mpsc::error::SendError(domain)| ScanError::QueueClosed { domain })
    }

    /// Close this producer. The queue closes when the last clone is closed.
    pub fn close(self) {
        drop(self);
    }
}

/// Consumer side of a running scan.
pub struct ScanHandle {
    results: mpsc::Receiver<DomainResult>,
}

impl ScanHandle {
    /// Next result in completion order.
    ///
    /// `None` means the scan is complete: the queue was closed and drained
    /// and every worker has exited.
    pub async fn recv(&mut self) -> Option<DomainResult> {
        self.results.recv().await
    }

    /// Wait for the scan to finish and return every result.
    pub async fn collect(mut self) -> Vec<DomainResult> {
        let mut results = Vec::new();
        while let Some(result) = self.results.recv().await {
            results.push(result);
        }
        results
    }

    /// Wait for the scan to finish, keeping only the counters.
    pub async fn summarize(mut self) -> ScanSummary {
        let mut summary = ScanSummary::default();
        while let Some(result) = self.results.recv().await {
            summary.record(&result);
        }
        summary
    }

    /// Turn the handle into a stream of results.
    pub fn into_stream(self) -> Pin<Box<dyn Stream<Item = DomainResult> + Send>> {
        Box::pin(stream::unfold(self.results, |mut results| async move {
            results.recv().await.map(|result| (result, results))
        }))
    }
}
