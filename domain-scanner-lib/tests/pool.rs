// domain-scanner-lib/tests/pool.rs

//! Integration tests for the worker pool driver.

use async_trait::async_trait;
use domain_scanner_lib::{
    AvailabilityChecker, CollectingStatusReporter, DomainResult, ScanConfig, ScanError,
    SignatureChecker, StatusReporter, WorkerPool, STATUS_CHECK_TIMEOUT,
};
use futures::StreamExt;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Behaviour is picked from the domain name:
/// `free*` available, `taken*` unavailable, `hang*` never completes,
/// anything else fails.
#[derive(Default)]
struct ScriptedChecker {
    calls: AtomicUsize,
}

#[async_trait]
impl AvailabilityChecker for ScriptedChecker {
    async fn check_availability(
        &self,
        domain: &str,
        _cancel: CancellationToken,
    ) -> Result<bool, ScanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if domain.starts_with("free") {
            Ok(true)
        } else if domain.starts_with("taken") {
            Ok(false)
        } else if domain.starts_with("hang") {
            std::future::pending::<()>().await;
            Ok(true)
        } else {
            Err(ScanError::lookup(domain, "registry unreachable"))
        }
    }
}

#[derive(Default)]
struct MockSignatures {
    calls: AtomicUsize,
}

#[async_trait]
impl SignatureChecker for MockSignatures {
    async fn check_signatures(
        &self,
        _domain: &str,
        _cancel: CancellationToken,
    ) -> Result<Vec<String>, ScanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec!["sig1".to_string(), "sig2".to_string()])
    }
}

#[derive(Default)]
struct FailingReporter {
    calls: AtomicUsize,
}

impl StatusReporter for FailingReporter {
    fn report_special_status(&self, _domain: &str, _status: &str) -> Result<(), ScanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ScanError::reporter("disk full"))
    }
}

#[derive(Default)]
struct PanickingReporter {
    calls: AtomicUsize,
}

impl StatusReporter for PanickingReporter {
    fn report_special_status(&self, domain: &str, _status: &str) -> Result<(), ScanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        panic!("reporter blew up on {}", domain);
    }
}

/// Signature lookup that never returns.
struct StuckSignatures;

#[async_trait]
impl SignatureChecker for StuckSignatures {
    async fn check_signatures(
        &self,
        _domain: &str,
        _cancel: CancellationToken,
    ) -> Result<Vec<String>, ScanError> {
        std::future::pending::<()>().await;
        Ok(Vec::new())
    }
}

fn names(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{}-{}.com", prefix, i)).collect()
}

fn find<'a>(results: &'a [DomainResult], domain: &str) -> &'a DomainResult {
    results
        .iter()
        .find(|result| result.domain == domain)
        .unwrap_or_else(|| panic!("no result for {}", domain))
}

#[tokio::test(start_paused = true)]
async fn test_every_domain_yields_exactly_one_result() {
    init_tracing();

    for workers in [1, 3, 8, 50] {
        let checker = Arc::new(ScriptedChecker::default());
        let config = ScanConfig::default().with_workers(workers);
        let pool = WorkerPool::new(config, checker.clone()).unwrap();

        let mut input = names("free", 40);
        input.extend(names("taken", 30));
        input.extend(names("broken", 30));

        let results = pool.run(input.clone()).collect().await;
        assert_eq!(results.len(), 100, "workers = {}", workers);

        let unique: HashSet<&str> = results.iter().map(|r| r.domain.as_str()).collect();
        let expected: HashSet<&str> = input.iter().map(String::as_str).collect();
        assert_eq!(unique, expected, "workers = {}", workers);
        assert_eq!(checker.calls.load(Ordering::SeqCst), 100);
    }
}

#[tokio::test(start_paused = true)]
async fn test_available_domain_result() {
    let pool = WorkerPool::new(ScanConfig::default(), Arc::new(ScriptedChecker::default()))
        .unwrap()
        .with_signature_checker(Arc::new(MockSignatures::default()));

    let results = pool.run(vec!["free.com".to_string()]).collect().await;
    assert_eq!(results.len(), 1);

    let result = &results[0];
    assert_eq!(result.domain, "free.com");
    assert!(result.available);
    assert!(result.error.is_none());
    assert!(result.signatures.is_empty());
    assert_eq!(result.special_status, "");
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_domain_gets_signatures_when_enabled() {
    let signatures = Arc::new(MockSignatures::default());
    let config = ScanConfig::default().with_signatures(true);
    let pool = WorkerPool::new(config, Arc::new(ScriptedChecker::default()))
        .unwrap()
        .with_signature_checker(signatures.clone());

    let results = pool
        .run(vec!["taken.com".to_string(), "free.com".to_string()])
        .collect()
        .await;

    let taken = find(&results, "taken.com");
    assert!(!taken.available);
    assert_eq!(taken.signatures, vec!["sig1", "sig2"]);
    assert!(find(&results, "free.com").signatures.is_empty());
    assert_eq!(signatures.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_signatures_skipped_when_disabled() {
    let signatures = Arc::new(MockSignatures::default());
    let pool = WorkerPool::new(ScanConfig::default(), Arc::new(ScriptedChecker::default()))
        .unwrap()
        .with_signature_checker(signatures.clone());

    let results = pool.run(names("taken", 5)).collect().await;
    assert_eq!(results.len(), 5);
    assert!(results.iter().all(|r| r.signatures.is_empty()));
    assert_eq!(signatures.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_check_times_out_and_reports_once() {
    init_tracing();

    let reporter = Arc::new(CollectingStatusReporter::new());
    let config = ScanConfig::default()
        .with_workers(2)
        .with_signatures(true);
    let pool = WorkerPool::new(config, Arc::new(ScriptedChecker::default()))
        .unwrap()
        .with_signature_checker(Arc::new(MockSignatures::default()))
        .with_status_reporter(reporter.clone());

    let start = Instant::now();
    let results = pool
        .run(vec!["hang.com".to_string(), "free.com".to_string()])
        .collect()
        .await;

    let hung = find(&results, "hang.com");
    assert!(!hung.available);
    assert!(hung.error.as_ref().is_some_and(ScanError::is_timeout));
    assert_eq!(hung.special_status, STATUS_CHECK_TIMEOUT);
    assert!(hung.signatures.is_empty());

    assert_eq!(reporter.count_for("hang.com"), 1);
    assert_eq!(reporter.len(), 1);

    // The healthy domain is never held up by the hanging one
    assert!(find(&results, "free.com").available);
    assert!(start.elapsed() >= Duration::from_secs(45));
    assert!(start.elapsed() < Duration::from_secs(46));
}

#[tokio::test(start_paused = true)]
async fn test_configured_timeout_is_honoured() {
    let config = ScanConfig::default().with_timeout(Duration::from_millis(300));
    let pool = WorkerPool::new(config, Arc::new(ScriptedChecker::default())).unwrap();

    let start = Instant::now();
    let results = pool.run(vec!["hang.com".to_string()]).collect().await;

    assert!(results[0].is_timeout());
    assert!(start.elapsed() >= Duration::from_millis(300));
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_reporter_failure_does_not_change_result() {
    let reporter = Arc::new(FailingReporter::default());
    let config = ScanConfig::default().with_timeout(Duration::from_secs(1));
    let pool = WorkerPool::new(config, Arc::new(ScriptedChecker::default()))
        .unwrap()
        .with_status_reporter(reporter.clone());

    let results = pool
        .run(vec!["hang-1.com".to_string(), "free.com".to_string()])
        .collect()
        .await;

    assert_eq!(results.len(), 2);
    assert_eq!(find(&results, "hang-1.com").special_status, STATUS_CHECK_TIMEOUT);
    assert_eq!(reporter.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_panicking_reporter_keeps_every_result() {
    init_tracing();

    let reporter = Arc::new(PanickingReporter::default());
    let config = ScanConfig::default()
        .with_workers(1)
        .with_timeout(Duration::from_secs(1));
    let pool = WorkerPool::new(config, Arc::new(ScriptedChecker::default()))
        .unwrap()
        .with_status_reporter(reporter.clone());

    let results = pool
        .run(vec![
            "hang-1.com".to_string(),
            "free-a.com".to_string(),
            "hang-2.com".to_string(),
            "free-b.com".to_string(),
        ])
        .collect()
        .await;

    assert_eq!(results.len(), 4);
    assert!(find(&results, "hang-1.com").is_timeout());
    assert!(find(&results, "hang-2.com").is_timeout());
    assert!(find(&results, "free-a.com").available);
    assert!(find(&results, "free-b.com").available);
    assert_eq!(reporter.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_lookup_error_still_gets_signatures() {
    let signatures = Arc::new(MockSignatures::default());
    let config = ScanConfig::default().with_signatures(true);
    let pool = WorkerPool::new(config, Arc::new(ScriptedChecker::default()))
        .unwrap()
        .with_signature_checker(signatures.clone());

    let results = pool.run(vec!["err.com".to_string()]).collect().await;

    let failed = &results[0];
    assert!(!failed.available);
    assert_eq!(
        failed.error,
        Some(ScanError::lookup("err.com", "registry unreachable"))
    );
    assert_eq!(failed.signatures, vec!["sig1", "sig2"]);
    assert_eq!(signatures.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_signature_check_is_bounded_by_deadline() {
    let reporter = Arc::new(CollectingStatusReporter::new());
    let config = ScanConfig::default()
        .with_signatures(true)
        .with_timeout(Duration::from_secs(5));
    let pool = WorkerPool::new(config, Arc::new(ScriptedChecker::default()))
        .unwrap()
        .with_signature_checker(Arc::new(StuckSignatures))
        .with_status_reporter(reporter.clone());

    let start = Instant::now();
    let results = pool.run(vec!["taken.com".to_string()]).collect().await;

    let result = &results[0];
    assert!(!result.available);
    assert!(result.error.as_ref().is_some_and(ScanError::is_timeout));
    assert_eq!(result.special_status, STATUS_CHECK_TIMEOUT);
    assert!(result.signatures.is_empty());
    assert_eq!(reporter.count_for("taken.com"), 1);
    assert_eq!(reporter.len(), 1);
    assert!(start.elapsed() >= Duration::from_secs(5));
    assert!(start.elapsed() < Duration::from_secs(6));
}

#[tokio::test(start_paused = true)]
async fn test_lookup_errors_are_local_to_their_task() {
    let config = ScanConfig::default().with_workers(2);
    let pool = WorkerPool::new(config, Arc::new(ScriptedChecker::default())).unwrap();

    let results = pool
        .run(vec![
            "broken.com".to_string(),
            "free.com".to_string(),
            "taken.com".to_string(),
        ])
        .collect()
        .await;

    let broken = find(&results, "broken.com");
    assert!(!broken.available);
    assert_eq!(
        broken.error,
        Some(ScanError::lookup("broken.com", "registry unreachable"))
    );
    assert!(find(&results, "free.com").error.is_none());
    assert!(find(&results, "taken.com").error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_pacing_delay_is_per_worker() {
    let workers = 4;
    let per_worker = 3;
    let delay = Duration::from_millis(50);

    let config = ScanConfig::default().with_workers(workers).with_delay(delay);
    let pool = WorkerPool::new(config, Arc::new(ScriptedChecker::default())).unwrap();

    let start = Instant::now();
    let results = pool.run(names("free", workers * per_worker)).collect().await;
    let elapsed = start.elapsed();

    assert_eq!(results.len(), workers * per_worker);
    // K x D, not K x W x D
    assert!(elapsed >= delay * per_worker as u32, "elapsed {:?}", elapsed);
    assert!(elapsed < delay * (per_worker as u32 + 1), "elapsed {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_single_worker_paces_sequentially() {
    let delay = Duration::from_millis(100);
    let config = ScanConfig::default().with_workers(1).with_delay(delay);
    let pool = WorkerPool::new(config, Arc::new(ScriptedChecker::default())).unwrap();

    let start = Instant::now();
    let input = names("taken", 5);
    let results = pool.run(input.clone()).collect().await;

    assert!(start.elapsed() >= delay * 5);
    // One worker keeps dequeue order
    let order: Vec<String> = results.into_iter().map(|r| r.domain).collect();
    assert_eq!(order, input);
}

#[tokio::test(start_paused = true)]
async fn test_empty_source_completes_immediately() {
    let config = ScanConfig::default();
    let pool = WorkerPool::new(config, Arc::new(ScriptedChecker::default())).unwrap();

    let start = Instant::now();
    let results = pool.run(Vec::<String>::new()).collect().await;

    assert!(results.is_empty());
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_external_job_sources_feed_one_pool() {
    let config = ScanConfig::default().with_workers(3);
    let pool = WorkerPool::new(config, Arc::new(ScriptedChecker::default())).unwrap();
    let (jobs, handle) = pool.spawn();

    let mut producers = Vec::new();
    for prefix in ["free", "taken"] {
        let jobs = jobs.clone();
        producers.push(tokio::spawn(async move {
            for domain in names(prefix, 25) {
                jobs.submit(domain).await.unwrap();
            }
        }));
    }
    jobs.close();

    let collector = tokio::spawn(handle.summarize());
    for producer in producers {
        producer.await.unwrap();
    }

    let summary = collector.await.unwrap();
    assert_eq!(summary.total, 50);
    assert_eq!(summary.available, 25);
    assert_eq!(summary.unavailable, 25);
    assert_eq!(summary.errors, 0);
}

#[tokio::test(start_paused = true)]
async fn test_results_as_stream() {
    let config = ScanConfig::default().with_workers(4);
    let pool = WorkerPool::new(config, Arc::new(ScriptedChecker::default())).unwrap();

    let available: Vec<String> = pool
        .run(names("free", 10))
        .into_stream()
        .filter(|result| futures::future::ready(result.available))
        .map(|result| result.domain)
        .collect()
        .await;

    assert_eq!(available.len(), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_multi_thread_runtime_with_timeouts() {
    let reporter = Arc::new(CollectingStatusReporter::new());
    let config = ScanConfig::default()
        .with_workers(8)
        .with_timeout(Duration::from_millis(100));
    let pool = WorkerPool::new(config, Arc::new(ScriptedChecker::default()))
        .unwrap()
        .with_status_reporter(reporter.clone());

    let mut input = names("free", 20);
    input.extend(names("hang", 4));

    let summary = pool.run(input).summarize().await;
    assert_eq!(summary.total, 24);
    assert_eq!(summary.available, 20);
    assert_eq!(summary.timeouts, 4);
    assert_eq!(reporter.len(), 4);
}
