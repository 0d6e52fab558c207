//! Core data types for domain scanning.
//!
//! This module defines the result record produced for every scanned domain,
//! the pool configuration, and a small summary type for folding results.

use crate::error::ScanError;
use serde::{Serialize, Serializer};
use std::time::Duration;

/// Special status tag attached when a domain check exceeds its deadline.
pub const STATUS_CHECK_TIMEOUT: &str = "CHECK_TIMEOUT";

/// Default per-domain deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(45);

/// Default number of workers.
pub const DEFAULT_WORKERS: usize = 10;

/// Result of scanning a single domain.
///
/// Exactly one of these is produced for every domain name the pool consumes.
/// A record is built by the worker that processed the name and moved into
/// the result channel; it is never touched by the engine afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainResult {
    /// The domain name that was checked (echoed for correlation)
    pub domain: String,

    /// Whether the domain is available for registration.
    /// Only meaningful when `error` is `None`; always `false` otherwise.
    pub available: bool,

    /// Lookup failure or timeout, if any
    #[serde(
        serialize_with = "serialize_error",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<ScanError>,

    /// Signatures collected for unavailable domains when signature checks are on,
    /// failed lookups included
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub signatures: Vec<String>,

    /// Out-of-band condition tag; empty means normal
    #[serde(skip_serializing_if = "String::is_empty")]
    pub special_status: String,
}

fn serialize_error<S: Serializer>(
    error: &Option<ScanError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(err) => serializer.serialize_str(&err.to_string()),
        None => serializer.serialize_none(),
    }
}

impl DomainResult {
    /// A result for a check that completed before its deadline.
    pub fn completed(domain: impl Into<String>, available: bool, signatures: Vec<String>) -> Self {
        Self {
            domain: domain.into(),
            available,
            error: None,
            signatures,
            special_status: String::new(),
        }
    }

    /// A result for a check whose capability returned an error.
    pub fn failed(domain: impl Into<String>, error: ScanError) -> Self {
        Self {
            domain: domain.into(),
            available: false,
            error: Some(error),
            signatures: Vec::new(),
            special_status: String::new(),
        }
    }

    /// A result for a failed lookup that still gathered signatures.
    pub fn failed_with_signatures(
        domain: impl Into<String>,
        error: ScanError,
        signatures: Vec<String>,
    ) -> Self {
        Self {
            signatures,
            ..Self::failed(domain, error)
        }
    }

    /// A result for a check abandoned at the deadline.
    pub fn timed_out(domain: impl Into<String>, duration: Duration) -> Self {
        let domain = domain.into();
        Self {
            error: Some(ScanError::timeout(domain.clone(), duration)),
            domain,
            available: false,
            signatures: Vec::new(),
            special_status: STATUS_CHECK_TIMEOUT.to_string(),
        }
    }

    /// Whether the check hit the per-domain deadline.
    pub fn is_timeout(&self) -> bool {
        self.special_status == STATUS_CHECK_TIMEOUT
    }

    /// Whether an out-of-band status tag is set.
    pub fn has_special_status(&self) -> bool {
        !self.special_status.is_empty()
    }

    /// Whether the lookup failed or timed out.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Configuration options for a worker pool.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    /// Number of concurrent workers
    /// Default: 10, must be at least 1
    pub workers: usize,

    /// Pause each worker takes after every task, throttling requests to
    /// the lookup service
    /// Default: zero
    pub delay: Duration,

    /// Hard deadline for each domain check
    /// Default: 45 seconds
    pub timeout: Duration,

    /// Whether to run the signature check for unavailable domains
    /// Default: false
    pub include_signatures: bool,

    /// Capacity of the work queue and the result channel
    /// Default: None (four slots per worker)
    pub queue_capacity: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            delay: Duration::ZERO,
            timeout: DEFAULT_TIMEOUT,
            include_signatures: false,
            queue_capacity: None,
        }
    }
}

impl ScanConfig {
    /// Set the worker count. Zero is raised to one.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the per-worker pacing delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set the per-domain deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable signature checks for unavailable domains.
    pub fn with_signatures(mut self, enabled: bool) -> Self {
        self.include_signatures = enabled;
        self
    }

    /// Set the queue and result channel capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Effective capacity of the bounded channels.
    pub fn effective_queue_capacity(&self) -> usize {
        self.queue_capacity
            .unwrap_or_else(|| self.workers.saturating_mul(4))
            .max(1)
    }

    /// Check the configuration for values the pool cannot run with.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.workers == 0 {
            return Err(ScanError::config("Worker count must be at least 1"));
        }
        if self.timeout.is_zero() {
            return Err(ScanError::config("Timeout must be greater than zero"));
        }
        if self.queue_capacity == Some(0) {
            return Err(ScanError::config("Queue capacity must be at least 1"));
        }
        Ok(())
    }
}

/// Counters folded from a stream of results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub total: usize,
    pub available: usize,
    pub unavailable: usize,
    pub errors: usize,
    pub timeouts: usize,
    pub with_signatures: usize,
}

impl ScanSummary {
    /// Account for one result.
    pub fn record(&mut self, result: &DomainResult) {
        self.total += 1;
        if result.is_timeout() {
            self.timeouts += 1;
        }
        if result.is_error() {
            self.errors += 1;
        } else if result.available {
            self.available += 1;
        } else {
            self.unavailable += 1;
        }
        if !result.signatures.is_empty() {
            self.with_signatures += 1;
        }
    }
}

impl<'a> FromIterator<&'a DomainResult> for ScanSummary {
    fn from_iter<I: IntoIterator<Item = &'a DomainResult>>(iter: I) -> Self {
        let mut summary = ScanSummary::default();
        for result in iter {
            summary.record(result);
        }
        summary
    }
}
