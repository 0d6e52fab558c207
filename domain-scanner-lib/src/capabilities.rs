//! Capabilities the worker pool calls out to.
//!
//! The pool never talks to a registry itself. Callers plug in an
//! [`AvailabilityChecker`] (required), optionally a [`SignatureChecker`], and a
//! [`StatusReporter`] that is told about anomalies such as timeouts.

use crate::error::ScanError;
use async_trait::async_trait;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Primary lookup: is this domain free to register?
///
/// Each call runs in its own tokio task under the pool's deadline. When the
/// deadline fires, `cancel` is cancelled and the task is aborted at its next
/// await point. Implementations that block the thread (synchronous sockets,
/// `std::thread::sleep`) cannot be aborted and should poll `cancel` instead.
///
/// An abandoned check that keeps running still holds one of the pool's check
/// permits, twice the worker count in total. Once they are all taken, workers
/// wait for a stuck check to return before starting the next one, so at most
/// one abandoned check per worker is ever alive.
#[async_trait]
pub trait AvailabilityChecker: Send + Sync {
    async fn check_availability(
        &self,
        domain: &str,
        cancel: CancellationToken,
    ) -> Result<bool, ScanError>;
}

/// Secondary best-effort lookup run for unavailable domains.
///
/// Any error is swallowed by the worker and yields an empty signature list.
#[async_trait]
pub trait SignatureChecker: Send + Sync {
    async fn check_signatures(
        &self,
        domain: &str,
        cancel: CancellationToken,
    ) -> Result<Vec<String>, ScanError>;
}

/// Side channel for out-of-band conditions.
///
/// Invoked at most once per anomalous task. Errors are logged and never
/// change the task's result.
pub trait StatusReporter: Send + Sync {
    fn report_special_status(&self, domain: &str, status: &str) -> Result<(), ScanError>;
}

/// Reporter that drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStatusReporter;

impl StatusReporter for NoopStatusReporter {
    fn report_special_status(&self, _domain: &str, _status: &str) -> Result<(), ScanError> {
        Ok(())
    }
}

/// Reporter that emits a `warn` event per notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogStatusReporter;

impl StatusReporter for LogStatusReporter {
    fn report_special_status(&self, domain: &str, status: &str) -> Result<(), ScanError> {
        tracing::warn!(domain, status, "special status");
        Ok(())
    }
}

/// Reporter that keeps every `(domain, status)` pair in memory.
///
/// Useful for writing special-status lists once a scan is over; see
/// [`status_lines`](crate::classify::status_lines) for the line format.
#[derive(Debug, Default)]
pub struct CollectingStatusReporter {
    entries: Mutex<Vec<(String, String)>>,
}

impl CollectingStatusReporter {
    /// Create an empty reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far, in report order.
    pub fn entries(&self) -> Vec<(String, String)> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of reports for one domain.
    pub fn count_for(&self, domain: &str) -> usize {
        self.entries()
            .iter()
            .filter(|(reported, _)| reported == domain)
            .count()
    }

    /// Total number of reports.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether nothing has been reported yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StatusReporter for CollectingStatusReporter {
    fn report_special_status(&self, domain: &str, status: &str) -> Result<(), ScanError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ScanError::reporter("status list lock poisoned"))?;
        entries.push((domain.to_string(), status.to_string()));
        Ok(())
    }
}
