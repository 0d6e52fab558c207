//! # Domain Scanner Library
//!
//! A bounded worker pool for bulk domain availability scans.
//!
//! A fixed number of workers drain one shared queue of domain names. Each
//! name is checked through an injected [`AvailabilityChecker`] under a hard
//! deadline, optionally followed by a [`SignatureChecker`] for unavailable
//! domains, and produces exactly one [`DomainResult`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use domain_scanner_lib::{AvailabilityChecker, ScanConfig, ScanError, WorkerPool};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! struct MyRegistry;
//!
//! #[async_trait]
//! impl AvailabilityChecker for MyRegistry {
//!     async fn check_availability(
//!         &self,
//!         domain: &str,
//!         _cancel: CancellationToken,
//!     ) -> Result<bool, ScanError> {
//!         Ok(domain.len() > 12)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ScanError> {
//!     let pool = WorkerPool::new(ScanConfig::load()?, Arc::new(MyRegistry))?;
//!     let summary = pool.run(vec!["example.com".to_string()]).summarize().await;
//!     println!("{} checked, {} available", summary.total, summary.available);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Per-domain deadline**: a hanging lookup is cancelled and recorded as a timeout
//! - **Pacing**: each worker sleeps after every task to throttle the lookup service
//! - **Signature checks**: best-effort secondary lookups for unavailable domains
//! - **Configurable**: TOML files and `DS_*` environment variables

pub use capabilities::{
    AvailabilityChecker, CollectingStatusReporter, LogStatusReporter, NoopStatusReporter,
    SignatureChecker, StatusReporter,
};
pub use config::{
    load_env_config, parse_duration_string, ConfigManager, EnvConfig, FileConfig, ScanDefaults,
};
pub use error::ScanError;
pub use pool::{JobSender, ScanHandle, WorkerPool};
pub use types::{
    DomainResult, ScanConfig, ScanSummary, DEFAULT_TIMEOUT, DEFAULT_WORKERS, STATUS_CHECK_TIMEOUT,
};

// Public modules
pub mod classify;

mod capabilities;
mod config;
mod error;
mod pool;
mod types;
mod worker;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, ScanError>;

// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
