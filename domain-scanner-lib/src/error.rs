//! Error handling for domain scanning operations.
//!
//! Every failure in the engine is local to the task that produced it, so
//! most of these variants end up inside a [`DomainResult`](crate::DomainResult)
//! rather than being returned from a pool method.

use std::fmt;
use std::time::Duration;

/// Main error type for domain scanning operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanError {
    /// The availability capability reported a failure for this domain
    Lookup { domain: String, message: String },

    /// The guarded check did not finish before the per-task deadline
    Timeout { domain: String, duration: Duration },

    /// The secondary signature capability failed
    Signature { domain: String, message: String },

    /// The special-status reporter failed to record an anomaly
    Reporter { message: String },

    /// A name was submitted after every worker had stopped
    QueueClosed { domain: String },

    /// Configuration errors (invalid settings, unparsable files)
    ConfigError { message: String },

    /// File I/O errors when reading configuration
    FileError { path: String, message: String },

    /// Panics or cancellations inside a guarded task, and other internal faults
    Internal { message: String },
}

impl ScanError {
    /// Create a new lookup error.
    pub fn lookup<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::Lookup {
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<D: Into<String>>(domain: D, duration: Duration) -> Self {
        Self::Timeout {
            domain: domain.into(),
            duration,
        }
    }

    /// Create a new signature-check error.
    pub fn signature<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::Signature {
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// Create a new reporter error.
    pub fn reporter<M: Into<String>>(message: M) -> Self {
        Self::Reporter {
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error is the per-task deadline firing.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check if this error suggests the domain should be scanned again later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Lookup { .. })
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lookup { domain, message } => {
                write!(f, "Lookup failed for '{}': {}", domain, message)
            }
            Self::Timeout { domain, duration } => {
                write!(f, "Domain check timeout for '{}' after {:?}", domain, duration)
            }
            Self::Signature { domain, message } => {
                write!(f, "Signature check failed for '{}': {}", domain, message)
            }
            Self::Reporter { message } => {
                write!(f, "Status reporter error: {}", message)
            }
            Self::QueueClosed { domain } => {
                write!(f, "Work queue closed, '{}' was not scheduled", domain)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for ScanError {}

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}

impl From<toml::de::Error> for ScanError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigError {
            message: format!("Failed to parse TOML configuration: {}", err),
        }
    }
}

impl From<tokio::task::JoinError> for ScanError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            Self::internal("domain check panicked")
        } else {
            Self::internal("domain check was cancelled")
        }
    }
}
