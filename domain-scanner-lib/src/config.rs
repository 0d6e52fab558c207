//! Configuration file parsing and management.
//!
//! Pool settings can come from TOML files and `DS_*` environment variables.
//! Precedence, lowest to highest: built-in defaults, XDG config, home
//! config, local config, environment.

use crate::error::ScanError;
use crate::types::ScanConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration loaded from TOML files.
///
/// ```toml
/// [scan]
/// workers = 20
/// delay = "500ms"
/// timeout = "45s"
/// signatures = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    /// Worker pool settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan: Option<ScanDefaults>,
}

/// Pool settings as they appear in a config file.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ScanDefaults {
    /// Number of workers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    /// Pacing delay per worker (as string, e.g., "250ms", "1s")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<String>,

    /// Per-domain deadline (as string, e.g., "45s", "2m")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Run signature checks for unavailable domains
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signatures: Option<bool>,

    /// Capacity of the work queue
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_capacity: Option<usize>,
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager;

impl ConfigManager {
    pub fn new() -> Self {
        Self
    }

    /// Load configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, ScanError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ScanError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            ScanError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content)?;
        self.validate_config(&config)?;

        debug!(path = %path.display(), "loaded configuration file");
        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// Files that exist but fail to parse are skipped with a warning.
    pub fn discover_and_load(&self) -> FileConfig {
        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        candidates
            .into_iter()
            .flatten()
            .fold(FileConfig::default(), |merged, path| match self.load_file(&path) {
                Ok(config) => self.merge_configs(merged, config),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "ignoring configuration file");
                    merged
                }
            })
    }

    /// The local configuration file in the current directory, if any.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./domain-scanner.toml", "./.domain-scanner.toml"]
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// The configuration file in the user's home directory, if any.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        let path = Path::new(&home).join(".domain-scanner.toml");
        path.exists().then_some(path)
    }

    /// The XDG configuration file, if any.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("domain-scanner").join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations. Values from `higher` win.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        let scan = match (lower.scan, higher.scan) {
            (Some(lower), Some(higher)) => Some(ScanDefaults {
                workers: higher.workers.or(lower.workers),
                delay: higher.delay.or(lower.delay),
                timeout: higher.timeout.or(lower.timeout),
                signatures: higher.signatures.or(lower.signatures),
                queue_capacity: higher.queue_capacity.or(lower.queue_capacity),
            }),
            (lower, higher) => higher.or(lower),
        };
        FileConfig { scan }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), ScanError> {
        let Some(scan) = &config.scan else {
            return Ok(());
        };

        if scan.workers == Some(0) {
            return Err(ScanError::config("Worker count must be at least 1"));
        }
        if scan.queue_capacity == Some(0) {
            return Err(ScanError::config("Queue capacity must be at least 1"));
        }
        if let Some(delay) = &scan.delay {
            if parse_duration_string(delay).is_none() {
                return Err(ScanError::config(format!(
                    "Invalid delay format '{}'. Use format like '250ms', '1s', '2m'",
                    delay
                )));
            }
        }
        if let Some(timeout) = &scan.timeout {
            match parse_duration_string(timeout) {
                Some(duration) if !duration.is_zero() => {}
                _ => {
                    return Err(ScanError::config(format!(
                        "Invalid timeout '{}'. Use a positive duration like '45s', '2m'",
                        timeout
                    )))
                }
            }
        }

        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Environment variable configuration.
///
/// Values that fail to parse are dropped with a warning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub workers: Option<usize>,
    pub delay: Option<Duration>,
    pub timeout: Option<Duration>,
    pub signatures: Option<bool>,
    pub queue_capacity: Option<usize>,
}

/// Load configuration from `DS_*` environment variables.
pub fn load_env_config() -> EnvConfig {
    env_config_from(|key| env::var(key).ok())
}

/// Build an [`EnvConfig`] from any key lookup.
fn env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    // DS_WORKERS - number of workers
    if let Some(val) = lookup("DS_WORKERS") {
        match val.trim().parse::<usize>() {
            Ok(workers) if workers > 0 => env_config.workers = Some(workers),
            _ => warn!(value = %val, "invalid DS_WORKERS, must be a positive integer"),
        }
    }

    // DS_DELAY - pacing delay
    if let Some(val) = lookup("DS_DELAY") {
        match parse_duration_string(&val) {
            Some(delay) => env_config.delay = Some(delay),
            None => warn!(value = %val, "invalid DS_DELAY, use format like '250ms', '1s'"),
        }
    }

    // DS_TIMEOUT - per-domain deadline
    if let Some(val) = lookup("DS_TIMEOUT") {
        match parse_duration_string(&val) {
            Some(timeout) if !timeout.is_zero() => env_config.timeout = Some(timeout),
            _ => warn!(value = %val, "invalid DS_TIMEOUT, use a positive duration like '45s'"),
        }
    }

    // DS_SIGNATURES - enable signature checks
    if let Some(val) = lookup("DS_SIGNATURES") {
        match parse_bool(&val) {
            Some(enabled) => env_config.signatures = Some(enabled),
            None => warn!(value = %val, "invalid DS_SIGNATURES, use true/false"),
        }
    }

    // DS_QUEUE_CAPACITY - work queue capacity
    if let Some(val) = lookup("DS_QUEUE_CAPACITY") {
        match val.trim().parse::<usize>() {
            Ok(capacity) if capacity > 0 => env_config.queue_capacity = Some(capacity),
            _ => warn!(value = %val, "invalid DS_QUEUE_CAPACITY, must be a positive integer"),
        }
    }

    env_config
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl ScanConfig {
    /// Build a configuration from defaults, a file config and the environment.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::ConfigError` if a file duration cannot be parsed or
    /// the combined configuration is invalid.
    pub fn from_sources(file: &FileConfig, env: &EnvConfig) -> Result<Self, ScanError> {
        let mut config = ScanConfig::default();

        if let Some(scan) = &file.scan {
            if let Some(workers) = scan.workers {
                config.workers = workers;
            }
            if let Some(delay) = &scan.delay {
                config.delay = parse_duration_string(delay)
                    .ok_or_else(|| ScanError::config(format!("Invalid delay '{}'", delay)))?;
            }
            if let Some(timeout) = &scan.timeout {
                config.timeout = parse_duration_string(timeout)
                    .ok_or_else(|| ScanError::config(format!("Invalid timeout '{}'", timeout)))?;
            }
            if let Some(signatures) = scan.signatures {
                config.include_signatures = signatures;
            }
            if scan.queue_capacity.is_some() {
                config.queue_capacity = scan.queue_capacity;
            }
        }

        if let Some(workers) = env.workers {
            config.workers = workers;
        }
        if let Some(delay) = env.delay {
            config.delay = delay;
        }
        if let Some(timeout) = env.timeout {
            config.timeout = timeout;
        }
        if let Some(signatures) = env.signatures {
            config.include_signatures = signatures;
        }
        if env.queue_capacity.is_some() {
            config.queue_capacity = env.queue_capacity;
        }

        config.validate()?;
        Ok(config)
    }

    /// Discover config files, read the environment, and combine them.
    pub fn load() -> Result<Self, ScanError> {
        let file = ConfigManager::new().discover_and_load();
        Self::from_sources(&file, &load_env_config())
    }
}

/// Parse a duration string like "250ms", "5s", "2m".
///
/// A bare number is taken as seconds.
pub fn parse_duration_string(duration_str: &str) -> Option<Duration> {
    let duration_str = duration_str.trim().to_lowercase();

    if let Some(ms) = duration_str.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = duration_str.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = duration_str.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        duration_str.parse::<u64>().ok().map(Duration::from_secs)
    }
}
