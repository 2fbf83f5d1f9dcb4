//! Worker configuration.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use stevedore_core::{Branding, WorkerOperation, WorkspaceVersion};

/// Environment variable gating the destructive step of migration cleanup.
pub const MIGRATION_CLEANUP_ENV: &str = "MIGRATION_CLEANUP";

/// Options injected into the worker at construction.
///
/// The identity fields (`version`, `region`, `limit`, `operation`) are
/// immutable for the process lifetime; the control-plane matches pending
/// workspaces against them.
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Data-model version this worker creates and upgrades workspaces to
    pub version: WorkspaceVersion,
    /// Region served by this worker; empty means the default region
    pub region: String,
    /// Maximum number of concurrently running jobs
    pub limit: usize,
    /// Lifecycle phases this worker is willing to perform
    pub operation: WorkerOperation,
    /// Branding profiles by name, applied at create time
    pub brandings: HashMap<String, Branding>,
    /// Full-text service URL; reindex calls are skipped when absent
    pub fulltext_url: Option<url::Url>,
    /// DB URL whose scheme selects the destroy adapter
    pub db_url: String,
    /// Idle sleep duration between empty polls
    pub wait_timeout: Duration,
    /// Workspace names excluded from upgrades
    pub ignore: Vec<String>,
    /// Force upgrades even when the external upgrader considers them current
    pub force: bool,
    /// Log phase output to the process log instead of per-workspace files
    pub console: bool,
    /// Directory for per-workspace log files when `console` is false
    pub logs_dir: PathBuf,
    /// Backup storage configuration; required for backup-backed operations
    pub backup: Option<BackupOptions>,
    /// Perform the destructive DB delete during migration cleanup
    pub migration_cleanup: bool,
}

/// Backup storage configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupOptions {
    /// Storage service URL the adapter factory connects to
    pub storage_url: String,
    /// Bucket receiving workspace backups
    pub bucket_name: String,
}

impl WorkerOptions {
    /// Create options with defaults for everything but the identity fields.
    pub fn new(version: WorkspaceVersion, operation: WorkerOperation, db_url: impl Into<String>) -> Self {
        Self {
            version,
            region: String::new(),
            limit: 1,
            operation,
            brandings: HashMap::new(),
            fulltext_url: None,
            db_url: db_url.into(),
            wait_timeout: Duration::from_secs(5),
            ignore: Vec::new(),
            force: false,
            console: false,
            logs_dir: PathBuf::from("logs"),
            backup: None,
            migration_cleanup: migration_cleanup_from_env(),
        }
    }

    /// Set the region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Set the concurrency limit
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Set the idle sleep duration
    pub fn with_wait_timeout(mut self, wait_timeout: Duration) -> Self {
        self.wait_timeout = wait_timeout;
        self
    }

    /// Set the upgrade ignore list from its comma-separated wire form
    pub fn with_ignore_list(mut self, ignore: &str) -> Self {
        self.ignore = parse_ignore(ignore);
        self
    }

    /// Set the backup storage configuration
    pub fn with_backup(mut self, backup: BackupOptions) -> Self {
        self.backup = Some(backup);
        self
    }

    /// Validate the options.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limit == 0 {
            return Err(ConfigError::InvalidValue(
                "limit must be at least 1".to_string(),
            ));
        }
        if self.wait_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "wait_timeout must be positive".to_string(),
            ));
        }
        if self.operation.includes_backup() && self.backup.is_none() {
            return Err(ConfigError::InvalidValue(
                "backup options are required for the all+backup operation".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether `workspace` is excluded from upgrades.
    pub fn is_ignored(&self, workspace: &str) -> bool {
        self.ignore.iter().any(|name| name == workspace)
    }
}

/// Parse the comma-separated ignore option into workspace names.
pub fn parse_ignore(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read the `MIGRATION_CLEANUP` gate from the environment.
pub fn migration_cleanup_from_env() -> bool {
    std::env::var(MIGRATION_CLEANUP_ENV)
        .map(|value| value == "true" || value == "1")
        .unwrap_or(false)
}

/// Configuration error
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}
