//! Worker error types.

use stevedore_core::CoreError;

/// Error type for worker operations and phase handlers.
///
/// A phase handler failing maps into exactly one of these arms; the job
/// boundary routes it to the configured error handler and the loop continues.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// Control-plane or transport error
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Invalid worker configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// No adapter registered for the DB URL scheme
    #[error("No adapter registered for scheme '{scheme}'")]
    AdapterNotFound { scheme: String },

    /// A backup-backed phase was dispatched without backup options
    #[error("Backup storage is not configured")]
    BackupNotConfigured,

    /// Workspace initialization failed
    #[error("Workspace init failed: {0}")]
    Init(String),

    /// Workspace upgrade failed
    #[error("Workspace upgrade failed: {0}")]
    Upgrade(String),

    /// Backup pipeline failed
    #[error("Workspace backup failed: {0}")]
    Backup(String),

    /// Restore pipeline failed
    #[error("Workspace restore failed: {0}")]
    Restore(String),

    /// Database destroy adapter failed
    #[error("Workspace destroy failed: {0}")]
    Destroy(String),

    /// I/O error (log sinks, local scratch files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type alias for worker operations
pub type WorkerResult<T> = std::result::Result<T, WorkerError>;
