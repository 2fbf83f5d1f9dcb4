//! # Stevedore Worker
//!
//! The workspace lifecycle worker: a long-running loop that pulls pending
//! workspaces from the control-plane account service, drives each one through
//! its current lifecycle phase (create, upgrade, archive, migrate, restore,
//! delete), and reports progress back.
//!
//! ## Architecture
//!
//! The worker is a library; the embedding product wires its collaborator
//! implementations and runs it:
//!
//! ```rust,ignore
//! use stevedore_worker::{LifecycleOps, LifecycleWorker, WorkerOptions};
//!
//! let options = WorkerOptions::new(version, WorkerOperation::All, db_url)
//!     .with_region("eu")
//!     .with_limit(4);
//! let worker = LifecycleWorker::new(options, account_client, ops)?
//!     .with_shutdown_signal(shutdown_rx);
//! worker.run().await?;
//! ```
//!
//! One control loop owns dispatch: it acquires a slot from the concurrency
//! gate, asks the control-plane for one pending workspace, and spawns the
//! phase handler without awaiting it. Durable state lives exclusively in the
//! control-plane; the worker reports lifecycle events and keeps nothing.
//!
//! ## Modules
//!
//! - [`worker`] - the control loop (handshake, poll, dispatch, drain)
//! - [`handlers`] - one handler per lifecycle phase
//! - [`dispatch`] - mode-to-phase routing
//! - [`reporter`] - debounced monotone progress and the keepalive ping
//! - [`gate`] / [`idle`] - bounded concurrency and interruptible idle sleep
//! - [`ops`] / [`adapters`] - collaborator seams and scheme-keyed registries
//! - [`maintenance`] / [`fulltext`] - transactor force-close and reindex
//! - [`logsink`] - per-workspace log files
//! - [`config`] - constructor-injected options

pub mod adapters;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod fulltext;
pub mod gate;
pub mod handlers;
pub mod idle;
pub mod logsink;
pub mod maintenance;
pub mod ops;
pub mod reporter;
pub mod worker;

// Re-export error types
pub use error::{WorkerError, WorkerResult};

// Re-export configuration
pub use config::{migration_cleanup_from_env, BackupOptions, ConfigError, WorkerOptions};

// Re-export the worker and its building blocks
pub use dispatch::Phase;
pub use gate::{ConcurrencyGate, JobSlot};
pub use handlers::{JobRunner, CREATE_RESUME_THRESHOLD};
pub use idle::{IdleWake, Wakeup};
pub use logsink::WorkspaceLog;
pub use reporter::{Keepalive, ProgressReporter, ProgressSink, PING_INTERVAL, UPDATE_BUDGET};
pub use worker::{JobErrorHandler, LifecycleWorker};

// Re-export collaborator seams
pub use adapters::AdapterRegistry;
pub use fulltext::{FulltextIndexer, HttpFulltextIndexer};
pub use maintenance::{SessionMaintenance, TransactorMaintenance};
pub use ops::{
    BackupRunner, DataDestroyer, LifecycleOps, StorageAdapter, StorageFactory,
    WorkspaceInitializer, WorkspaceUpgrader,
};
