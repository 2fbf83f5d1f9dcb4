//! # Stevedore Core
//!
//! Transport-level building blocks for the Stevedore workspace lifecycle
//! worker. This crate carries no worker-loop policy; it provides the types a
//! worker needs to talk to the control-plane and to describe workspaces:
//!
//! - Workspace snapshots, the closed lifecycle-mode union, and branding
//!   records
//! - The lifecycle event vocabulary reported back to the control-plane
//! - Semantic version triples for workers and workspaces
//! - Worker operation capabilities used during the handshake
//! - Retry strategies and the until-success / until-deadline wrappers
//! - The [`AccountClient`] trait and its HTTP implementation
//!
//! The worker crate (`stevedore-worker`) builds the polling loop, the
//! concurrency gate, and the phase handlers on top of these types.

pub mod client;
pub mod error;
pub mod event;
pub mod operation;
pub mod retry;
pub mod version;
pub mod workspace;

// Re-export error types
pub use error::{CoreError, CoreResult};

// Re-export workspace types
pub use workspace::{Branding, WorkspaceInfo, WorkspaceMode};

// Re-export wire vocabulary
pub use event::LifecycleEvent;
pub use operation::WorkerOperation;
pub use version::WorkspaceVersion;

// Re-export retry machinery
pub use retry::{retry_until_ok, retry_within, RetryStrategy};

// Re-export client types
pub use client::{AccountClient, HttpAccountClient};
