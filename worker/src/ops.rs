//! Collaborator seams for the phase handlers.
//!
//! The actual schema migration logic, backup byte-pumping, and database
//! destroy adapters live outside this crate. The handlers drive them through
//! these traits; production wiring registers the real implementations and the
//! test suite registers recording mocks.

use crate::adapters::AdapterRegistry;
use crate::config::{BackupOptions, WorkerOptions};
use crate::error::WorkerResult;
use crate::fulltext::{FulltextIndexer, HttpFulltextIndexer};
use crate::logsink::WorkspaceLog;
use crate::maintenance::SessionMaintenance;
use crate::reporter::ProgressSink;
use async_trait::async_trait;
use std::sync::Arc;
use stevedore_core::{Branding, WorkspaceInfo, WorkspaceVersion};
use uuid::Uuid;

/// Runs the full create sequence: model init, indices, seed data.
#[async_trait]
pub trait WorkspaceInitializer: Send + Sync {
    async fn create_workspace(
        &self,
        workspace: &WorkspaceInfo,
        branding: Option<&Branding>,
        progress: ProgressSink,
        log: Arc<WorkspaceLog>,
    ) -> WorkerResult<()>;
}

/// Brings a workspace's data model up to the worker's version.
///
/// The operation is re-entrant; a partially applied upgrade may be retried.
#[async_trait]
pub trait WorkspaceUpgrader: Send + Sync {
    async fn upgrade_workspace(
        &self,
        workspace: &WorkspaceInfo,
        target: WorkspaceVersion,
        force: bool,
        progress: ProgressSink,
        log: Arc<WorkspaceLog>,
    ) -> WorkerResult<()>;
}

/// An open connection to backup storage, scoped to one workspace.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Release connections and buffers. Called on every exit path.
    async fn close(&self) -> WorkerResult<()>;
}

/// Builds a fresh storage adapter for a workspace from the backup options.
#[async_trait]
pub trait StorageFactory: Send + Sync {
    async fn open(
        &self,
        backup: &BackupOptions,
        workspace: &WorkspaceInfo,
    ) -> WorkerResult<Box<dyn StorageAdapter>>;
}

/// Pumps workspace data to and from backup storage.
#[async_trait]
pub trait BackupRunner: Send + Sync {
    /// Back up the workspace. Returns `false` when the run produced nothing
    /// to record, in which case no terminal event is emitted.
    async fn backup(
        &self,
        workspace: &WorkspaceInfo,
        storage: &dyn StorageAdapter,
        full_check: bool,
        progress: ProgressSink,
        log: Arc<WorkspaceLog>,
    ) -> WorkerResult<bool>;

    /// Restore the workspace's blob domain from backup storage.
    async fn restore(
        &self,
        workspace: &WorkspaceInfo,
        storage: &dyn StorageAdapter,
        progress: ProgressSink,
        log: Arc<WorkspaceLog>,
    ) -> WorkerResult<()>;
}

/// Drops a workspace's database.
#[async_trait]
pub trait DataDestroyer: Send + Sync {
    async fn delete_workspace(&self, workspace: &str, uuid: Uuid) -> WorkerResult<()>;
}

/// The full collaborator set a worker is constructed with.
#[derive(Clone)]
pub struct LifecycleOps {
    pub initializer: Arc<dyn WorkspaceInitializer>,
    pub upgrader: Arc<dyn WorkspaceUpgrader>,
    pub storage: Arc<dyn StorageFactory>,
    pub backup: Arc<dyn BackupRunner>,
    /// Destroy adapters keyed by DB URL scheme (`mongodb`, `postgresql`)
    pub destroyers: Arc<AdapterRegistry<dyn DataDestroyer>>,
    pub maintenance: Arc<dyn SessionMaintenance>,
    /// Absent when no full-text service is configured
    pub fulltext: Option<Arc<dyn FulltextIndexer>>,
}

impl LifecycleOps {
    /// Wire the production full-text indexer from the configured
    /// `fulltext_url`, if any.
    pub fn with_http_fulltext(mut self, options: &WorkerOptions, token: &str) -> Self {
        self.fulltext = options
            .fulltext_url
            .clone()
            .map(|url| Arc::new(HttpFulltextIndexer::new(url, token)) as Arc<dyn FulltextIndexer>);
        self
    }
}
