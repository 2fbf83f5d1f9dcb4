//! Phase handlers.
//!
//! All handlers follow the same skeleton: open the per-workspace log sink,
//! force-close sessions if the phase is destructive, drive the external
//! operation while streaming progress, then emit the terminal `*-done`
//! event. A handler error ends the phase without a `-done` event; the
//! workspace stays in its server-side mode and the control-plane may hand it
//! back later.

use crate::config::WorkerOptions;
use crate::dispatch::Phase;
use crate::error::{WorkerError, WorkerResult};
use crate::logsink::WorkspaceLog;
use crate::ops::LifecycleOps;
use crate::reporter::ProgressReporter;
use std::sync::Arc;
use stevedore_core::{AccountClient, LifecycleEvent, WorkspaceInfo, WorkspaceMode};

/// A `creating` workspace at or above this progress already ran its init
/// script, which is not reliably re-entrant. Resuming instead of re-running
/// advances the state machine at the cost of letting a partially initialised
/// workspace through.
pub const CREATE_RESUME_THRESHOLD: u8 = 30;

/// Executes one phase for one workspace snapshot.
pub struct JobRunner {
    options: Arc<WorkerOptions>,
    client: Arc<dyn AccountClient>,
    ops: LifecycleOps,
}

impl JobRunner {
    pub fn new(
        options: Arc<WorkerOptions>,
        client: Arc<dyn AccountClient>,
        ops: LifecycleOps,
    ) -> Self {
        Self {
            options,
            client,
            ops,
        }
    }

    /// Route the workspace to its phase handler.
    pub async fn run(&self, workspace: &WorkspaceInfo) -> WorkerResult<()> {
        let Some(phase) = Phase::for_mode(&workspace.mode) else {
            tracing::error!(
                workspace = %workspace.workspace,
                mode = %workspace.mode,
                "Unknown workspace mode"
            );
            return Ok(());
        };

        tracing::info!(workspace = %workspace.workspace, %phase, "processing workspace");
        let reporter = Arc::new(ProgressReporter::new(
            self.client.clone(),
            workspace.workspace.clone(),
            self.options.version,
        ));

        match phase {
            Phase::Create => self.create(workspace, &reporter).await,
            Phase::Upgrade => self.upgrade(workspace, &reporter).await,
            Phase::ArchiveBackup => self.backup(workspace, &reporter, Phase::ArchiveBackup).await,
            Phase::MigrateBackup => self.backup(workspace, &reporter, Phase::MigrateBackup).await,
            Phase::ArchiveClean => self.clean(workspace, &reporter, Phase::ArchiveClean).await,
            Phase::MigrateClean => self.clean(workspace, &reporter, Phase::MigrateClean).await,
            Phase::Delete => self.clean(workspace, &reporter, Phase::Delete).await,
            Phase::Restore => self.restore(workspace, &reporter).await,
        }
    }

    /// Create a workspace, or resume a create that failed after its init
    /// script already ran.
    async fn create(
        &self,
        workspace: &WorkspaceInfo,
        reporter: &Arc<ProgressReporter>,
    ) -> WorkerResult<()> {
        let progress = workspace.progress.unwrap_or(0);
        if workspace.mode == WorkspaceMode::Creating && progress >= CREATE_RESUME_THRESHOLD {
            tracing::warn!(
                workspace = %workspace.workspace,
                progress,
                "init script already ran, resuming create at observed progress"
            );
            reporter.marker(LifecycleEvent::CreateDone, progress).await;
            return Ok(());
        }

        let log = self.open_log(&workspace.workspace)?;
        reporter.marker(LifecycleEvent::CreateStarted, 0).await;

        let branding = workspace
            .branding
            .as_deref()
            .and_then(|name| self.options.brandings.get(name));
        let (sink, forwarder) = reporter.progress_sink();
        let result = self
            .ops
            .initializer
            .create_workspace(workspace, branding, sink, log.clone())
            .await;
        let _ = forwarder.await;
        result?;

        log.append("workspace created");
        reporter.marker(LifecycleEvent::CreateDone, 100).await;
        Ok(())
    }

    /// Upgrade a workspace's data model to the worker's version.
    async fn upgrade(
        &self,
        workspace: &WorkspaceInfo,
        reporter: &Arc<ProgressReporter>,
    ) -> WorkerResult<()> {
        if workspace.disabled
            || workspace.mode.is_archiving()
            || workspace.mode.is_migrating()
            || workspace.mode.is_restoring()
        {
            tracing::debug!(
                workspace = %workspace.workspace,
                mode = %workspace.mode,
                disabled = workspace.disabled,
                "skipping upgrade"
            );
            return Ok(());
        }
        if self.options.is_ignored(&workspace.workspace) {
            tracing::debug!(workspace = %workspace.workspace, "workspace on ignore list");
            return Ok(());
        }

        let log = self.open_log(&workspace.workspace)?;
        reporter.marker(LifecycleEvent::UpgradeStarted, 0).await;

        let (sink, forwarder) = reporter.progress_sink();
        let result = self
            .ops
            .upgrader
            .upgrade_workspace(
                workspace,
                self.options.version,
                self.options.force,
                sink,
                log.clone(),
            )
            .await;
        let _ = forwarder.await;
        result?;

        log.append(&format!("workspace upgraded to {}", self.options.version));
        reporter.marker(LifecycleEvent::UpgradeDone, 100).await;
        Ok(())
    }

    /// Back up a workspace for archiving or migration.
    ///
    /// Archive backups run with a full integrity check; migration backups
    /// skip it because migration is time-critical and the full check is
    /// scheduled separately pre-migration.
    async fn backup(
        &self,
        workspace: &WorkspaceInfo,
        reporter: &Arc<ProgressReporter>,
        phase: Phase,
    ) -> WorkerResult<()> {
        let backup_options = self
            .options
            .backup
            .as_ref()
            .ok_or(WorkerError::BackupNotConfigured)?;
        let full_check = phase == Phase::ArchiveBackup;

        let log = self.open_log(&workspace.workspace)?;
        reporter.marker(phase.started_event(), 0).await;

        let storage = self.ops.storage.open(backup_options, workspace).await?;
        let keepalive = reporter.start_keepalive();
        let (sink, forwarder) = reporter.progress_sink();
        let result = self
            .ops
            .backup
            .backup(workspace, storage.as_ref(), full_check, sink, log.clone())
            .await;
        let _ = forwarder.await;
        drop(keepalive);
        if let Err(err) = storage.close().await {
            tracing::warn!(
                workspace = %workspace.workspace,
                error = %err,
                "failed to close storage adapter"
            );
        }

        if result? {
            log.append("backup uploaded");
            reporter.marker(phase.done_event(), 100).await;
        } else {
            tracing::warn!(
                workspace = %workspace.workspace,
                %phase,
                "backup produced no result, leaving workspace for retry"
            );
        }
        Ok(())
    }

    /// Drop a workspace's data after archiving, migration, or deletion.
    async fn clean(
        &self,
        workspace: &WorkspaceInfo,
        reporter: &Arc<ProgressReporter>,
        phase: Phase,
    ) -> WorkerResult<()> {
        // migrate-clean-done is reported at progress 0; the control-plane's
        // migration state machine keys off the event, not the percentage.
        let (done_progress, reindex) = match phase {
            Phase::ArchiveClean => (100, Some(false)),
            Phase::Delete => (100, Some(true)),
            _ => (0, None),
        };

        let log = self.open_log(&workspace.workspace)?;
        reporter.marker(phase.started_event(), 0).await;

        if phase.is_destructive(self.options.migration_cleanup) {
            // Sessions must be gone before the database is dropped.
            if let Err(err) = self.ops.maintenance.force_close(&workspace.workspace).await {
                tracing::warn!(
                    workspace = %workspace.workspace,
                    error = %err,
                    "transactor maintenance failed, proceeding"
                );
            }

            let destroyer = self.ops.destroyers.resolve(&self.options.db_url)?;
            destroyer
                .delete_workspace(&workspace.workspace, workspace.uuid)
                .await?;
            log.append("workspace data deleted");
        }

        if let Some(only_drop) = reindex {
            self.reindex(workspace, only_drop).await;
        }

        reporter.marker(phase.done_event(), done_progress).await;
        Ok(())
    }

    /// Restore a workspace's blob domain from backup storage.
    async fn restore(
        &self,
        workspace: &WorkspaceInfo,
        reporter: &Arc<ProgressReporter>,
    ) -> WorkerResult<()> {
        let backup_options = self
            .options
            .backup
            .as_ref()
            .ok_or(WorkerError::BackupNotConfigured)?;

        let log = self.open_log(&workspace.workspace)?;
        reporter.marker(LifecycleEvent::RestoreStarted, 0).await;

        let storage = self.ops.storage.open(backup_options, workspace).await?;
        let keepalive = reporter.start_keepalive();
        let (sink, forwarder) = reporter.progress_sink();
        let result = self
            .ops
            .backup
            .restore(workspace, storage.as_ref(), sink, log.clone())
            .await;
        let _ = forwarder.await;
        drop(keepalive);
        if let Err(err) = storage.close().await {
            tracing::warn!(
                workspace = %workspace.workspace,
                error = %err,
                "failed to close storage adapter"
            );
        }
        result?;

        self.reindex(workspace, false).await;
        log.append("workspace restored");
        reporter.marker(LifecycleEvent::RestoreDone, 100).await;
        Ok(())
    }

    /// Ask the full-text service to rebuild (or just drop) the workspace's
    /// indexes. Failures are logged and swallowed; reindexing can be retried
    /// out-of-band once the state transition is recorded.
    async fn reindex(&self, workspace: &WorkspaceInfo, only_drop: bool) {
        let Some(fulltext) = &self.ops.fulltext else {
            return;
        };
        if let Err(err) = fulltext.reindex(workspace, only_drop).await {
            tracing::warn!(
                workspace = %workspace.workspace,
                only_drop,
                error = %err,
                "full-text reindex failed"
            );
        }
    }

    fn open_log(&self, workspace: &str) -> WorkerResult<Arc<WorkspaceLog>> {
        WorkspaceLog::open(self.options.console, &self.options.logs_dir, workspace)
    }
}
