//! Routing from observed workspace modes to phase handlers.

use stevedore_core::{LifecycleEvent, WorkspaceMode};

/// A single lifecycle transition the worker can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Create,
    Upgrade,
    ArchiveBackup,
    ArchiveClean,
    MigrateBackup,
    MigrateClean,
    Restore,
    Delete,
}

impl Phase {
    /// Select the phase for an observed workspace mode.
    ///
    /// Returns `None` for modes this worker does not recognize; the caller
    /// logs and skips the workspace.
    pub fn for_mode(mode: &WorkspaceMode) -> Option<Phase> {
        match mode {
            WorkspaceMode::PendingCreation | WorkspaceMode::Creating => Some(Phase::Create),
            WorkspaceMode::Upgrading | WorkspaceMode::Active => Some(Phase::Upgrade),
            WorkspaceMode::ArchivingPendingBackup | WorkspaceMode::ArchivingBackup => {
                Some(Phase::ArchiveBackup)
            }
            WorkspaceMode::ArchivingPendingClean | WorkspaceMode::ArchivingClean => {
                Some(Phase::ArchiveClean)
            }
            WorkspaceMode::MigrationPendingBackup | WorkspaceMode::MigrationBackup => {
                Some(Phase::MigrateBackup)
            }
            WorkspaceMode::MigrationPendingClean | WorkspaceMode::MigrationClean => {
                Some(Phase::MigrateClean)
            }
            WorkspaceMode::PendingRestore | WorkspaceMode::Restoring => Some(Phase::Restore),
            WorkspaceMode::PendingDeletion | WorkspaceMode::Deleting => Some(Phase::Delete),
            WorkspaceMode::Unknown(_) => None,
        }
    }

    /// Whether this phase drops workspace data and therefore needs live
    /// sessions force-closed first.
    pub fn is_destructive(&self, migration_cleanup: bool) -> bool {
        match self {
            Phase::ArchiveClean | Phase::Delete => true,
            Phase::MigrateClean => migration_cleanup,
            _ => false,
        }
    }

    /// Event emitted when the phase starts.
    pub fn started_event(&self) -> LifecycleEvent {
        match self {
            Phase::Create => LifecycleEvent::CreateStarted,
            Phase::Upgrade => LifecycleEvent::UpgradeStarted,
            Phase::ArchiveBackup => LifecycleEvent::ArchivingBackupStarted,
            Phase::ArchiveClean => LifecycleEvent::ArchivingCleanStarted,
            Phase::MigrateBackup => LifecycleEvent::MigrateBackupStarted,
            Phase::MigrateClean => LifecycleEvent::MigrateCleanStarted,
            Phase::Restore => LifecycleEvent::RestoreStarted,
            Phase::Delete => LifecycleEvent::DeleteStarted,
        }
    }

    /// Event emitted when the phase completes successfully.
    pub fn done_event(&self) -> LifecycleEvent {
        match self {
            Phase::Create => LifecycleEvent::CreateDone,
            Phase::Upgrade => LifecycleEvent::UpgradeDone,
            Phase::ArchiveBackup => LifecycleEvent::ArchivingBackupDone,
            Phase::ArchiveClean => LifecycleEvent::ArchivingCleanDone,
            Phase::MigrateBackup => LifecycleEvent::MigrateBackupDone,
            Phase::MigrateClean => LifecycleEvent::MigrateCleanDone,
            Phase::Restore => LifecycleEvent::RestoreDone,
            Phase::Delete => LifecycleEvent::DeleteDone,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Create => "create",
            Phase::Upgrade => "upgrade",
            Phase::ArchiveBackup => "archiving-backup",
            Phase::ArchiveClean => "archiving-clean",
            Phase::MigrateBackup => "migrate-backup",
            Phase::MigrateClean => "migrate-clean",
            Phase::Restore => "restore",
            Phase::Delete => "delete",
        };
        f.write_str(name)
    }
}
