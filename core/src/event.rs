//! Lifecycle event vocabulary reported to the control-plane

use serde::{Deserialize, Serialize};

/// Progress marker sent with `updateWorkspaceInfo`.
///
/// The control-plane drives its workspace state machine forward from these
/// events, so the wire strings are part of the protocol and must not drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleEvent {
    Ping,
    Progress,
    CreateStarted,
    CreateDone,
    UpgradeStarted,
    UpgradeDone,
    ArchivingBackupStarted,
    ArchivingBackupDone,
    ArchivingCleanStarted,
    ArchivingCleanDone,
    DeleteStarted,
    DeleteDone,
    MigrateBackupStarted,
    MigrateBackupDone,
    MigrateCleanStarted,
    MigrateCleanDone,
    RestoreStarted,
    RestoreDone,
}

impl LifecycleEvent {
    /// Wire string for this event
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleEvent::Ping => "ping",
            LifecycleEvent::Progress => "progress",
            LifecycleEvent::CreateStarted => "create-started",
            LifecycleEvent::CreateDone => "create-done",
            LifecycleEvent::UpgradeStarted => "upgrade-started",
            LifecycleEvent::UpgradeDone => "upgrade-done",
            LifecycleEvent::ArchivingBackupStarted => "archiving-backup-started",
            LifecycleEvent::ArchivingBackupDone => "archiving-backup-done",
            LifecycleEvent::ArchivingCleanStarted => "archiving-clean-started",
            LifecycleEvent::ArchivingCleanDone => "archiving-clean-done",
            LifecycleEvent::DeleteStarted => "delete-started",
            LifecycleEvent::DeleteDone => "delete-done",
            LifecycleEvent::MigrateBackupStarted => "migrate-backup-started",
            LifecycleEvent::MigrateBackupDone => "migrate-backup-done",
            LifecycleEvent::MigrateCleanStarted => "migrate-clean-started",
            LifecycleEvent::MigrateCleanDone => "migrate-clean-done",
            LifecycleEvent::RestoreStarted => "restore-started",
            LifecycleEvent::RestoreDone => "restore-done",
        }
    }
}

impl std::fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
