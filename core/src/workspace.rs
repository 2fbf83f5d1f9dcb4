//! Workspace snapshots and the lifecycle mode union

use crate::version::WorkspaceVersion;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Durable lifecycle state of a workspace, as observed from the control-plane.
///
/// The union is closed over the modes the dispatcher recognizes; any other
/// wire value lands in [`WorkspaceMode::Unknown`] so a snapshot with a novel
/// mode still deserializes and can be logged and skipped instead of failing
/// the poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WorkspaceMode {
    PendingCreation,
    Creating,
    Upgrading,
    Active,
    ArchivingPendingBackup,
    ArchivingBackup,
    ArchivingPendingClean,
    ArchivingClean,
    MigrationPendingBackup,
    MigrationBackup,
    MigrationPendingClean,
    MigrationClean,
    PendingRestore,
    Restoring,
    PendingDeletion,
    Deleting,
    /// A mode this worker does not recognize; carries the wire value
    Unknown(String),
}

impl WorkspaceMode {
    /// Workspace is somewhere in the archive pipeline
    pub fn is_archiving(&self) -> bool {
        matches!(
            self,
            WorkspaceMode::ArchivingPendingBackup
                | WorkspaceMode::ArchivingBackup
                | WorkspaceMode::ArchivingPendingClean
                | WorkspaceMode::ArchivingClean
        )
    }

    /// Workspace is somewhere in the migration pipeline
    pub fn is_migrating(&self) -> bool {
        matches!(
            self,
            WorkspaceMode::MigrationPendingBackup
                | WorkspaceMode::MigrationBackup
                | WorkspaceMode::MigrationPendingClean
                | WorkspaceMode::MigrationClean
        )
    }

    /// Workspace is being restored from a backup
    pub fn is_restoring(&self) -> bool {
        matches!(
            self,
            WorkspaceMode::PendingRestore | WorkspaceMode::Restoring
        )
    }
}

impl Default for WorkspaceMode {
    // A snapshot without a mode is a served workspace.
    fn default() -> Self {
        WorkspaceMode::Active
    }
}

impl From<String> for WorkspaceMode {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending-creation" => WorkspaceMode::PendingCreation,
            "creating" => WorkspaceMode::Creating,
            "upgrading" => WorkspaceMode::Upgrading,
            "active" => WorkspaceMode::Active,
            "archiving-pending-backup" => WorkspaceMode::ArchivingPendingBackup,
            "archiving-backup" => WorkspaceMode::ArchivingBackup,
            "archiving-pending-clean" => WorkspaceMode::ArchivingPendingClean,
            "archiving-clean" => WorkspaceMode::ArchivingClean,
            "migration-pending-backup" => WorkspaceMode::MigrationPendingBackup,
            "migration-backup" => WorkspaceMode::MigrationBackup,
            "migration-pending-clean" => WorkspaceMode::MigrationPendingClean,
            "migration-clean" => WorkspaceMode::MigrationClean,
            "pending-restore" => WorkspaceMode::PendingRestore,
            "restoring" => WorkspaceMode::Restoring,
            "pending-deletion" => WorkspaceMode::PendingDeletion,
            "deleting" => WorkspaceMode::Deleting,
            _ => WorkspaceMode::Unknown(s),
        }
    }
}

impl From<WorkspaceMode> for String {
    fn from(mode: WorkspaceMode) -> Self {
        mode.to_string()
    }
}

impl fmt::Display for WorkspaceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkspaceMode::PendingCreation => "pending-creation",
            WorkspaceMode::Creating => "creating",
            WorkspaceMode::Upgrading => "upgrading",
            WorkspaceMode::Active => "active",
            WorkspaceMode::ArchivingPendingBackup => "archiving-pending-backup",
            WorkspaceMode::ArchivingBackup => "archiving-backup",
            WorkspaceMode::ArchivingPendingClean => "archiving-pending-clean",
            WorkspaceMode::ArchivingClean => "archiving-clean",
            WorkspaceMode::MigrationPendingBackup => "migration-pending-backup",
            WorkspaceMode::MigrationBackup => "migration-backup",
            WorkspaceMode::MigrationPendingClean => "migration-pending-clean",
            WorkspaceMode::MigrationClean => "migration-clean",
            WorkspaceMode::PendingRestore => "pending-restore",
            WorkspaceMode::Restoring => "restoring",
            WorkspaceMode::PendingDeletion => "pending-deletion",
            WorkspaceMode::Deleting => "deleting",
            WorkspaceMode::Unknown(s) => s.as_str(),
        };
        f.write_str(s)
    }
}

/// Snapshot of a workspace as handed out by the control-plane.
///
/// Never mutated locally; progress and mode changes are reported back as
/// lifecycle events and the control-plane owns the durable state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceInfo {
    /// Workspace identifier (tenant-unique name)
    pub workspace: String,
    /// Opaque workspace uuid
    pub uuid: Uuid,
    /// Branding profile name, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branding: Option<String>,
    /// Data-model version the workspace was last brought to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<WorkspaceVersion>,
    /// Current lifecycle mode; absent means the workspace is served
    #[serde(default)]
    pub mode: WorkspaceMode,
    /// Last reported progress (0-100) within the current phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    /// Workspace is administratively disabled
    #[serde(default)]
    pub disabled: bool,
}

/// Branding profile applied when a workspace is created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branding {
    /// Default content language for seed data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Name of the init script/profile used to seed the workspace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_workspace: Option<String>,
}
