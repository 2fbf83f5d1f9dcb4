//! Worker operation capabilities announced during the handshake

use std::str::FromStr;

/// The set of lifecycle phases a worker is willing to perform.
///
/// The control-plane hands a pending workspace only to a worker whose
/// declared operation covers the workspace's current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOperation {
    /// Only workspace creation
    Create,
    /// Only model upgrades
    Upgrade,
    /// Every phase except those needing backup storage
    All,
    /// Every phase, including backup-backed archive/migrate/restore
    AllWithBackup,
}

impl WorkerOperation {
    /// Wire string sent to the control-plane
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerOperation::Create => "create",
            WorkerOperation::Upgrade => "upgrade",
            WorkerOperation::All => "all",
            WorkerOperation::AllWithBackup => "all+backup",
        }
    }

    /// Whether this capability includes backup-backed phases
    pub fn includes_backup(&self) -> bool {
        matches!(self, WorkerOperation::AllWithBackup)
    }
}

impl std::fmt::Display for WorkerOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WorkerOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(WorkerOperation::Create),
            "upgrade" => Ok(WorkerOperation::Upgrade),
            "all" => Ok(WorkerOperation::All),
            "all+backup" => Ok(WorkerOperation::AllWithBackup),
            other => Err(format!("unknown worker operation: '{}'", other)),
        }
    }
}
