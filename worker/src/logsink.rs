//! Per-workspace log sinks.

use crate::error::WorkerResult;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Destination for a phase's per-workspace log lines.
///
/// Either the process log (when running with `console=true`) or an appended
/// file at `<logs>/<workspace>.log`. Write failures are swallowed: losing a
/// log line must never fail a phase.
pub struct WorkspaceLog {
    workspace: String,
    target: LogTarget,
}

enum LogTarget {
    Console,
    File(Mutex<File>),
}

impl WorkspaceLog {
    /// Open a sink for `workspace` according to the configured destination.
    pub fn open(console: bool, logs_dir: &Path, workspace: &str) -> WorkerResult<Arc<Self>> {
        if console {
            return Ok(Arc::new(Self {
                workspace: workspace.to_string(),
                target: LogTarget::Console,
            }));
        }

        std::fs::create_dir_all(logs_dir)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(logs_dir.join(format!("{workspace}.log")))?;
        Ok(Arc::new(Self {
            workspace: workspace.to_string(),
            target: LogTarget::File(Mutex::new(file)),
        }))
    }

    /// Append one line to the sink.
    pub fn append(&self, line: &str) {
        match &self.target {
            LogTarget::Console => {
                tracing::info!(workspace = %self.workspace, "{line}");
            }
            LogTarget::File(file) => {
                let stamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f");
                let mut file = file.lock();
                if let Err(err) = writeln!(file, "{stamp} {line}") {
                    tracing::warn!(
                        workspace = %self.workspace,
                        error = %err,
                        "failed to append workspace log line"
                    );
                }
            }
        }
    }
}
