//! Control-plane (account service) client.
//!
//! The account service is the authority that tracks every workspace's mode
//! and version and hands out pending workspaces to workers. The worker only
//! ever talks to it through the [`AccountClient`] trait; the production
//! implementation is [`HttpAccountClient`].

mod http;

pub use http::HttpAccountClient;

use crate::error::CoreResult;
use crate::event::LifecycleEvent;
use crate::operation::WorkerOperation;
use crate::version::WorkspaceVersion;
use crate::workspace::WorkspaceInfo;
use async_trait::async_trait;
use url::Url;

/// Client for the account service.
///
/// All methods are idempotent from the worker's point of view: the handshake
/// may be repeated, a pending workspace is handed out at most once, and event
/// updates for the same `(workspace, event, progress)` converge.
#[async_trait]
pub trait AccountClient: Send + Sync {
    /// Announce this worker's region, version, and operation capability.
    ///
    /// A successful handshake means the control-plane knows about this
    /// worker; it does not imply any work is available.
    async fn worker_handshake(
        &self,
        region: &str,
        version: WorkspaceVersion,
        operation: WorkerOperation,
    ) -> CoreResult<()>;

    /// Request one pending workspace matching the worker's capabilities.
    async fn get_pending_workspace(
        &self,
        region: &str,
        version: WorkspaceVersion,
        operation: WorkerOperation,
    ) -> CoreResult<Option<WorkspaceInfo>>;

    /// Report a lifecycle event for a workspace.
    async fn update_workspace_info(
        &self,
        workspace: &str,
        event: LifecycleEvent,
        version: WorkspaceVersion,
        progress: u8,
        message: Option<&str>,
    ) -> CoreResult<()>;

    /// Fetch the endpoint of the transactor currently serving sessions.
    async fn get_transactor_endpoint(&self) -> CoreResult<Url>;
}
