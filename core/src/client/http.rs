//! HTTP implementation of the account service client.

use crate::client::AccountClient;
use crate::error::{CoreError, CoreResult};
use crate::event::LifecycleEvent;
use crate::operation::WorkerOperation;
use crate::version::WorkspaceVersion;
use crate::workspace::WorkspaceInfo;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

/// HTTP client for the account service.
///
/// Calls are JSON POSTs to the service URL with a `{method, params}` body and
/// a bearer token; responses carry either a `result` or an `error` envelope.
#[derive(Debug, Clone)]
pub struct HttpAccountClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

/// Request body for an account service call.
#[derive(Debug, Serialize)]
struct RpcRequest<'a, P: Serialize> {
    method: &'a str,
    params: P,
}

/// Response envelope from the account service.
#[derive(Debug, Deserialize)]
struct RpcEnvelope<R> {
    result: Option<R>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    message: String,
}

impl HttpAccountClient {
    /// Create a new client for the account service at `base_url`.
    pub fn new(base_url: Url, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            token: token.into(),
        }
    }

    /// Use a custom reqwest client (timeouts, proxies, connection pools).
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// The worker token this client authenticates with.
    pub fn token(&self) -> &str {
        &self.token
    }

    async fn call<P, R>(&self, method: &str, params: P) -> CoreResult<Option<R>>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let response = self
            .http
            .post(self.base_url.clone())
            .bearer_auth(&self.token)
            .json(&RpcRequest { method, params })
            .send()
            .await?
            .error_for_status()?;

        let envelope: RpcEnvelope<R> = response.json().await?;
        if let Some(error) = envelope.error {
            return Err(CoreError::Account {
                method: method.to_string(),
                message: error.message,
            });
        }
        Ok(envelope.result)
    }
}

#[async_trait]
impl AccountClient for HttpAccountClient {
    async fn worker_handshake(
        &self,
        region: &str,
        version: WorkspaceVersion,
        operation: WorkerOperation,
    ) -> CoreResult<()> {
        let host = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        self.call::<_, serde_json::Value>(
            "workerHandshake",
            serde_json::json!({
                "region": region,
                "version": version.to_string(),
                "operation": operation.as_str(),
                "host": host,
            }),
        )
        .await?;
        Ok(())
    }

    async fn get_pending_workspace(
        &self,
        region: &str,
        version: WorkspaceVersion,
        operation: WorkerOperation,
    ) -> CoreResult<Option<WorkspaceInfo>> {
        self.call(
            "getPendingWorkspace",
            serde_json::json!({
                "region": region,
                "version": version.to_string(),
                "operation": operation.as_str(),
            }),
        )
        .await
    }

    async fn update_workspace_info(
        &self,
        workspace: &str,
        event: LifecycleEvent,
        version: WorkspaceVersion,
        progress: u8,
        message: Option<&str>,
    ) -> CoreResult<()> {
        self.call::<_, serde_json::Value>(
            "updateWorkspaceInfo",
            serde_json::json!({
                "workspace": workspace,
                "event": event.as_str(),
                "version": version.to_string(),
                "progress": progress,
                "message": message,
            }),
        )
        .await?;
        Ok(())
    }

    async fn get_transactor_endpoint(&self) -> CoreResult<Url> {
        let endpoint: String = self
            .call("getTransactorEndpoint", serde_json::json!({}))
            .await?
            .ok_or_else(|| CoreError::Account {
                method: "getTransactorEndpoint".to_string(),
                message: "missing result".to_string(),
            })?;
        Ok(Url::parse(&endpoint)?)
    }
}
