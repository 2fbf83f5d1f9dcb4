//! Transactor session maintenance.
//!
//! Before a destructive phase the worker asks the serving tier to force-close
//! live sessions to the workspace. The call is best-effort: the transactor
//! may already be down, and the destructive action is authorised regardless,
//! so callers log and ignore failures.

use async_trait::async_trait;
use std::sync::Arc;
use stevedore_core::{AccountClient, CoreError, CoreResult};
use url::Url;

/// Force-closes live sessions to a workspace.
#[async_trait]
pub trait SessionMaintenance: Send + Sync {
    async fn force_close(&self, workspace: &str) -> CoreResult<()>;
}

/// Production implementation talking to the transactor's manage endpoint.
pub struct TransactorMaintenance {
    account: Arc<dyn AccountClient>,
    http: reqwest::Client,
    token: String,
}

impl TransactorMaintenance {
    pub fn new(account: Arc<dyn AccountClient>, token: impl Into<String>) -> Self {
        Self {
            account,
            http: reqwest::Client::new(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl SessionMaintenance for TransactorMaintenance {
    async fn force_close(&self, workspace: &str) -> CoreResult<()> {
        let mut endpoint = self.account.get_transactor_endpoint().await?;
        rewrite_to_http(&mut endpoint)?;
        endpoint.set_path("/api/v1/manage");
        endpoint
            .query_pairs_mut()
            .append_pair("token", &self.token)
            .append_pair("operation", "force-close");

        tracing::debug!(workspace, endpoint = %endpoint.as_str(), "force-closing sessions");
        self.http
            .put(endpoint)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Rewrite a `ws(s)://` transactor endpoint to its `http(s)://` form.
fn rewrite_to_http(url: &mut Url) -> CoreResult<()> {
    let scheme = match url.scheme() {
        "ws" => "http",
        "wss" => "https",
        _ => return Ok(()),
    };
    url.set_scheme(scheme)
        .map_err(|_| CoreError::Other(format!("cannot rewrite scheme of '{url}'")))
}
