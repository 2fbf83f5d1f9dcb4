//! Full-text reindex calls.

use async_trait::async_trait;
use stevedore_core::{CoreResult, WorkspaceInfo};
use url::Url;

/// Drops and optionally rebuilds a workspace's full-text indexes.
///
/// Callers swallow failures: the workspace state transition has already
/// happened and reindexing can be retried out-of-band.
#[async_trait]
pub trait FulltextIndexer: Send + Sync {
    async fn reindex(&self, workspace: &WorkspaceInfo, only_drop: bool) -> CoreResult<()>;
}

/// Production implementation talking to the full-text service.
pub struct HttpFulltextIndexer {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl HttpFulltextIndexer {
    pub fn new(base_url: Url, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            token: token.into(),
        }
    }
}

#[async_trait]
impl FulltextIndexer for HttpFulltextIndexer {
    async fn reindex(&self, workspace: &WorkspaceInfo, only_drop: bool) -> CoreResult<()> {
        let mut endpoint = self.base_url.clone();
        endpoint.set_path("/api/v1/reindex");

        tracing::debug!(
            workspace = %workspace.workspace,
            only_drop,
            "requesting full-text reindex"
        );
        self.http
            .put(endpoint)
            .json(&serde_json::json!({
                "token": self.token,
                "onlyDrop": only_drop,
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
