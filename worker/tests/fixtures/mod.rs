//! Shared fixtures: a scriptable control-plane mock and recording
//! collaborator implementations.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stevedore_core::{
    AccountClient, Branding, CoreError, CoreResult, LifecycleEvent, RetryStrategy,
    WorkerOperation, WorkspaceInfo, WorkspaceMode, WorkspaceVersion,
};
use stevedore_worker::{
    AdapterRegistry, BackupRunner, DataDestroyer, FulltextIndexer, JobRunner, LifecycleOps,
    LifecycleWorker, ProgressSink, SessionMaintenance, StorageAdapter, StorageFactory,
    WorkerOptions, WorkerResult, WorkspaceInitializer, WorkspaceLog, WorkspaceUpgrader,
};
use uuid::Uuid;

/// One event as the control-plane saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub workspace: String,
    pub event: LifecycleEvent,
    pub progress: u8,
}

/// Scriptable in-process account service.
#[derive(Default)]
pub struct MockAccountClient {
    pending: Mutex<VecDeque<WorkspaceInfo>>,
    events: Mutex<Vec<RecordedEvent>>,
    pub handshakes: AtomicUsize,
    /// Remaining handshake attempts to reject before accepting.
    pub fail_handshakes: AtomicUsize,
    pub polls: AtomicUsize,
}

impl MockAccountClient {
    pub fn push_pending(&self, workspace: WorkspaceInfo) {
        self.pending.lock().push_back(workspace);
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    /// Events recorded for one workspace, as `(wire string, progress)`.
    pub fn events_for(&self, workspace: &str) -> Vec<(&'static str, u8)> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.workspace == workspace)
            .map(|e| (e.event.as_str(), e.progress))
            .collect()
    }
}

#[async_trait]
impl AccountClient for MockAccountClient {
    async fn worker_handshake(
        &self,
        _region: &str,
        _version: WorkspaceVersion,
        _operation: WorkerOperation,
    ) -> CoreResult<()> {
        let remaining = self.fail_handshakes.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_handshakes.store(remaining - 1, Ordering::SeqCst);
            return Err(CoreError::Other("account service unavailable".to_string()));
        }
        self.handshakes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_pending_workspace(
        &self,
        _region: &str,
        _version: WorkspaceVersion,
        _operation: WorkerOperation,
    ) -> CoreResult<Option<WorkspaceInfo>> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        Ok(self.pending.lock().pop_front())
    }

    async fn update_workspace_info(
        &self,
        workspace: &str,
        event: LifecycleEvent,
        _version: WorkspaceVersion,
        progress: u8,
        _message: Option<&str>,
    ) -> CoreResult<()> {
        self.events.lock().push(RecordedEvent {
            workspace: workspace.to_string(),
            event,
            progress,
        });
        Ok(())
    }

    async fn get_transactor_endpoint(&self) -> CoreResult<url::Url> {
        Ok(url::Url::parse("ws://transactor:3333").expect("static url"))
    }
}

/// Initializer that records calls, emits scripted progress, and can fail or
/// hold for concurrency measurements.
pub struct ScriptedInitializer {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
    pub steps: Vec<f64>,
    pub hold: Option<Duration>,
    pub current: AtomicUsize,
    pub max_concurrent: AtomicUsize,
}

impl Default for ScriptedInitializer {
    fn default() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            steps: vec![30.0, 60.0, 90.0],
            hold: None,
            current: AtomicUsize::new(0),
            max_concurrent: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl WorkspaceInitializer for ScriptedInitializer {
    async fn create_workspace(
        &self,
        _workspace: &WorkspaceInfo,
        _branding: Option<&Branding>,
        progress: ProgressSink,
        _log: Arc<WorkspaceLog>,
    ) -> WorkerResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let concurrent = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(concurrent, Ordering::SeqCst);

        if let Some(hold) = self.hold {
            tokio::time::sleep(hold).await;
        }
        for step in &self.steps {
            progress.report(*step);
        }

        self.current.fetch_sub(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(stevedore_worker::WorkerError::Init(
                "seed script exploded".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingUpgrader {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

#[async_trait]
impl WorkspaceUpgrader for RecordingUpgrader {
    async fn upgrade_workspace(
        &self,
        _workspace: &WorkspaceInfo,
        _target: WorkspaceVersion,
        _force: bool,
        progress: ProgressSink,
        _log: Arc<WorkspaceLog>,
    ) -> WorkerResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        progress.report(50.0);
        if self.fail.load(Ordering::SeqCst) {
            return Err(stevedore_worker::WorkerError::Upgrade(
                "migration 42 failed".to_string(),
            ));
        }
        Ok(())
    }
}

/// Storage factory counting open/close pairs for leak checks.
#[derive(Default)]
pub struct CountingStorageFactory {
    pub opened: AtomicUsize,
    pub closed: Arc<AtomicUsize>,
}

pub struct CountingStorageAdapter {
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl StorageFactory for CountingStorageFactory {
    async fn open(
        &self,
        _backup: &stevedore_worker::BackupOptions,
        _workspace: &WorkspaceInfo,
    ) -> WorkerResult<Box<dyn StorageAdapter>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingStorageAdapter {
            closed: self.closed.clone(),
        }))
    }
}

#[async_trait]
impl StorageAdapter for CountingStorageAdapter {
    async fn close(&self) -> WorkerResult<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Backup runner recording `(workspace, full_check)` per run.
pub struct ScriptedBackupRunner {
    pub backups: Mutex<Vec<(String, bool)>>,
    pub restores: Mutex<Vec<String>>,
    /// Value returned from backup runs; `false` models "nothing to record".
    pub result: AtomicBool,
    pub fail: AtomicBool,
}

impl Default for ScriptedBackupRunner {
    fn default() -> Self {
        Self {
            backups: Mutex::new(Vec::new()),
            restores: Mutex::new(Vec::new()),
            result: AtomicBool::new(true),
            fail: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl BackupRunner for ScriptedBackupRunner {
    async fn backup(
        &self,
        workspace: &WorkspaceInfo,
        _storage: &dyn StorageAdapter,
        full_check: bool,
        progress: ProgressSink,
        _log: Arc<WorkspaceLog>,
    ) -> WorkerResult<bool> {
        self.backups
            .lock()
            .push((workspace.workspace.clone(), full_check));
        if self.fail.load(Ordering::SeqCst) {
            return Err(stevedore_worker::WorkerError::Backup(
                "upload interrupted".to_string(),
            ));
        }
        progress.report(40.0);
        progress.report(80.0);
        Ok(self.result.load(Ordering::SeqCst))
    }

    async fn restore(
        &self,
        workspace: &WorkspaceInfo,
        _storage: &dyn StorageAdapter,
        progress: ProgressSink,
        _log: Arc<WorkspaceLog>,
    ) -> WorkerResult<()> {
        self.restores.lock().push(workspace.workspace.clone());
        progress.report(55.0);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingDestroyer {
    pub deleted: Mutex<Vec<(String, Uuid)>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl DataDestroyer for RecordingDestroyer {
    async fn delete_workspace(&self, workspace: &str, uuid: Uuid) -> WorkerResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(stevedore_worker::WorkerError::Destroy(
                "database busy".to_string(),
            ));
        }
        self.deleted.lock().push((workspace.to_string(), uuid));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingMaintenance {
    pub closed: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl SessionMaintenance for RecordingMaintenance {
    async fn force_close(&self, workspace: &str) -> CoreResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CoreError::Other("transactor unreachable".to_string()));
        }
        self.closed.lock().push(workspace.to_string());
        Ok(())
    }
}

/// Full-text mock recording `(workspace, only_drop)`, optionally failing
/// like a 500 from the service.
#[derive(Default)]
pub struct FlakyFulltext {
    pub calls: Mutex<Vec<(String, bool)>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl FulltextIndexer for FlakyFulltext {
    async fn reindex(&self, workspace: &WorkspaceInfo, only_drop: bool) -> CoreResult<()> {
        self.calls
            .lock()
            .push((workspace.workspace.clone(), only_drop));
        if self.fail.load(Ordering::SeqCst) {
            return Err(CoreError::Other(
                "fulltext service returned 500".to_string(),
            ));
        }
        Ok(())
    }
}

/// Bundle of all mocks plus helpers to build runners and workers over them.
pub struct Fixture {
    pub account: Arc<MockAccountClient>,
    pub initializer: Arc<ScriptedInitializer>,
    pub upgrader: Arc<RecordingUpgrader>,
    pub storage: Arc<CountingStorageFactory>,
    pub backup: Arc<ScriptedBackupRunner>,
    pub destroyer: Arc<RecordingDestroyer>,
    pub maintenance: Arc<RecordingMaintenance>,
    pub fulltext: Arc<FlakyFulltext>,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            account: Arc::new(MockAccountClient::default()),
            initializer: Arc::new(ScriptedInitializer::default()),
            upgrader: Arc::new(RecordingUpgrader::default()),
            storage: Arc::new(CountingStorageFactory::default()),
            backup: Arc::new(ScriptedBackupRunner::default()),
            destroyer: Arc::new(RecordingDestroyer::default()),
            maintenance: Arc::new(RecordingMaintenance::default()),
            fulltext: Arc::new(FlakyFulltext::default()),
        }
    }

    pub fn ops(&self) -> LifecycleOps {
        let mut destroyers: AdapterRegistry<dyn DataDestroyer> = AdapterRegistry::new();
        destroyers.register("mongodb", self.destroyer.clone());
        destroyers.register("postgresql", self.destroyer.clone());

        LifecycleOps {
            initializer: self.initializer.clone(),
            upgrader: self.upgrader.clone(),
            storage: self.storage.clone(),
            backup: self.backup.clone(),
            destroyers: Arc::new(destroyers),
            maintenance: self.maintenance.clone(),
            fulltext: Some(self.fulltext.clone()),
        }
    }

    pub fn runner(&self, options: WorkerOptions) -> JobRunner {
        JobRunner::new(Arc::new(options), self.account.clone(), self.ops())
    }

    pub fn worker(&self, options: WorkerOptions) -> LifecycleWorker {
        LifecycleWorker::new(options, self.account.clone(), self.ops())
            .expect("valid test options")
            .with_retry_strategy(RetryStrategy::fixed(Duration::from_millis(1)))
    }
}

/// Test options: console logging, a fast idle sleep, and the migration
/// cleanup gate pinned off regardless of the environment.
pub fn options() -> WorkerOptions {
    let mut options = WorkerOptions::new(
        WorkspaceVersion::new(1, 0, 0),
        WorkerOperation::All,
        "mongodb://localhost:27017",
    )
    .with_wait_timeout(Duration::from_millis(20))
    .with_backup(stevedore_worker::BackupOptions {
        storage_url: "s3://backups".to_string(),
        bucket_name: "workspaces".to_string(),
    });
    options.console = true;
    options.migration_cleanup = false;
    options
}

pub fn workspace(name: &str, mode: WorkspaceMode) -> WorkspaceInfo {
    WorkspaceInfo {
        workspace: name.to_string(),
        uuid: Uuid::new_v4(),
        branding: None,
        version: None,
        mode,
        progress: None,
        disabled: false,
    }
}

/// Install a subscriber so `RUST_LOG=debug cargo test` shows worker output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();
}

/// Poll `condition` until it holds or five seconds pass.
pub async fn wait_for(condition: impl Fn() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 5s");
}
