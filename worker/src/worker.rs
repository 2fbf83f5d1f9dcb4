//! The worker control loop.
//!
//! One [`LifecycleWorker`] per process: it announces itself to the
//! control-plane, then loops fetching one pending workspace at a time and
//! dispatching it to a phase handler, with at most `limit` jobs in flight.
//! A job failing never terminates the loop; the worker exits only on
//! external cancellation, after draining jobs already in flight.

use crate::config::WorkerOptions;
use crate::error::{WorkerError, WorkerResult};
use crate::gate::{ConcurrencyGate, JobSlot};
use crate::handlers::JobRunner;
use crate::idle::Wakeup;
use crate::ops::LifecycleOps;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use stevedore_core::{retry_until_ok, AccountClient, RetryStrategy, WorkspaceInfo};
use tokio::sync::watch;

/// Hook invoked for every error swallowed at the job boundary.
pub type JobErrorHandler = Arc<dyn Fn(&WorkspaceInfo, &WorkerError) + Send + Sync>;

/// The workspace lifecycle worker.
pub struct LifecycleWorker {
    options: Arc<WorkerOptions>,
    client: Arc<dyn AccountClient>,
    runner: Arc<JobRunner>,
    gate: ConcurrencyGate,
    wakeup: Wakeup,
    running: Arc<AtomicBool>,
    in_flight: Arc<Mutex<HashSet<String>>>,
    shutdown_rx: Option<watch::Receiver<bool>>,
    on_job_error: Option<JobErrorHandler>,
    retry: RetryStrategy,
}

impl LifecycleWorker {
    /// Create a worker from validated options and its collaborator set.
    pub fn new(
        options: WorkerOptions,
        client: Arc<dyn AccountClient>,
        ops: LifecycleOps,
    ) -> WorkerResult<Self> {
        options
            .validate()
            .map_err(|err| WorkerError::Config(err.to_string()))?;

        let wakeup = Wakeup::new();
        let gate = ConcurrencyGate::new(options.limit, wakeup.clone());
        let options = Arc::new(options);
        tracing::debug!(
            schemes = ?ops.destroyers.schemes(),
            fulltext = ops.fulltext.is_some(),
            "collaborators registered"
        );
        let runner = Arc::new(JobRunner::new(options.clone(), client.clone(), ops));

        Ok(Self {
            options,
            client,
            runner,
            gate,
            wakeup,
            running: Arc::new(AtomicBool::new(false)),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            shutdown_rx: None,
            on_job_error: None,
            retry: RetryStrategy::default(),
        })
    }

    /// Set an external shutdown signal. Writing `true` to the paired sender
    /// stops the loop promptly, even while it is parked on the gate.
    pub fn with_shutdown_signal(mut self, rx: watch::Receiver<bool>) -> Self {
        self.shutdown_rx = Some(rx);
        self
    }

    /// Set the hook receiving every error swallowed at the job boundary.
    pub fn with_job_error_handler(mut self, handler: JobErrorHandler) -> Self {
        self.on_job_error = Some(handler);
        self
    }

    /// Override the retry strategy for handshake and polling.
    pub fn with_retry_strategy(mut self, retry: RetryStrategy) -> Self {
        self.retry = retry;
        self
    }

    /// Whether the loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Number of jobs currently in flight.
    pub fn running_jobs(&self) -> usize {
        self.gate.running()
    }

    /// Wake-up handle for the idle sleep, for external nudges.
    pub fn wakeup(&self) -> Wakeup {
        self.wakeup.clone()
    }

    /// Request the loop to stop. Jobs already in flight are not interrupted;
    /// `run` returns once they drain. Without a shutdown signal the request
    /// is observed at the next loop iteration, so a worker parked on a
    /// saturated gate reacts when the next slot frees.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.wakeup.fire();
    }

    /// Run the worker until cancelled.
    ///
    /// Blocks on the handshake first; the worker does not accept work until
    /// the control-plane has acknowledged its capabilities.
    pub async fn run(&self) -> WorkerResult<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(WorkerError::Other("worker already running".to_string()));
        }

        retry_until_ok(&self.retry, "worker handshake", || {
            self.client.worker_handshake(
                &self.options.region,
                self.options.version,
                self.options.operation,
            )
        })
        .await;

        tracing::info!(
            region = %self.options.region,
            version = %self.options.version,
            operation = %self.options.operation,
            limit = self.options.limit,
            "worker registered, accepting work"
        );

        let mut shutdown_rx = self.shutdown_rx.clone();
        while self.is_running() {
            let slot = tokio::select! {
                slot = self.gate.acquire() => slot?,
                _ = shutdown_requested(&mut shutdown_rx) => break,
            };
            if !self.is_running() {
                break;
            }

            // Poll errors are logged and treated as "nothing pending"; they
            // must not terminate the loop.
            let pending = match self
                .client
                .get_pending_workspace(
                    &self.options.region,
                    self.options.version,
                    self.options.operation,
                )
                .await
            {
                Ok(pending) => pending,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to fetch pending workspace");
                    None
                }
            };

            match pending {
                Some(workspace) => self.spawn_job(workspace, slot),
                None => {
                    drop(slot);
                    tokio::select! {
                        _ = self.wakeup.sleep(self.options.wait_timeout) => {}
                        _ = shutdown_requested(&mut shutdown_rx) => break,
                    }
                }
            }
        }

        // Jobs already in flight complete or fail naturally.
        self.gate.wait_idle().await;
        self.running.store(false, Ordering::SeqCst);
        tracing::info!("worker stopped");
        Ok(())
    }

    /// Dispatch a workspace job without awaiting it.
    fn spawn_job(&self, workspace: WorkspaceInfo, slot: JobSlot) {
        let Some(in_flight) = InFlightGuard::claim(&self.in_flight, &workspace.workspace) else {
            // The control-plane should hand out a workspace once; dropping
            // the slot releases it for the next poll.
            tracing::warn!(
                workspace = %workspace.workspace,
                "workspace already in flight, skipping"
            );
            return;
        };

        // A completed job frees capacity; waking the idle sleep lets the
        // poller pick up the next workspace without waiting out the timeout.
        slot.arm_wakeup();

        let runner = self.runner.clone();
        let on_job_error = self.on_job_error.clone();
        tokio::spawn(async move {
            let _slot = slot;
            let _in_flight = in_flight;
            if let Err(err) = runner.run(&workspace).await {
                // One poisoned workspace must never halt the fleet.
                if let Some(handler) = &on_job_error {
                    handler(&workspace, &err);
                }
                tracing::error!(
                    workspace = %workspace.workspace,
                    error = %err,
                    "workspace job failed"
                );
            }
        });
    }
}

/// Marks a workspace as in flight; the mark clears when the guard drops.
struct InFlightGuard {
    set: Arc<Mutex<HashSet<String>>>,
    workspace: String,
}

impl InFlightGuard {
    fn claim(set: &Arc<Mutex<HashSet<String>>>, workspace: &str) -> Option<Self> {
        if !set.lock().insert(workspace.to_string()) {
            return None;
        }
        Some(Self {
            set: set.clone(),
            workspace: workspace.to_string(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.lock().remove(&self.workspace);
    }
}

/// Resolves when the shutdown signal reads `true`; pends forever otherwise.
async fn shutdown_requested(rx: &mut Option<watch::Receiver<bool>>) {
    match rx {
        Some(rx) => loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender dropped without signalling; treat as never.
                std::future::pending::<()>().await;
            }
        },
        None => std::future::pending().await,
    }
}
