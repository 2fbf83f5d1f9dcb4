//! Progress reporting for long-running phases.
//!
//! A [`ProgressReporter`] owns the `(client, workspace, version)` triple for
//! one job and funnels every event the job emits: phase markers, debounced
//! progress percentages, and the periodic keepalive ping.

use std::sync::atomic::{AtomicI16, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stevedore_core::{retry_within, AccountClient, LifecycleEvent, RetryStrategy, WorkspaceVersion};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Interval between keepalive pings during a long-running phase.
pub const PING_INTERVAL: Duration = Duration::from_secs(5);

/// Retry budget for a single progress/ping update. Once exhausted the update
/// is dropped; the next event supersedes it.
pub const UPDATE_BUDGET: Duration = Duration::from_secs(5);

/// Debounced, monotone progress reporting for one `(workspace, phase)` run.
pub struct ProgressReporter {
    client: Arc<dyn AccountClient>,
    workspace: String,
    version: WorkspaceVersion,
    retry: RetryStrategy,
    /// Latest observed progress, carried by keepalive pings.
    latest: AtomicU8,
    /// Last emitted rounded percent; -1 until the first emission.
    last_sent: AtomicI16,
}

impl ProgressReporter {
    pub fn new(
        client: Arc<dyn AccountClient>,
        workspace: impl Into<String>,
        version: WorkspaceVersion,
    ) -> Self {
        Self {
            client,
            workspace: workspace.into(),
            version,
            retry: RetryStrategy::default(),
            latest: AtomicU8::new(0),
            last_sent: AtomicI16::new(-1),
        }
    }

    /// Override the retry strategy used for updates. Mostly useful in tests.
    pub fn with_retry_strategy(mut self, retry: RetryStrategy) -> Self {
        self.retry = retry;
        self
    }

    /// Latest progress value observed by this reporter.
    pub fn latest(&self) -> u8 {
        self.latest.load(Ordering::SeqCst)
    }

    /// Emit a phase marker (`*-started`, `*-done`) at the given progress.
    pub async fn marker(&self, event: LifecycleEvent, progress: u8) {
        let progress = progress.min(100);
        self.latest.store(progress, Ordering::SeqCst);
        self.last_sent.store(progress as i16, Ordering::SeqCst);
        self.send(event, progress).await;
    }

    /// Report a progress percentage.
    ///
    /// The value is rounded to an integer percent and emitted only when the
    /// rounded value exceeds the last emitted one, keeping the emitted
    /// sequence monotone and flood-free.
    pub async fn report(&self, pct: f64) {
        let rounded = pct.round().clamp(0.0, 100.0) as u8;
        if rounded as i16 <= self.last_sent.load(Ordering::SeqCst) {
            return;
        }
        self.last_sent.store(rounded as i16, Ordering::SeqCst);
        self.latest.store(rounded, Ordering::SeqCst);
        self.send(LifecycleEvent::Progress, rounded).await;
    }

    /// Send a keepalive ping carrying the latest observed progress.
    pub async fn ping(&self) {
        self.send(LifecycleEvent::Ping, self.latest()).await;
    }

    /// Start the periodic keepalive. The returned guard aborts the ping task
    /// when dropped, which happens on every exit path of a phase handler.
    pub fn start_keepalive(self: &Arc<Self>) -> Keepalive {
        let reporter = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(PING_INTERVAL).await;
                reporter.ping().await;
            }
        });
        Keepalive { handle }
    }

    /// Open a progress sink for an external operation.
    ///
    /// The sink is a cheap clonable handle the operation can report through
    /// without awaiting; a forwarder task drains it into [`Self::report`].
    /// Await the returned handle after the operation completes to flush any
    /// queued reports before emitting the terminal marker.
    pub fn progress_sink(self: &Arc<Self>) -> (ProgressSink, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let reporter = Arc::clone(self);
        let handle = tokio::spawn(async move {
            while let Some(pct) = rx.recv().await {
                reporter.report(pct).await;
            }
        });
        (ProgressSink { tx }, handle)
    }

    async fn send(&self, event: LifecycleEvent, progress: u8) {
        let result = retry_within(&self.retry, UPDATE_BUDGET, "workspace event update", || {
            self.client
                .update_workspace_info(&self.workspace, event, self.version, progress, None)
        })
        .await;

        if let Err(err) = result {
            // Dropped; the next event supersedes this one.
            tracing::warn!(
                workspace = %self.workspace,
                event = %event,
                error = %err,
                "failed to report workspace event"
            );
        }
    }
}

/// Guard for the keepalive task. Dropping it stops the pings.
pub struct Keepalive {
    handle: JoinHandle<()>,
}

impl Drop for Keepalive {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Clonable handle external operations report progress through.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: mpsc::UnboundedSender<f64>,
}

impl ProgressSink {
    /// Report a progress percentage (0-100). Never blocks.
    pub fn report(&self, pct: f64) {
        let _ = self.tx.send(pct);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use stevedore_core::{CoreError, CoreResult, WorkerOperation, WorkspaceInfo};

    #[derive(Default)]
    struct CountingClient {
        updates: Mutex<Vec<(LifecycleEvent, u8)>>,
        fail: std::sync::atomic::AtomicBool,
    }

    impl CountingClient {
        fn updates(&self) -> Vec<(LifecycleEvent, u8)> {
            self.updates.lock().clone()
        }
    }

    #[async_trait]
    impl AccountClient for CountingClient {
        async fn worker_handshake(
            &self,
            _region: &str,
            _version: WorkspaceVersion,
            _operation: WorkerOperation,
        ) -> CoreResult<()> {
            Ok(())
        }

        async fn get_pending_workspace(
            &self,
            _region: &str,
            _version: WorkspaceVersion,
            _operation: WorkerOperation,
        ) -> CoreResult<Option<WorkspaceInfo>> {
            Ok(None)
        }

        async fn update_workspace_info(
            &self,
            _workspace: &str,
            event: LifecycleEvent,
            _version: WorkspaceVersion,
            progress: u8,
            _message: Option<&str>,
        ) -> CoreResult<()> {
            if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(CoreError::Other("control-plane down".to_string()));
            }
            self.updates.lock().push((event, progress));
            Ok(())
        }

        async fn get_transactor_endpoint(&self) -> CoreResult<url::Url> {
            Ok(url::Url::parse("ws://transactor:3333").unwrap())
        }
    }

    fn reporter(client: &Arc<CountingClient>) -> Arc<ProgressReporter> {
        Arc::new(
            ProgressReporter::new(
                client.clone() as Arc<dyn AccountClient>,
                "w1",
                WorkspaceVersion::new(1, 0, 0),
            )
            .with_retry_strategy(RetryStrategy::fixed(Duration::from_millis(1))),
        )
    }

    #[tokio::test]
    async fn test_same_rounded_percent_emits_once() {
        let client = Arc::new(CountingClient::default());
        let reporter = reporter(&client);

        reporter.report(42.2).await;
        reporter.report(42.4).await;
        reporter.report(41.9).await;

        assert_eq!(client.updates(), vec![(LifecycleEvent::Progress, 42)]);
    }

    #[tokio::test]
    async fn test_progress_is_monotone() {
        let client = Arc::new(CountingClient::default());
        let reporter = reporter(&client);

        reporter.report(10.0).await;
        reporter.report(5.0).await;
        reporter.report(20.0).await;

        assert_eq!(
            client.updates(),
            vec![
                (LifecycleEvent::Progress, 10),
                (LifecycleEvent::Progress, 20)
            ]
        );
    }

    #[tokio::test]
    async fn test_marker_resets_progress_floor() {
        let client = Arc::new(CountingClient::default());
        let reporter = reporter(&client);

        reporter.marker(LifecycleEvent::CreateStarted, 0).await;
        reporter.report(0.2).await; // rounds to 0, already emitted
        reporter.report(1.0).await;

        assert_eq!(
            client.updates(),
            vec![
                (LifecycleEvent::CreateStarted, 0),
                (LifecycleEvent::Progress, 1)
            ]
        );
    }

    #[tokio::test]
    async fn test_ping_carries_latest_progress() {
        let client = Arc::new(CountingClient::default());
        let reporter = reporter(&client);

        reporter.report(37.0).await;
        reporter.ping().await;

        assert_eq!(
            client.updates(),
            vec![(LifecycleEvent::Progress, 37), (LifecycleEvent::Ping, 37)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_keepalive_pings_periodically_and_stops_on_drop() {
        let client = Arc::new(CountingClient::default());
        let reporter = reporter(&client);

        let keepalive = reporter.start_keepalive();
        tokio::time::sleep(Duration::from_secs(11)).await;
        drop(keepalive);

        let pings = client
            .updates()
            .iter()
            .filter(|(event, _)| *event == LifecycleEvent::Ping)
            .count();
        assert_eq!(pings, 2);

        tokio::time::sleep(Duration::from_secs(30)).await;
        let pings_after = client
            .updates()
            .iter()
            .filter(|(event, _)| *event == LifecycleEvent::Ping)
            .count();
        assert_eq!(pings_after, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_failure_is_swallowed() {
        let client = Arc::new(CountingClient::default());
        client.fail.store(true, std::sync::atomic::Ordering::SeqCst);
        let reporter = Arc::new(
            ProgressReporter::new(
                client.clone() as Arc<dyn AccountClient>,
                "w1",
                WorkspaceVersion::new(1, 0, 0),
            )
            .with_retry_strategy(RetryStrategy::fixed(Duration::from_millis(200))),
        );

        // Must return despite the control-plane being down.
        reporter.report(50.0).await;
        assert!(client.updates().is_empty());
    }

    #[tokio::test]
    async fn test_progress_sink_forwards_reports() {
        let client = Arc::new(CountingClient::default());
        let reporter = reporter(&client);

        let (sink, forwarder) = reporter.progress_sink();
        sink.report(25.0);
        sink.report(75.0);
        drop(sink);
        forwarder.await.unwrap();

        assert_eq!(
            client.updates(),
            vec![
                (LifecycleEvent::Progress, 25),
                (LifecycleEvent::Progress, 75)
            ]
        );
    }
}
