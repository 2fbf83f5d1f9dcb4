//! Concurrency gate capping the number of in-flight jobs.

use crate::error::{WorkerError, WorkerResult};
use crate::idle::Wakeup;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Semaphore of size `limit` guarding job dispatch.
///
/// The poller acquires a slot before fetching work and hands it to the
/// dispatched job; the slot is released when the job future completes on any
/// path. A slot that carried a job (see [`JobSlot::arm_wakeup`]) also fires
/// the idle wake-up on release, so an idle poller re-polls as soon as
/// capacity frees up. Slots returned unused stay quiet; waking the idle
/// sleep for them would turn the empty-poll path into a busy loop.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    running: Arc<AtomicUsize>,
    limit: usize,
    wakeup: Wakeup,
}

impl ConcurrencyGate {
    pub fn new(limit: usize, wakeup: Wakeup) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            running: Arc::new(AtomicUsize::new(0)),
            limit,
            wakeup,
        }
    }

    /// Acquire a job slot, suspending while all `limit` slots are taken.
    pub async fn acquire(&self) -> WorkerResult<JobSlot> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| WorkerError::Other("concurrency gate closed".to_string()))?;
        self.running.fetch_add(1, Ordering::SeqCst);
        Ok(JobSlot {
            _permit: permit,
            running: self.running.clone(),
            wakeup: self.wakeup.clone(),
            fire_on_release: AtomicBool::new(false),
        })
    }

    /// Number of currently held slots.
    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    /// Maximum number of concurrently held slots.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Wait until every slot has been released.
    pub async fn wait_idle(&self) {
        // Acquiring all permits means no job holds one.
        if let Ok(permits) = self.semaphore.acquire_many(self.limit as u32).await {
            drop(permits);
        }
    }
}

/// A held job slot. Dropping it releases the slot; armed slots also fire
/// the idle wake-up.
#[derive(Debug)]
pub struct JobSlot {
    _permit: OwnedSemaphorePermit,
    running: Arc<AtomicUsize>,
    wakeup: Wakeup,
    fire_on_release: AtomicBool,
}

impl JobSlot {
    /// Mark this slot as carrying a job, so its release wakes an idle
    /// poller.
    pub fn arm_wakeup(&self) {
        self.fire_on_release.store(true, Ordering::SeqCst);
    }
}

impl Drop for JobSlot {
    fn drop(&mut self) {
        self.running.fetch_sub(1, Ordering::SeqCst);
        if self.fire_on_release.load(Ordering::SeqCst) {
            self.wakeup.fire();
        }
    }
}
