//! Interruptible idle sleep.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Why an idle sleep ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleWake {
    /// The wake-up was fired before the timeout elapsed
    Woken,
    /// The full timeout elapsed
    TimedOut,
}

/// Wake-up handle for the poller's idle sleep.
///
/// Firing it cancels the pending sleep and resolves immediately; after
/// resolution the handle is armed again for the next sleep. Firing with no
/// sleeper stores a single permit and the next sleep returns at once; the
/// poller then re-polls and, finding nothing, goes back to sleep.
#[derive(Debug, Clone, Default)]
pub struct Wakeup {
    notify: Arc<Notify>,
}

impl Wakeup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the wake-up.
    pub fn fire(&self) {
        self.notify.notify_one();
    }

    /// Sleep for `timeout`, returning early if the wake-up fires.
    pub async fn sleep(&self, timeout: Duration) -> IdleWake {
        tokio::select! {
            _ = self.notify.notified() => IdleWake::Woken,
            _ = tokio::time::sleep(timeout) => IdleWake::TimedOut,
        }
    }
}
