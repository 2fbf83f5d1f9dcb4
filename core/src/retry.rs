//! Retry strategies for control-plane calls.
//!
//! Two policies are used by the worker: retry-until-success for the handshake
//! and job pickup (there is no meaningful user-facing timeout for either),
//! and retry-within-a-budget for progress updates, so a dead control-plane
//! cannot stall a running job permanently.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Backoff strategy for retrying transient failures.
#[derive(Debug, Clone)]
pub struct RetryStrategy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between attempts.
    pub max_delay: Duration,
    /// Multiplier for each subsequent attempt.
    pub multiplier: f64,
    /// Relative jitter applied to every delay (0.2 = ±20 %).
    pub jitter: f64,
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.2,
        }
    }
}

impl RetryStrategy {
    /// Creates a fixed-delay strategy without jitter. Mostly useful in tests.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            initial_delay: delay,
            max_delay: delay,
            multiplier: 1.0,
            jitter: 0.0,
        }
    }

    /// Calculates the delay before the retry for the given attempt number.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self
            .initial_delay
            .mul_f64(self.multiplier.powi(attempt.min(16) as i32))
            .min(self.max_delay);
        if self.jitter <= 0.0 {
            return base;
        }
        let factor = rand::thread_rng().gen_range(1.0 - self.jitter..=1.0 + self.jitter);
        base.mul_f64(factor)
    }
}

/// Invoke `f` until it succeeds, backing off between attempts.
///
/// Every failure is logged at warn level with the computed delay. Intended
/// for transient failures (network, control-plane 5xx); the call never gives
/// up, so cancellation happens by dropping the future.
pub async fn retry_until_ok<T, E, F, Fut>(strategy: &RetryStrategy, label: &str, mut f: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt: u32 = 0;
    loop {
        match f().await {
            Ok(value) => return value,
            Err(err) => {
                let delay = strategy.delay_for(attempt);
                tracing::warn!(
                    error = %err,
                    attempt,
                    "{} failed. Retrying in {:.1}s",
                    label,
                    delay.as_secs_f32()
                );
                tokio::time::sleep(delay).await;
                attempt = attempt.saturating_add(1);
            }
        }
    }
}

/// Invoke `f` with retries until the cumulative elapsed time exceeds
/// `budget`, then fail with the last error.
pub async fn retry_within<T, E, F, Fut>(
    strategy: &RetryStrategy,
    budget: Duration,
    label: &str,
    mut f: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let started = Instant::now();
    let mut attempt: u32 = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let elapsed = started.elapsed();
                if elapsed >= budget {
                    return Err(err);
                }
                let delay = strategy.delay_for(attempt).min(budget - elapsed);
                tracing::warn!(
                    error = %err,
                    attempt,
                    "{} failed. Retrying in {:.1}s",
                    label,
                    delay.as_secs_f32()
                );
                tokio::time::sleep(delay).await;
                attempt = attempt.saturating_add(1);
            }
        }
    }
}
