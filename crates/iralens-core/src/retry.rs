//! Capped exponential backoff with jitter, shared by the archive and
//! reasoning call sites.
//!
//! Each error type decides for itself whether it is worth retrying by
//! implementing [`Retryable`]; the policy only decides how long to wait and
//! when to give up.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

/// Classifies a failure as transient (retry) or terminal (give up now).
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Backoff policy for transient failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero behaves like one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Growth factor applied per retry.
    pub multiplier: f64,
    /// Upper bound on any single delay, jitter included.
    pub max_delay: Duration,
    /// Relative jitter: the delay is scaled by a uniform factor in
    /// `[1 - jitter, 1 + jitter]`.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            jitter: 0.25,
        }
    }
}

impl RetryPolicy {
    /// A policy that never sleeps. Used in tests and for stubbed services.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            multiplier: 1.0,
            max_delay: Duration::ZERO,
            jitter: 0.0,
        }
    }

    /// Delay before retry number `retry` (1-based), without jitter.
    pub fn base_backoff(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(30) as i32;
        let scaled = self.base_delay.as_secs_f64() * self.multiplier.max(1.0).powi(exp);
        let capped = scaled.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }

    /// Delay before retry number `retry` (1-based), with jitter applied.
    pub fn backoff_with(&self, retry: u32, rng: &mut impl Rng) -> Duration {
        let base = self.base_backoff(retry).as_secs_f64();
        if base == 0.0 || self.jitter <= 0.0 {
            return Duration::from_secs_f64(base);
        }
        let spread = self.jitter.min(1.0);
        let factor = rng.gen_range((1.0 - spread)..=(1.0 + spread));
        let jittered = (base * factor).min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(jittered.max(0.0))
    }

    fn backoff(&self, retry: u32) -> Duration {
        self.backoff_with(retry, &mut rand::thread_rng())
    }

    /// Run `op` until it succeeds, fails terminally, or the attempt budget
    /// is spent. The last error is returned unchanged.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        operation,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_retryable() {
                        warn!(operation, attempts = attempt, error = %err, "retry budget exhausted");
                    } else {
                        debug!(operation, attempt, error = %err, "terminal failure");
                    }
                    return Err(err);
                }
            }
        }
    }
}
