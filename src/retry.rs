use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{Result, ScraperError};

/// Attempt limit shared by both sources.
pub const MAX_RETRIES: u32 = 3;

/// Delay inserted between two consecutive attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Retry immediately.
    None,
    /// Same delay before every retry.
    Fixed(Duration),
    /// `step * attempt` after the n-th failed attempt (1-based).
    Linear(Duration),
}

impl Backoff {
    /// Delay to wait after `attempt` (1-based) has failed.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(delay) => delay,
            Backoff::Linear(step) => step * attempt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(MAX_RETRIES, Backoff::None)
    }
}

/// Runs `op` until it succeeds or `policy.max_attempts` attempts have failed.
///
/// The closure receives the 1-based attempt number. Every `Err` counts as a
/// failed attempt; the last error is wrapped in
/// [`ScraperError::RetriesExhausted`]. No delay follows the final attempt.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        info!(operation, attempt, max_attempts, "starting attempt");

        let error = match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        warn!(operation, attempt, max_attempts, error = %error, "attempt failed");

        if attempt >= max_attempts {
            return Err(ScraperError::RetriesExhausted {
                operation: operation.to_string(),
                attempts: attempt,
                last: Box::new(error),
            });
        }

        let delay = policy.backoff.delay_after(attempt);
        if !delay.is_zero() {
            info!(operation, delay_secs = delay.as_secs_f64(), "waiting before retry");
            tokio::time::sleep(delay).await;
        }

        attempt += 1;
    }
}
