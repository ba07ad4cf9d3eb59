//! Fixed-delay retry for venue and ledger calls

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use launchpad_common::LaunchpadError;

/// Errors that may succeed when the same call is repeated
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for LaunchpadError {
    fn is_transient(&self) -> bool {
        self.is_retryable()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(5, Duration::from_millis(2_000))
    }
}

/// Run `op` until it succeeds, fails permanently, or exhausts the policy.
///
/// Only transient errors are retried; the last error is returned unchanged.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T, E>
where
    E: Transient + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    log::info!("{} succeeded on attempt {}", label, attempt);
                }
                return Ok(value);
            }
            Err(e) if e.is_transient() && attempt < max_attempts => {
                log::warn!("{} failed (attempt {}/{}): {}", label, attempt, max_attempts, e);
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => {
                log::error!("{} gave up after {} attempt(s): {}", label, attempt, e);
                return Err(e);
            }
        }
    }
}
