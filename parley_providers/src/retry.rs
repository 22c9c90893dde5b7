use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Backoff schedule for a retried request.
///
/// The operation is attempted once per entry in `base_delays` (sleeping
/// that long after each failure), then `final_retries` more times spaced by
/// `final_delay`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delays: Vec<Duration>,
    pub final_retries: usize,
    pub final_delay: Duration,
}

impl Default for RetryPolicy {
    /// 1s, 2s, 4s, then 8s x 1
    fn default() -> Self {
        Self {
            base_delays: vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
            ],
            final_retries: 1,
            final_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            base_delays: Vec::new(),
            final_retries: 1,
            final_delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn total_attempts(&self) -> usize {
        self.base_delays.len() + self.final_retries
    }
}

/// Retry an async operation following `policy`.
///
/// Returns the first success, the first error `is_retryable` rejects, or the
/// last error once every attempt failed. A policy with no attempts still runs
/// the operation once.
pub async fn retry_with_backoff<F, Fut, T, E, R>(
    mut operation: F,
    policy: &RetryPolicy,
    is_retryable: R,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    R: Fn(&E) -> bool,
{
    let total = policy.total_attempts().max(1);
    let mut attempt = 0_usize;

    loop {
        attempt += 1;
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt >= total || !is_retryable(&e) => return Err(e),
            Err(e) => {
                let delay = policy
                    .base_delays
                    .get(attempt - 1)
                    .copied()
                    .unwrap_or(policy.final_delay);
                warn!(
                    "Request failed (attempt {attempt}/{total}): {e}. Retrying after {}ms...",
                    delay.as_millis()
                );
                sleep(delay).await;
            }
        }
    }
}
