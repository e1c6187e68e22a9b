//! Bounded retry for probe attempts
//!
//! Retries only transient failures, with a linear backoff capped at
//! `backoff_max`. Backoff waits are cancellable.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::models::{FailureCause, ProbeOutcome};
use crate::observability::metrics;
use crate::utils::url::UrlUtils;

/// Retry behaviour for a single network operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; at most `max_retries + 1` attempts run
    pub max_retries: u32,
    /// Linear backoff step: the wait after attempt `n` is `n * backoff_step`
    pub backoff_step: Duration,
    /// Cap on any single wait
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_step: Duration::from_millis(500),
            backoff_max: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait before the attempt following attempt number `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_step
            .saturating_mul(attempt)
            .min(self.backoff_max)
    }
}

/// Final result of a retried operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryOutcome {
    /// Outcome of the last attempt made
    pub outcome: ProbeOutcome,
    /// Attempts actually issued
    pub attempts: u32,
    /// Every issued attempt ended in a timeout
    pub timed_out_every_attempt: bool,
}

impl RetryOutcome {
    fn cancelled(attempts: u32) -> Self {
        Self {
            outcome: ProbeOutcome::PermanentFailure(FailureCause::Cancelled),
            attempts,
            timed_out_every_attempt: false,
        }
    }
}

/// Run `attempt` until it succeeds, fails permanently, or the retry budget is spent
///
/// When every attempt fails transiently the last transient failure is returned
/// unchanged. Cancellation before an attempt or during a backoff wait yields
/// `PermanentFailure(Cancelled)`.
pub async fn with_retry<F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    operation: &'static str,
    url: &str,
    mut attempt: F,
) -> RetryOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeOutcome>,
{
    let max_attempts = policy.max_attempts();
    let mut timed_out_every_attempt = true;
    let mut attempts = 0;

    loop {
        if cancel.is_cancelled() {
            return RetryOutcome::cancelled(attempts);
        }

        attempts += 1;
        let outcome = attempt().await;
        metrics().record_attempt(operation, &outcome);
        timed_out_every_attempt &=
            matches!(outcome, ProbeOutcome::TransientFailure(FailureCause::Timeout));

        if !outcome.is_transient() {
            if attempts > 1 {
                debug!(
                    target = "probe.retry",
                    operation,
                    url = %UrlUtils::obfuscate_credentials(url),
                    attempt = attempts,
                    outcome = outcome.label(),
                    "operation settled after retry"
                );
            }
            return RetryOutcome {
                timed_out_every_attempt: timed_out_every_attempt && !outcome.is_success(),
                outcome,
                attempts,
            };
        }

        if attempts >= max_attempts {
            warn!(
                target = "probe.retry",
                operation,
                url = %UrlUtils::obfuscate_credentials(url),
                attempts,
                cause = %outcome.describe(),
                "retries exhausted"
            );
            return RetryOutcome {
                outcome,
                attempts,
                timed_out_every_attempt,
            };
        }

        let delay = policy.delay_after(attempts);
        debug!(
            target = "probe.retry",
            operation,
            url = %UrlUtils::obfuscate_credentials(url),
            attempt = attempts,
            max_attempts,
            delay = ?delay,
            cause = %outcome.describe(),
            "transient failure, retrying"
        );
        metrics().record_retry(operation);

        tokio::select! {
            _ = cancel.cancelled() => return RetryOutcome::cancelled(attempts),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProbeSuccess;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tracing_test::traced_test;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff_step: Duration::from_millis(1),
            backoff_max: Duration::from_millis(5),
        }
    }

    fn success() -> ProbeOutcome {
        ProbeOutcome::Success(ProbeSuccess {
            status: 200,
            final_url: "http://h/a".into(),
            bytes_received: 1,
            body: None,
        })
    }

    #[test]
    fn test_linear_backoff_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_millis(500));
        assert_eq!(policy.delay_after(2), Duration::from_secs(1));
        assert_eq!(policy.delay_after(10), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_success_is_not_retried() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&fast_policy(3), &CancellationToken::new(), "test", "http://h/a", || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                success()
            }
        })
        .await;

        assert!(result.outcome.is_success());
        assert_eq!(result.attempts, 1);
        assert!(!result.timed_out_every_attempt);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&fast_policy(3), &CancellationToken::new(), "test", "http://h/a", || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                ProbeOutcome::from_status(404)
            }
        })
        .await;

        assert_eq!(result.outcome, ProbeOutcome::from_status(404));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_failures_exhaust_budget() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&fast_policy(2), &CancellationToken::new(), "test", "http://h/a", || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                ProbeOutcome::from_status(503)
            }
        })
        .await;

        assert_eq!(result.outcome, ProbeOutcome::from_status(503));
        assert_eq!(result.attempts, 3);
        assert!(!result.timed_out_every_attempt);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&fast_policy(2), &CancellationToken::new(), "test", "http://h/a", || {
            let counter = counter_clone.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    ProbeOutcome::TransientFailure(FailureCause::Timeout)
                } else {
                    success()
                }
            }
        })
        .await;

        assert!(result.outcome.is_success());
        assert_eq!(result.attempts, 2);
        assert!(!result.timed_out_every_attempt);
    }

    #[tokio::test]
    async fn test_all_timeouts_flagged() {
        let result = with_retry(&fast_policy(1), &CancellationToken::new(), "test", "http://h/a", || async {
            ProbeOutcome::TransientFailure(FailureCause::Timeout)
        })
        .await;

        assert_eq!(result.attempts, 2);
        assert!(result.timed_out_every_attempt);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&fast_policy(2), &cancel, "test", "http://h/a", || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                success()
            }
        })
        .await;

        assert_eq!(
            result.outcome,
            ProbeOutcome::PermanentFailure(FailureCause::Cancelled)
        );
        assert_eq!(result.attempts, 0);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_exhaustion_is_logged_without_credentials() {
        let url = "http://viewer:hunter2@h/live.m3u8?token=abc123";
        let result = with_retry(&fast_policy(1), &CancellationToken::new(), "test", url, || async {
            ProbeOutcome::from_status(502)
        })
        .await;

        assert_eq!(result.attempts, 2);
        assert!(logs_contain("retries exhausted"));
        assert!(!logs_contain("hunter2"));
        assert!(!logs_contain("abc123"));
    }
}
