use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::defaults::*;
use crate::config::duration_serde;
use crate::errors::{AppError, AppResult};
use crate::utils::retry::RetryPolicy;

/// Per-run probing budget, immutable once the run starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeBudget {
    /// Deadline for a single network attempt
    #[serde(with = "duration_serde::duration")]
    pub timeout: Duration,
    /// Global cap on in-flight network calls
    pub concurrency: usize,
    /// Cap on in-flight network calls per host; 0 means same as `concurrency`
    pub per_host_limit: usize,
    /// Retries for transient failures, so each operation runs at most `retries + 1` times
    pub retries: u32,
    /// Stop admitting candidates after this many; absent or 0 means unlimited
    pub max_items: Option<usize>,
    pub allow_playlist_only: bool,
    pub require_live: bool,
    /// Linear backoff step between attempts
    #[serde(with = "duration_serde::duration")]
    pub retry_backoff: Duration,
    /// Upper bound on a single backoff wait
    #[serde(with = "duration_serde::duration")]
    pub retry_backoff_max: Duration,
}

impl Default for ProbeBudget {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            concurrency: DEFAULT_CONCURRENCY,
            per_host_limit: DEFAULT_PER_HOST_LIMIT,
            retries: DEFAULT_RETRIES,
            max_items: None,
            allow_playlist_only: DEFAULT_ALLOW_PLAYLIST_ONLY,
            require_live: DEFAULT_REQUIRE_LIVE,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
            retry_backoff_max: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MAX_MS),
        }
    }
}

impl ProbeBudget {
    /// Reject budgets that cannot run before any task is started
    pub fn validate(&self) -> AppResult<()> {
        if self.concurrency == 0 {
            return Err(AppError::configuration("concurrency must be greater than 0"));
        }
        if self.timeout.is_zero() {
            return Err(AppError::configuration("timeout must be greater than 0"));
        }
        if self.retry_backoff > self.retry_backoff_max {
            return Err(AppError::configuration(format!(
                "retry_backoff ({}) exceeds retry_backoff_max ({})",
                humantime::format_duration(self.retry_backoff),
                humantime::format_duration(self.retry_backoff_max)
            )));
        }
        Ok(())
    }

    /// Per-host limit after resolving 0 and clamping to the global limit
    pub fn effective_per_host_limit(&self) -> usize {
        match self.per_host_limit {
            0 => self.concurrency,
            limit => limit.min(self.concurrency),
        }
    }

    /// Admission cap, `None` when unlimited
    pub fn admission_cap(&self) -> Option<usize> {
        self.max_items.filter(|&n| n > 0)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retries,
            backoff_step: self.retry_backoff,
            backoff_max: self.retry_backoff_max,
        }
    }

    /// Worst-case number of tasks held by the scheduler at once
    pub fn admission_window(&self) -> usize {
        self.concurrency.saturating_mul(ADMISSION_WINDOW_FACTOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budget_is_valid() {
        let budget = ProbeBudget::default();
        assert!(budget.validate().is_ok());
        assert_eq!(budget.timeout, Duration::from_secs(6));
        assert_eq!(budget.effective_per_host_limit(), 8);
        assert_eq!(budget.admission_cap(), None);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let budget = ProbeBudget {
            concurrency: 0,
            ..Default::default()
        };
        assert!(matches!(budget.validate(), Err(AppError::Configuration { .. })));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let budget = ProbeBudget {
            timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(budget.validate().is_err());
    }

    #[test]
    fn test_per_host_limit_resolution() {
        let mut budget = ProbeBudget {
            concurrency: 4,
            per_host_limit: 0,
            ..Default::default()
        };
        assert_eq!(budget.effective_per_host_limit(), 4);

        budget.per_host_limit = 10;
        assert_eq!(budget.effective_per_host_limit(), 4);

        budget.per_host_limit = 2;
        assert_eq!(budget.effective_per_host_limit(), 2);
    }

    #[test]
    fn test_zero_max_items_means_unlimited() {
        let budget = ProbeBudget {
            max_items: Some(0),
            ..Default::default()
        };
        assert_eq!(budget.admission_cap(), None);
    }

    #[test]
    fn test_deserialize_partial_section() {
        let budget: ProbeBudget = toml::from_str("timeout = \"2s\"\nretries = 0").unwrap();
        assert_eq!(budget.timeout, Duration::from_secs(2));
        assert_eq!(budget.retries, 0);
        assert_eq!(budget.concurrency, DEFAULT_CONCURRENCY);
    }
}
