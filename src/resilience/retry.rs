use rand::Rng;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, warn};

use crate::config::settings::RetryConfig;
use crate::error::{DirectoryError, Result};
use crate::helpers::cancel::CancelFlag;
use crate::observability::metrics::get_metrics;
use crate::transport::{ApiRequest, ExecuteRequest, HttpOutcome};
use crate::utils::constants::{
    DEFAULT_BASE_DELAY_MS, DEFAULT_RETRY_ATTEMPTS, MAX_RETRY_ATTEMPTS, MIN_RETRY_ATTEMPTS,
    RATE_LIMITED_STATUS,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySettings {
    /// retries allowed after the first call
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl RetrySettings {
    /// Out of range budgets are configuration errors, rejected up front.
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Result<Self> {
        if !(MIN_RETRY_ATTEMPTS..=MAX_RETRY_ATTEMPTS).contains(&max_attempts) {
            return Err(DirectoryError::InvalidRetryBudget(max_attempts));
        }
        if base_delay_ms == 0 {
            return Err(DirectoryError::Config("retry base_delay_ms must be > 0".to_string()));
        }
        Ok(Self { max_attempts, base_delay_ms })
    }

    pub fn from_config(retry: Option<&RetryConfig>) -> Result<Self> {
        Self::new(
            retry.and_then(|r| r.max_attempts).unwrap_or(DEFAULT_RETRY_ATTEMPTS),
            retry.and_then(|r| r.base_delay_ms).unwrap_or(DEFAULT_BASE_DELAY_MS),
        )
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_RETRY_ATTEMPTS, base_delay_ms: DEFAULT_BASE_DELAY_MS }
    }
}

/// `2^attempt * base + uniform[0, base)`, attempt is 0 at the first retry.
pub fn backoff_delay<R: Rng>(attempt: u32, base_delay_ms: u64, rng: &mut R) -> Duration {
    let exponential = base_delay_ms.saturating_mul(1u64 << attempt.min(32));
    let jitter = if base_delay_ms == 0 { 0 } else { rng.gen_range(0..base_delay_ms) };
    Duration::from_millis(exponential.saturating_add(jitter))
}

/// Per-call retry state, dropped once the call resolves.
#[derive(Debug)]
struct RetryPlan {
    attempt: u32,
    max_attempts: u32,
    base_delay_ms: u64,
}

impl RetryPlan {
    fn new(settings: &RetrySettings) -> Self {
        Self { attempt: 0, max_attempts: settings.max_attempts, base_delay_ms: settings.base_delay_ms }
    }

    fn can_retry(&self) -> bool {
        self.attempt < self.max_attempts
    }

    fn next_delay(&self) -> Duration {
        backoff_delay(self.attempt, self.base_delay_ms, &mut rand::thread_rng())
    }
}

/// Runs one mutating call, retrying while the provider answers 503.
///
/// Caller contract: only hand it calls that are safe to repeat after a 503.
/// The retry loop cannot tell whether a rejected call had a side effect, so
/// a creation whose failure mode is ambiguous must not go through here.
///
/// Retries are sequential; no two attempts of the same call overlap.
pub struct RetryingMutator<'a, E> {
    executor: &'a E,
    settings: RetrySettings,
    cancel: Option<CancelFlag>,
}

impl<'a, E: ExecuteRequest + Sync> RetryingMutator<'a, E> {
    pub fn new(executor: &'a E, settings: RetrySettings) -> Self {
        Self { executor, settings, cancel: None }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn settings(&self) -> &RetrySettings {
        &self.settings
    }

    /// Returns the first outcome that is not a retryable 503, or the last
    /// 503 once the budget is spent. Interpreting it is up to the caller.
    pub async fn execute_with_retry(&self, request: &ApiRequest, expected_status: u16) -> Result<HttpOutcome> {
        let metrics = get_metrics().await;
        let mut plan = RetryPlan::new(&self.settings);

        loop {
            self.check_cancel()?;
            let outcome = self.executor.execute(request).await?;

            // success, expected or not, and every non-503 failure are final
            if outcome.is_success() || outcome.status() != RATE_LIMITED_STATUS {
                if outcome.status() != expected_status {
                    debug!("{} {} answered {}, expected {}", request.method, request.url, outcome.status(), expected_status);
                }
                return Ok(outcome);
            }
            if !plan.can_retry() {
                error!("{} {} still rate limited after {} retries", request.method, request.url, plan.attempt);
                return Ok(outcome);
            }

            let delay = plan.next_delay();
            warn!(
                "{} {} rate limited, retry {}/{} in {} ms",
                request.method,
                request.url,
                plan.attempt + 1,
                plan.max_attempts,
                delay.as_millis()
            );
            metrics.rate_limit_retries.inc();
            self.check_cancel()?;
            sleep(delay).await;
            plan.attempt += 1;
        }
    }

    fn check_cancel(&self) -> Result<()> {
        match &self.cancel {
            Some(cancel) => cancel.check(),
            None => Ok(()),
        }
    }
}
