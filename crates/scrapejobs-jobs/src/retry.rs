//! Busy-store retry with exponential backoff.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::JobError;
use crate::job::Job;
use crate::store::{JobRepository, SelectParams};

/// Messages reported by SQLite drivers that only surface string errors.
const BUSY_MARKERS: &[&str] = &[
    "database is locked",
    "database table is locked",
    "SQLITE_BUSY",
    "SQLITE_LOCKED",
];

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Upper bound for the exponential delay, before jitter.
    pub max_backoff: Duration,
    /// Maximum number of physical calls per operation.
    pub max_attempts: u32,
    /// Add up to 20% random jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            max_attempts: 10,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Backoff after the given zero-based failed attempt, without jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Backoff with jitter applied when enabled.
    pub fn jittered_delay(&self, attempt: u32) -> Duration {
        let delay = self.delay_for_attempt(attempt);
        if !self.jitter {
            return delay;
        }
        let factor: f64 = rand::thread_rng().gen_range(0.0..=0.2);
        delay + delay.mul_f64(factor)
    }
}

/// Check if an error means the store is temporarily locked.
pub fn is_busy_error(error: &JobError) -> bool {
    match error {
        JobError::Busy(_) => true,
        JobError::Database(message) => BUSY_MARKERS.iter().any(|m| message.contains(m)),
        _ => false,
    }
}

/// Job repository wrapper that retries busy-store errors.
#[derive(Clone)]
pub struct RetryingRepository {
    inner: Arc<dyn JobRepository>,
    config: RetryConfig,
}

impl RetryingRepository {
    /// Create a new retrying repository.
    pub fn new(inner: Arc<dyn JobRepository>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// Run `operation` until it succeeds, fails with a non-busy error,
    /// runs out of attempts or `cancel` fires.
    pub async fn execute_with_retry<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        operation: &str,
        f: F,
    ) -> Result<T, JobError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, JobError>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(cancelled(operation));
            }

            let err = match f().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !is_busy_error(&err) {
                return Err(err);
            }

            attempt += 1;
            if attempt >= max_attempts {
                return Err(JobError::RetriesExhausted {
                    operation: operation.to_string(),
                    attempts: max_attempts,
                    source: Box::new(err),
                });
            }

            let delay = self.config.jittered_delay(attempt - 1);
            warn!(
                "Store busy on {} (attempt {}/{}), retrying after {:?}: {}",
                operation, attempt, max_attempts, delay, err
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled(operation)),
                _ = sleep(delay) => {}
            }
        }
    }

    /// Insert a job.
    pub async fn create(&self, cancel: &CancellationToken, job: &Job) -> Result<(), JobError> {
        debug!("Creating job '{}'", job.id);
        self.execute_with_retry(cancel, "Create", || self.inner.create(job))
            .await
    }

    /// Load a job.
    pub async fn get(&self, cancel: &CancellationToken, id: &str) -> Result<Job, JobError> {
        self.execute_with_retry(cancel, "Get", || self.inner.get(id)).await
    }

    /// Delete a job row.
    pub async fn delete(&self, cancel: &CancellationToken, id: &str) -> Result<(), JobError> {
        debug!("Deleting job '{}'", id);
        self.execute_with_retry(cancel, "Delete", || self.inner.delete(id))
            .await
    }

    /// Select jobs.
    pub async fn select(
        &self,
        cancel: &CancellationToken,
        params: SelectParams,
    ) -> Result<Vec<Job>, JobError> {
        self.execute_with_retry(cancel, "Select", || self.inner.select(params))
            .await
    }

    /// Replace a job.
    pub async fn update(&self, cancel: &CancellationToken, job: &Job) -> Result<(), JobError> {
        debug!("Updating job '{}' ({})", job.id, job.status);
        self.execute_with_retry(cancel, "Update", || self.inner.update(job))
            .await
    }
}

fn cancelled(operation: &str) -> JobError {
    JobError::Cancelled {
        operation: operation.to_string(),
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
