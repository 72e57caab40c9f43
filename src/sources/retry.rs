//! Bounded retry for idempotent upstream reads.
//!
//! Each attempt runs under its own timeout; a timed-out attempt counts as
//! a failed one. Only reads go through here: contract provisioning has a
//! side effect and is called exactly once per matchup.

use anyhow::{anyhow, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::config::RetryConfig;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Base delay; attempt `n` waits `n * backoff` before retrying.
    pub backoff: Duration,
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig, attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: Duration::from_millis(config.backoff_ms),
            attempt_timeout,
        }
    }

    /// Single attempt, no backoff.
    pub fn once(attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
            attempt_timeout,
        }
    }

    /// Run `op` until it succeeds or the attempts are exhausted.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_err = None;

        for attempt in 1..=self.max_attempts {
            match tokio::time::timeout(self.attempt_timeout, op()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => last_err = Some(e),
                Err(_) => {
                    last_err = Some(anyhow!(
                        "{operation} timed out after {}ms",
                        self.attempt_timeout.as_millis()
                    ))
                }
            }

            if attempt < self.max_attempts {
                warn!(
                    operation,
                    attempt,
                    max_attempts = self.max_attempts,
                    error = ?last_err,
                    "Upstream read failed, retrying"
                );
                tokio::time::sleep(self.backoff * attempt).await;
            }
        }

        let err = last_err.unwrap_or_else(|| anyhow!("{operation} was never attempted"));
        Err(err.context(format!(
            "{operation} failed after {} attempt(s)",
            self.max_attempts
        )))
    }
}
