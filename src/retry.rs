// SPDX-License-Identifier: PMPL-1.0-or-later
//! Retry logic with exponential backoff
//!
//! Used for each CORS proxy in the fetch chain:
//! - Retry 1: 1s
//! - Retry 2: 2s
//! - Retry 3: 4s
//!
//! Jitter is optional and off by default so the schedule is exact.

use crate::error::{Error, Result};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt
    pub max_retries: usize,
    /// Initial backoff duration
    pub initial_backoff: Duration,
    /// Maximum backoff duration
    pub max_backoff: Duration,
    /// Backoff multiplier
    pub multiplier: f64,
    /// Scale each delay by a random factor in [0.5, 1.0)
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: false,
        }
    }
}

impl RetryConfig {
    /// Delays that will be slept between attempts, in order
    pub fn schedule(&self) -> Vec<Duration> {
        let mut delays = Vec::with_capacity(self.max_retries);
        let mut backoff = self.initial_backoff;
        for _ in 0..self.max_retries {
            delays.push(backoff);
            backoff = self.next_backoff(backoff);
        }
        delays
    }

    /// Whether the multiplier yields a non-shrinking, finite schedule
    pub fn validate(&self) -> Result<()> {
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(Error::Config(format!(
                "backoff multiplier must be a finite number >= 1.0, got {}",
                self.multiplier
            )));
        }
        Ok(())
    }

    /// Next delay, capped at `max_backoff`. Values that cannot form a
    /// Duration fall back to the cap.
    fn next_backoff(&self, current: Duration) -> Duration {
        let next = (current.as_secs_f64() * self.multiplier).min(self.max_backoff.as_secs_f64());
        Duration::try_from_secs_f64(next).unwrap_or(self.max_backoff)
    }
}

/// Retry policy with exponential backoff.
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a retry policy with custom configuration
    pub fn with_config(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Execute a fallible operation with retries.
    ///
    /// Errors for which `is_retryable` returns false end the loop at once.
    /// Every error seen is pushed to `failures` so callers can report the
    /// full chain of causes.
    pub async fn execute<F, Fut, T, E>(
        &self,
        mut operation: F,
        is_retryable: impl Fn(&E) -> bool,
        failures: &mut Vec<String>,
    ) -> std::result::Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        let mut backoff = self.config.initial_backoff;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!("Operation succeeded after {} retries", attempt);
                    }
                    return Ok(result);
                }
                Err(error) => {
                    failures.push(error.to_string());
                    attempt += 1;

                    if attempt > self.config.max_retries {
                        warn!("Operation failed after {} attempts: {}", attempt, error);
                        return Err(error);
                    }

                    if !is_retryable(&error) {
                        warn!("Operation failed with non-retryable error: {}", error);
                        return Err(error);
                    }

                    let delay = if self.config.jitter {
                        let jitter_factor = 0.5 + (rand::random::<f64>() * 0.5);
                        backoff.mul_f64(jitter_factor)
                    } else {
                        backoff
                    };

                    warn!(
                        "Operation failed (attempt {}/{}): {}. Retrying in {:?}...",
                        attempt,
                        self.config.max_retries + 1,
                        error,
                        delay
                    );

                    sleep(delay).await;
                    backoff = self.config.next_backoff(backoff);
                }
            }
        }
    }
}

/// Determine if an error is transient and should be retried.
pub fn is_transient_error(error: &Error) -> bool {
    match error {
        // Network errors, timeouts included
        Error::Http(_) => true,
        // Bad status or empty body from a proxy
        Error::Status { .. } | Error::EmptyBody(_) | Error::Fetch { .. } => true,
        // Validation errors never heal on retry
        Error::InvalidUrl(_) | Error::Validation(_) | Error::Config(_) => false,
        _ => false,
    }
}
