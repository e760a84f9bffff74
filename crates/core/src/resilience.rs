//! Retry and circuit-breaker wrappers for flaky external dependencies.
//!
//! Composition order is fixed at retry-inside-breaker: the breaker guards one
//! logical call, and a call that exhausts all of its retries counts as a
//! single breaker failure. The breaker therefore tracks call-level outcomes,
//! not per-attempt outcomes.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};

/// Classifies whether an error is worth retrying.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("retries exhausted after {attempts} attempts: {source}")]
    Exhausted { attempts: u32, source: E },
    #[error("{0}")]
    Fatal(E),
}

/// Exponential backoff retry: `base_delay * 2^attempt`, capped at
/// `max_backoff`, for up to `max_retries` additional attempts after the
/// initial one. Non-retryable errors propagate immediately as `Fatal`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_backoff: Duration) -> Self {
        Self { max_retries, base_delay, max_backoff }
    }

    /// No retries at all; the initial attempt is the only one, and its
    /// error surfaces untouched.
    pub fn none() -> Self {
        Self { max_retries: 0, ..Self::default() }
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = (self.base_delay.as_millis() as u64)
            .saturating_mul(multiplier)
            .min(self.max_backoff.as_millis() as u64);
        Duration::from_millis(delay_ms)
    }

    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, RetryError<E>>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        info!(attempt, "operation succeeded after retrying");
                    }
                    return Ok(value);
                }
                Err(error) if !error.is_retryable() => return Err(RetryError::Fatal(error)),
                Err(error) => {
                    if attempt >= self.max_retries {
                        // Exhaustion only makes sense when retries actually
                        // happened; a no-retry policy passes the error through.
                        if self.max_retries == 0 {
                            return Err(RetryError::Fatal(error));
                        }
                        return Err(RetryError::Exhausted { attempts: attempt + 1, source: error });
                    }
                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retryable failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BreakerError<E> {
    #[error("circuit breaker is open")]
    Open,
    #[error("{0}")]
    Inner(E),
}

#[derive(Debug, Default)]
struct BreakerState {
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    open: bool,
}

/// Opens after `failure_threshold` consecutive call-level failures; while
/// open, calls fail fast without invoking the operation. After `timeout`
/// since the last failure the breaker resets and allows a trial call. Any
/// success resets the consecutive-failure counter immediately.
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    timeout: Duration,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, timeout: Duration) -> Self {
        Self { failure_threshold, timeout, state: Mutex::new(BreakerState::default()) }
    }

    pub fn is_open(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.open && !self.timed_out(&state)
    }

    fn timed_out(&self, state: &BreakerState) -> bool {
        state.last_failure.is_some_and(|at| at.elapsed() > self.timeout)
    }

    pub async fn call<T, E, F, Fut>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        {
            let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if state.open {
                if self.timed_out(&state) {
                    info!("circuit breaker timeout elapsed, allowing trial call");
                    *state = BreakerState::default();
                } else {
                    return Err(BreakerError::Open);
                }
            }
        }

        match operation().await {
            Ok(value) => {
                let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                if state.consecutive_failures > 0 {
                    info!("circuit breaker recovering after success");
                }
                state.consecutive_failures = 0;
                Ok(value)
            }
            Err(error) => {
                let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                state.consecutive_failures += 1;
                state.last_failure = Some(Instant::now());
                if state.consecutive_failures >= self.failure_threshold {
                    state.open = true;
                    warn!(
                        consecutive_failures = state.consecutive_failures,
                        error = %error,
                        "circuit breaker opened"
                    );
                }
                Err(BreakerError::Inner(error))
            }
        }
    }
}
