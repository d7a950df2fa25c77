//! Bounded retry of registrations at a handling boundary.
//!
//! Which codes are worth retrying is the caller's decision: every entry point
//! here takes an explicit predicate and nothing is retried by default.

use std::future::Future;
use std::time::Duration;

use crate::fault::{RegistrationFault, RegistrationResult};

/// Configuration for the retry policy.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not counting the first try).
    pub max_retries: u32,
    /// Initial backoff delay.
    pub initial_backoff: Duration,
    /// Maximum backoff delay (caps exponential growth).
    pub max_backoff: Duration,
    /// Multiplier applied to backoff on each retry.
    pub multiplier: f64,
    /// Add `jitter_fraction * backoff / 2` on top of each delay (0.0 = none).
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
            jitter_fraction: 0.1,
        }
    }
}

/// Stateless retry policy — computes the next delay given the attempt number.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(RetryConfig {
            max_retries: 0,
            ..Default::default()
        })
    }

    /// Returns the delay before the `attempt`-th retry (1-based).
    /// Returns `None` if `attempt` is zero or exceeds `max_retries`.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.config.max_retries {
            return None;
        }
        let base_ms = self.config.initial_backoff.as_millis() as f64
            * self.config.multiplier.powi((attempt - 1) as i32);
        let cap_ms = self.config.max_backoff.as_millis() as f64;
        let capped = base_ms.min(cap_ms);

        let jitter_ms = capped * self.config.jitter_fraction * 0.5;
        let total_ms = (capped + jitter_ms) as u64;

        Some(Duration::from_millis(total_ms))
    }

    /// Returns `true` if the `attempt`-th retry (1-based) is allowed.
    /// Agrees with [`next_delay`](Self::next_delay): `false` exactly when it
    /// returns `None`.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt >= 1 && attempt <= self.config.max_retries
    }
}

/// Run `op` until it succeeds, fails with a fault `is_retryable` rejects, or
/// the policy runs out of retries.
///
/// The last fault is returned exactly as `op` produced it.
pub async fn retry_registration<T, F, Fut, P>(
    policy: &RetryPolicy,
    is_retryable: P,
    mut op: F,
) -> RegistrationResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RegistrationResult<T>>,
    P: Fn(&RegistrationFault) -> bool,
{
    let mut attempt = 0u32;
    loop {
        let fault = match op().await {
            Ok(value) => return Ok(value),
            Err(fault) => fault,
        };
        if !is_retryable(&fault) {
            return Err(fault);
        }
        attempt += 1;
        if !policy.should_retry(attempt) {
            tracing::warn!(
                code = %fault.code(),
                attempts = attempt,
                "registration retries exhausted: {}",
                fault.message()
            );
            return Err(fault);
        }
        let delay = policy.next_delay(attempt).unwrap_or_default();
        tracing::warn!(
            code = %fault.code(),
            attempt,
            delay_ms = delay.as_millis() as u64,
            "registration failed, retrying: {}",
            fault.message()
        );
        tokio::time::sleep(delay).await;
    }
}
