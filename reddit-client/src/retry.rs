use redwatch_core::{CoreError, ErrorExt};
use std::time::Duration;

/// Bounded exponential backoff for transient fetch failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    /// Maximum jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    /// Tuned for the Reddit API: slower ramp, 20% jitter to avoid
    /// thundering-herd retries across sources.
    pub fn reddit() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2000,
            max_delay_ms: 60000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetryStrategy {
    /// Retry with exponential backoff.
    Retry,
    /// Retry after a server-dictated delay (rate limits).
    RetryWithDelay(Duration),
    /// Permanent failure, surface immediately.
    NoRetry,
}

pub fn get_retry_strategy(error: &CoreError) -> RetryStrategy {
    if let Some(delay) = error.retry_after() {
        RetryStrategy::RetryWithDelay(delay)
    } else if error.is_retryable() {
        RetryStrategy::Retry
    } else {
        RetryStrategy::NoRetry
    }
}

/// Delay before retry `attempt` (1-based), exponential with jitter.
pub fn calculate_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let multiplier = config.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
    let delay_ms = ((config.base_delay_ms as f64) * multiplier) as u64;
    let capped = delay_ms.min(config.max_delay_ms);

    let jitter_range = ((capped as f64) * config.jitter_factor) as u64;
    let jitter = fastrand::u64(0..=jitter_range);

    Duration::from_millis((capped + jitter).min(config.max_delay_ms))
}
