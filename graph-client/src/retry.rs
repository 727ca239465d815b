use commentguard_core::{CoreError, ErrorExt};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first one included
    pub max_attempts: u32,
    /// Base delay for exponential backoff (in milliseconds)
    pub base_delay_ms: u64,
    /// Maximum delay between retries (in milliseconds)
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
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
    /// Short enough that a run of retries stays well inside one cycle.
    pub fn graph_api() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 10000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.2,
        }
    }

    /// Single attempt, no waiting.
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetryStrategy {
    /// Retry with exponential backoff
    Retry,
    /// Retry after the delay the server asked for
    RetryWithDelay(Duration),
    /// Permanent failure
    NoRetry,
}

/// Determine retry strategy based on error type. Server-requested delays
/// longer than `max_delay_ms` are left to the next cycle.
pub fn get_retry_strategy(error: &CoreError, config: &RetryConfig) -> RetryStrategy {
    if !error.is_retryable() {
        return RetryStrategy::NoRetry;
    }

    match error.retry_after() {
        Some(delay) if delay > Duration::from_millis(config.max_delay_ms) => {
            RetryStrategy::NoRetry
        }
        Some(delay) => RetryStrategy::RetryWithDelay(delay),
        None => RetryStrategy::Retry,
    }
}

/// Calculate delay with exponential backoff and jitter
pub fn calculate_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let max_delay = Duration::from_millis(config.max_delay_ms);

    let multiplier = config.backoff_multiplier.powi(attempt as i32);
    let delay_ms = (config.base_delay_ms as f64 * multiplier) as u64;
    let exponential_delay = Duration::from_millis(delay_ms.min(config.max_delay_ms));

    let jitter_range = (exponential_delay.as_millis() as f64 * config.jitter_factor) as u64;
    let jitter = fastrand::u64(0..=jitter_range);

    (exponential_delay + Duration::from_millis(jitter)).min(max_delay)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetryMetrics {
    pub total_retries: u64,
    pub successful_retries: u64,
    pub failed_operations: u64,
}

/// Wraps a remote call with retry logic. The final error is returned as is
/// so callers can still classify it.
#[derive(Debug)]
pub struct RetryExecutor {
    config: RetryConfig,
    total_retries: AtomicU64,
    successful_retries: AtomicU64,
    failed_operations: AtomicU64,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            total_retries: AtomicU64::new(0),
            successful_retries: AtomicU64::new(0),
            failed_operations: AtomicU64::new(0),
        }
    }

    pub async fn execute<F, Fut, T>(&self, operation_name: &str, operation: F) -> Result<T, CoreError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        self.successful_retries.fetch_add(1, Ordering::Relaxed);
                        info!("{} succeeded after {} retries", operation_name, attempt);
                    }
                    return Ok(result);
                }
                Err(error) => {
                    let attempts_left = attempt + 1 < max_attempts;
                    let delay = match get_retry_strategy(&error, &self.config) {
                        RetryStrategy::Retry if attempts_left => {
                            calculate_delay(attempt, &self.config)
                        }
                        RetryStrategy::RetryWithDelay(delay) if attempts_left => delay,
                        strategy => {
                            if strategy != RetryStrategy::NoRetry {
                                warn!(
                                    "{} failed after {} attempts: {}",
                                    operation_name,
                                    attempt + 1,
                                    error
                                );
                            } else {
                                debug!("Not retrying {}: {}", operation_name, error);
                            }
                            self.failed_operations.fetch_add(1, Ordering::Relaxed);
                            return Err(error);
                        }
                    };

                    info!("Retrying {} in {:?} due to: {}", operation_name, delay, error);
                    self.total_retries.fetch_add(1, Ordering::Relaxed);
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    pub fn get_metrics(&self) -> RetryMetrics {
        RetryMetrics {
            total_retries: self.total_retries.load(Ordering::Relaxed),
            successful_retries: self.successful_retries.load(Ordering::Relaxed),
            failed_operations: self.failed_operations.load(Ordering::Relaxed),
        }
    }
}
