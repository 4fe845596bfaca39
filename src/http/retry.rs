//! Retry logic with exponential backoff and jitter.
//!
//! Delivery attempts go through [`with_retry_predicate`]: the submit
//! operation itself is a plain one-shot call, and the classification of a
//! failure as retryable is a predicate passed in alongside the backoff
//! schedule.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::error::{AnalyticsError, ErrorCode, Result};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Number of retries after the initial attempt. Default: 3
    pub retries: u32,

    /// Base delay in milliseconds. Default: 1000
    pub base_delay_ms: u64,

    /// Maximum delay in milliseconds. Default: 30000
    pub max_delay_ms: u64,

    /// Backoff multiplier. Default: 2.0
    pub backoff_multiplier: f64,

    /// Maximum jitter in milliseconds (random 0-jitter added). Default: 100
    pub jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30000,
            backoff_multiplier: 2.0,
            jitter_ms: 100,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::default()
    }

    /// Calculate the backoff delay after a failed attempt.
    ///
    /// `attempt` counts completed attempts, starting at 0 for the initial
    /// one: base_delay * (multiplier ^ attempt), capped, plus jitter.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let exponential =
            self.base_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);

        let capped = exponential.min(self.max_delay_ms as f64);

        let jitter = rand::random::<f64>() * self.jitter_ms as f64;

        Duration::from_millis((capped + jitter) as u64)
    }
}

/// Builder for RetryConfig.
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    retries: Option<u32>,
    base_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
    backoff_multiplier: Option<f64>,
    jitter_ms: Option<u64>,
}

impl RetryConfigBuilder {
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = Some(delay);
        self
    }

    pub fn max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = Some(delay);
        self
    }

    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = Some(multiplier);
        self
    }

    pub fn jitter_ms(mut self, jitter: u64) -> Self {
        self.jitter_ms = Some(jitter);
        self
    }

    pub fn build(self) -> RetryConfig {
        RetryConfig {
            retries: self.retries.unwrap_or(3),
            base_delay_ms: self.base_delay_ms.unwrap_or(1000),
            max_delay_ms: self.max_delay_ms.unwrap_or(30000),
            backoff_multiplier: self.backoff_multiplier.unwrap_or(2.0),
            jitter_ms: self.jitter_ms.unwrap_or(100),
        }
    }
}

/// Determine if a delivery failure is retryable.
///
/// Connection-level failures, 5xx responses, and 429 rate limiting are
/// retried. Any other non-success HTTP outcome is terminal.
pub fn is_retryable(error: &AnalyticsError) -> bool {
    matches!(
        error.code,
        ErrorCode::NetworkError
            | ErrorCode::NetworkTimeout
            | ErrorCode::HttpTimeout
            | ErrorCode::HttpNetworkError
            | ErrorCode::HttpServerError
            | ErrorCode::HttpRateLimited
    )
}

/// Execute an async operation with the default retry classification.
pub async fn with_retry<T, F, Fut>(operation: F, config: &RetryConfig) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    with_retry_predicate(operation, config, is_retryable).await
}

/// Execute an async operation with retry logic and a custom retry predicate.
///
/// Runs one initial attempt plus up to `config.retries` retries, sleeping
/// the backoff delay between attempts. Non-retryable errors return
/// immediately; otherwise the last error is returned once attempts are
/// exhausted.
pub async fn with_retry_predicate<T, F, Fut, P>(
    operation: F,
    config: &RetryConfig,
    should_retry: P,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&AnalyticsError) -> bool,
{
    let mut last_error: Option<AnalyticsError> = None;

    for attempt in 0..=config.retries {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !should_retry(&e) {
                    return Err(e);
                }

                last_error = Some(e);

                if attempt < config.retries {
                    let delay = config.calculate_delay(attempt);
                    tracing::debug!(
                        "Retry {} of {}, waiting {:?}",
                        attempt + 1,
                        config.retries,
                        delay
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        AnalyticsError::network_error(
            ErrorCode::NetworkRetryLimit,
            "Maximum retry attempts exceeded",
        )
    }))
}
