//! Bounded retry loop
//!
//! Composes the classifier, the backoff calculator and an optional circuit
//! breaker around a caller-supplied attempt. Per attempt:
//!
//! 1. stop if cancelled; stop with `CircuitOpen` if the breaker refuses
//! 2. run the attempt; on success record it and return
//! 3. classify the failure and record it on the breaker
//! 4. terminal classification or last attempt: return the terminal error
//! 5. otherwise notify the `on_error` hook and sleep (cancellable)
//!
//! The loop keeps no history beyond the attempt counter and the last error
//! with its classification.

use std::future::Future;
use std::time::Duration;
use structgen_async_utils::sleep_or_cancel;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::RetryError;
use super::backoff::calculate_delay;
use super::circuit_breaker::CircuitBreaker;
use super::classifier::{ErrorType, classify_error};
use super::hook::RetryStatus;
use super::policy::RetryConfig;

/// Execute `operation` with retries.
///
/// # Example
/// ```ignore
/// let result = execute_with_retry(
///     || async { provider.generate(&request).await },
///     &RetryConfig::default(),
///     Some(&breaker),
/// )
/// .await;
/// ```
pub async fn execute_with_retry<F, Fut, T, E>(
    operation: F,
    config: &RetryConfig,
    breaker: Option<&CircuitBreaker>,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<T, E>> + Send,
    E: std::error::Error + Send + Sync + 'static,
{
    let never = CancellationToken::new();
    execute_with_retry_cancellable(operation, config, breaker, &never).await
}

/// Execute `operation` with retries, aborting when `cancel` fires.
///
/// Cancellation is observed at the top of every iteration and during each
/// backoff sleep; an attempt already in flight is allowed to finish.
pub async fn execute_with_retry_cancellable<F, Fut, T, E>(
    mut operation: F,
    config: &RetryConfig,
    breaker: Option<&CircuitBreaker>,
    cancel: &CancellationToken,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<T, E>> + Send,
    E: std::error::Error + Send + Sync + 'static,
{
    let start_time = Instant::now();
    let max_attempts = config.effective_max_attempts();
    let max_elapsed = config.max_elapsed_ms.map(Duration::from_millis);
    let mut last_error: Option<E> = None;
    let mut last_classification: Option<(ErrorType, &'static str)> = None;
    let mut attempt: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled {
                attempts: attempt,
                last_error,
                classification: last_classification,
            });
        }

        // Refusal here does not consume an attempt.
        if let Some(breaker) = breaker
            && !breaker.can_execute()
        {
            return Err(RetryError::CircuitOpen {
                attempts: attempt,
                last_error,
                classification: last_classification,
            });
        }

        attempt += 1;
        let err = match operation().await {
            Ok(value) => {
                if let Some(breaker) = breaker {
                    breaker.record_success();
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        let decision = classify_error(&err, attempt);
        if let Some(breaker) = breaker {
            breaker.record_failure();
        }

        if !decision.should_retry {
            return Err(RetryError::NonRetryable {
                source: err,
                error_type: decision.error_type,
                reason: decision.reason,
                attempts: attempt,
            });
        }

        if attempt >= max_attempts {
            return Err(RetryError::AttemptsExhausted {
                source: err,
                error_type: decision.error_type,
                reason: decision.reason,
                attempts: attempt,
            });
        }

        let delay = decision
            .custom_delay
            .unwrap_or_else(|| calculate_delay(attempt, Some(config)));
        let elapsed = start_time.elapsed();

        if let Some(max) = max_elapsed
            && elapsed.saturating_add(delay) > max
        {
            return Err(RetryError::Timeout {
                source: err,
                error_type: decision.error_type,
                reason: decision.reason,
                elapsed,
                attempts: attempt,
            });
        }

        if let Some(hook) = &config.on_error {
            let status = RetryStatus {
                attempt,
                elapsed,
                delay,
                error_type: decision.error_type,
                reason: decision.reason,
                is_rate_limit: decision.error_type == ErrorType::RateLimit,
            };
            hook.notify(&err, &status).await;
        }

        if sleep_or_cancel(delay, cancel).await.is_err() {
            return Err(RetryError::Cancelled {
                attempts: attempt,
                last_error: Some(err),
                classification: Some((decision.error_type, decision.reason)),
            });
        }

        last_error = Some(err);
        last_classification = Some((decision.error_type, decision.reason));
    }
}
