//! Retry logic with exponential backoff
//!
//! This module provides:
//! - Error classification (retryable vs terminal) keyed on message text
//! - Exponential backoff with ±25% jitter
//! - Circuit breaker shared safely between concurrent callers
//! - Bounded-attempt retry loop with cancellation and an optional
//!   total elapsed budget
//! - `on_error` hook for observing transient failures

pub mod backoff;
pub mod circuit_breaker;
pub mod classifier;
pub mod hook;
pub mod policy;
pub mod strategy;

pub use backoff::calculate_delay;
pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use classifier::{ErrorType, RATE_LIMIT_DELAY, RetryDecision, classify, classify_error};
pub use hook::{ErrorHook, OnErrorHook, RetryStatus};
pub use policy::{CircuitBreakerConfig, RetryConfig, RetryConfigOverride};
pub use strategy::{execute_with_retry, execute_with_retry_cancellable};

use std::time::Duration;

/// Terminal outcome of a retry sequence.
///
/// Transient failures never surface here; only the final one does, together
/// with its classification and the number of attempts actually made.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// Classified as not retryable; no further attempts were made.
    #[error("Permanent error ({error_type}, not retryable): {source}")]
    NonRetryable {
        #[source]
        source: E,
        error_type: ErrorType,
        reason: &'static str,
        attempts: u32,
    },

    /// Every attempt in the budget failed with a retryable error.
    #[error("Max retry attempts exceeded after {attempts} attempts ({error_type}): {source}")]
    AttemptsExhausted {
        #[source]
        source: E,
        error_type: ErrorType,
        reason: &'static str,
        attempts: u32,
    },

    /// The breaker refused the call before an attempt was made.
    ///
    /// `classification` is the error type and reason of `last_error`; both
    /// are `None` when the breaker refused the very first attempt.
    #[error("Circuit breaker open after {attempts} attempts")]
    CircuitOpen {
        attempts: u32,
        last_error: Option<E>,
        classification: Option<(ErrorType, &'static str)>,
    },

    /// External cancellation requested.
    #[error("Retry aborted by cancellation after {attempts} attempts")]
    Cancelled {
        attempts: u32,
        last_error: Option<E>,
        classification: Option<(ErrorType, &'static str)>,
    },

    /// The next wait would have run past `max_elapsed_ms`.
    #[error("Retry timeout after {elapsed:?} and {attempts} attempts ({error_type}): {source}")]
    Timeout {
        #[source]
        source: E,
        error_type: ErrorType,
        reason: &'static str,
        elapsed: Duration,
        attempts: u32,
    },
}

impl<E> RetryError<E> {
    /// Attempts actually made before the sequence ended.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::NonRetryable { attempts, .. }
            | RetryError::AttemptsExhausted { attempts, .. }
            | RetryError::CircuitOpen { attempts, .. }
            | RetryError::Cancelled { attempts, .. }
            | RetryError::Timeout { attempts, .. } => *attempts,
        }
    }

    /// Classification of the final failure, when one was classified.
    pub fn error_type(&self) -> Option<ErrorType> {
        self.classification().map(|(error_type, _)| error_type)
    }

    pub fn reason(&self) -> Option<&'static str> {
        self.classification().map(|(_, reason)| reason)
    }

    fn classification(&self) -> Option<(ErrorType, &'static str)> {
        match self {
            RetryError::NonRetryable {
                error_type, reason, ..
            }
            | RetryError::AttemptsExhausted {
                error_type, reason, ..
            }
            | RetryError::Timeout {
                error_type, reason, ..
            } => Some((*error_type, *reason)),
            RetryError::CircuitOpen { classification, .. }
            | RetryError::Cancelled { classification, .. } => *classification,
        }
    }

    /// Last underlying error, if any attempt failed.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            RetryError::NonRetryable { source, .. }
            | RetryError::AttemptsExhausted { source, .. }
            | RetryError::Timeout { source, .. } => Some(source),
            RetryError::CircuitOpen { last_error, .. } | RetryError::Cancelled { last_error, .. } => {
                last_error.as_ref()
            }
        }
    }

    pub fn into_last_error(self) -> Option<E> {
        match self {
            RetryError::NonRetryable { source, .. }
            | RetryError::AttemptsExhausted { source, .. }
            | RetryError::Timeout { source, .. } => Some(source),
            RetryError::CircuitOpen { last_error, .. } | RetryError::Cancelled { last_error, .. } => {
                last_error
            }
        }
    }

    pub fn is_circuit_open(&self) -> bool {
        matches!(self, RetryError::CircuitOpen { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AttemptError;
    use std::error::Error as _;

    #[test]
    fn test_accessors_on_terminal_error() {
        let err = RetryError::NonRetryable {
            source: AttemptError::new("Schema validation failed"),
            error_type: ErrorType::Validation,
            reason: ErrorType::Validation.reason(),
            attempts: 1,
        };
        assert_eq!(err.attempts(), 1);
        assert_eq!(err.error_type(), Some(ErrorType::Validation));
        assert_eq!(err.reason(), Some("Validation errors are not retryable"));
        assert_eq!(
            err.source().map(ToString::to_string),
            Some("Schema validation failed".to_string())
        );
        assert_eq!(
            err.to_string(),
            "Permanent error (VALIDATION, not retryable): Schema validation failed"
        );
    }

    #[test]
    fn test_circuit_open_without_prior_attempts() {
        let err: RetryError<AttemptError> = RetryError::CircuitOpen {
            attempts: 0,
            last_error: None,
            classification: None,
        };
        assert!(err.is_circuit_open());
        assert!(!err.is_cancelled());
        assert_eq!(err.error_type(), None);
        assert_eq!(err.reason(), None);
        assert!(err.source().is_none());
        assert!(err.into_last_error().is_none());
    }

    #[test]
    fn test_timeout_keeps_classification() {
        let err = RetryError::Timeout {
            source: AttemptError::new("503 Service Unavailable"),
            error_type: ErrorType::ServerError,
            reason: ErrorType::ServerError.reason(),
            elapsed: Duration::from_millis(100),
            attempts: 2,
        };
        assert_eq!(err.error_type(), Some(ErrorType::ServerError));
        assert_eq!(err.reason(), Some(ErrorType::ServerError.reason()));
        assert_eq!(
            err.to_string(),
            "Retry timeout after 100ms and 2 attempts (SERVER_ERROR): 503 Service Unavailable"
        );
    }
}
