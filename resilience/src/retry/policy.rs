//! Retry and circuit breaker configuration
//!
//! `RetryConfig::default()` is the immutable baseline; callers supply a
//! `RetryConfigOverride` and get a field-by-field merge where the override wins.

use serde::{Deserialize, Serialize};

use super::hook::ErrorHook;

/// Effective retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first call. Values below 1 behave as 1.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt, in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Exponential growth base applied per failed attempt
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Ceiling for the computed delay (None = uncapped)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: Option<u64>,

    /// Apply ±25% randomness to computed delays
    #[serde(default = "default_true")]
    pub jitter: bool,

    /// Circuit breaker settings for clients built from this config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circuit_breaker: Option<CircuitBreakerConfig>,

    /// Total elapsed budget across all attempts and waits.
    /// Retries stop instead of sleeping past it. Default: None (attempts only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_elapsed_ms: Option<u64>,

    /// Invoked once per retryable failure that will be retried
    #[serde(skip)]
    pub on_error: Option<ErrorHook>,
}

/// Partial retry configuration; `None` keeps the default value.
#[derive(Debug, Clone, Default)]
pub struct RetryConfigOverride {
    pub max_attempts: Option<u32>,
    pub initial_delay_ms: Option<u64>,
    pub backoff_factor: Option<f64>,
    /// `Some(None)` removes the ceiling; `None` keeps the default one.
    pub max_delay_ms: Option<Option<u64>>,
    pub jitter: Option<bool>,
    pub circuit_breaker: Option<CircuitBreakerConfig>,
    pub max_elapsed_ms: Option<u64>,
    pub on_error: Option<ErrorHook>,
}

/// Circuit breaker configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that trip the breaker
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Time spent open before a trial call is allowed, in milliseconds
    #[serde(default = "default_reset_timeout_ms")]
    pub reset_timeout_ms: u64,

    /// A disabled breaker never opens
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_initial_delay_ms() -> u64 {
    1000
}
fn default_backoff_factor() -> f64 {
    2.0
}
fn default_max_delay_ms() -> Option<u64> {
    Some(30_000)
}
fn default_true() -> bool {
    true
}
fn default_failure_threshold() -> u32 {
    5
}
fn default_reset_timeout_ms() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            backoff_factor: default_backoff_factor(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_true(),
            circuit_breaker: None,
            max_elapsed_ms: None,
            on_error: None,
        }
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            reset_timeout_ms: default_reset_timeout_ms(),
            enabled: default_true(),
        }
    }
}

impl RetryConfig {
    /// Merge `overrides` onto `defaults`, field by field. Neither input is mutated.
    pub fn merged(defaults: &RetryConfig, overrides: RetryConfigOverride) -> RetryConfig {
        RetryConfig {
            max_attempts: overrides.max_attempts.unwrap_or(defaults.max_attempts),
            initial_delay_ms: overrides
                .initial_delay_ms
                .unwrap_or(defaults.initial_delay_ms),
            backoff_factor: overrides.backoff_factor.unwrap_or(defaults.backoff_factor),
            max_delay_ms: overrides.max_delay_ms.unwrap_or(defaults.max_delay_ms),
            jitter: overrides.jitter.unwrap_or(defaults.jitter),
            circuit_breaker: overrides.circuit_breaker.or(defaults.circuit_breaker),
            max_elapsed_ms: overrides.max_elapsed_ms.or(defaults.max_elapsed_ms),
            on_error: overrides.on_error.or_else(|| defaults.on_error.clone()),
        }
    }

    /// Attempt budget with the lower bound applied.
    pub fn effective_max_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}
