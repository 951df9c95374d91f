//! Resilient client factory
//!
//! Owns the merged effective `RetryConfig` and, when configured, a circuit
//! breaker that lives as long as the client (or longer, if shared).

use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::ResilienceConfig;
use crate::retry::{
    CircuitBreaker, CircuitBreakerConfig, ErrorHook, RetryConfig, RetryConfigOverride, RetryError,
    execute_with_retry_cancellable,
};

/// Construction options; everything optional.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Partial retry settings merged over `RetryConfig::default()`
    pub retry_config: Option<RetryConfigOverride>,
    /// Breaker settings; takes precedence over `retry_config.circuit_breaker`
    pub circuit_breaker: Option<CircuitBreakerConfig>,
}

/// Runs attempts through the retry loop with this client's config and breaker.
#[derive(Debug, Clone)]
pub struct ResilientClient {
    retry_config: RetryConfig,
    circuit_breaker: Option<Arc<CircuitBreaker>>,
}

impl ResilientClient {
    pub fn new(options: ClientOptions) -> Self {
        let mut retry_config = RetryConfig::merged(
            &RetryConfig::default(),
            options.retry_config.unwrap_or_default(),
        );
        if options.circuit_breaker.is_some() {
            retry_config.circuit_breaker = options.circuit_breaker;
        }
        Self::from_retry_config(retry_config)
    }

    /// Build from a loaded configuration file.
    pub fn from_config(config: &ResilienceConfig) -> Self {
        let mut retry_config = config.retry.clone();
        if config.circuit_breaker.is_some() {
            retry_config.circuit_breaker = config.circuit_breaker;
        }
        Self::from_retry_config(retry_config)
    }

    fn from_retry_config(retry_config: RetryConfig) -> Self {
        let circuit_breaker = retry_config
            .circuit_breaker
            .map(|cb| Arc::new(CircuitBreaker::new(cb)));
        Self {
            retry_config,
            circuit_breaker,
        }
    }

    /// Gate this client with a breaker shared with other call sites.
    pub fn with_circuit_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.retry_config.circuit_breaker = Some(*breaker.config());
        self.circuit_breaker = Some(breaker);
        self
    }

    pub fn with_on_error(mut self, hook: ErrorHook) -> Self {
        self.retry_config.on_error = Some(hook);
        self
    }

    /// Effective configuration after merging overrides.
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry_config
    }

    pub fn circuit_breaker(&self) -> Option<&Arc<CircuitBreaker>> {
        self.circuit_breaker.as_ref()
    }

    pub async fn run_with_retry<F, Fut, T, E>(&self, operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        E: std::error::Error + Send + Sync + 'static,
    {
        let never = CancellationToken::new();
        self.run_with_retry_cancellable(operation, &never).await
    }

    pub async fn run_with_retry_cancellable<F, Fut, T, E>(
        &self,
        operation: F,
        cancel: &CancellationToken,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        E: std::error::Error + Send + Sync + 'static,
    {
        let result = execute_with_retry_cancellable(
            operation,
            &self.retry_config,
            self.circuit_breaker.as_deref(),
            cancel,
        )
        .await;

        if let Err(err) = &result {
            log_terminal(err);
        }
        result
    }
}

fn log_terminal<E>(err: &RetryError<E>)
where
    E: std::error::Error + 'static,
{
    match err {
        RetryError::CircuitOpen { attempts, .. } => {
            tracing::debug!(attempts, "call short-circuited, circuit breaker open");
        }
        RetryError::Cancelled { attempts, .. } => {
            tracing::debug!(attempts, "call cancelled");
        }
        RetryError::NonRetryable {
            error_type,
            attempts,
            ..
        }
        | RetryError::AttemptsExhausted {
            error_type,
            attempts,
            ..
        } => {
            tracing::warn!(%error_type, attempts, "call failed: {err}");
        }
        RetryError::Timeout {
            elapsed, attempts, ..
        } => {
            tracing::warn!(?elapsed, attempts, "call exceeded its elapsed budget: {err}");
        }
    }
}
