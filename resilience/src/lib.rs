//! Client-side resilience for structured-generation calls
//!
//! Wraps a single asynchronous attempt (the provider call lives elsewhere)
//! with error classification, jittered exponential backoff, a circuit breaker,
//! and a bounded retry loop.
//!
//! ```no_run
//! use structgen_resilience::{AttemptError, ClientOptions, ResilientClient};
//!
//! # async fn demo() {
//! let client = ResilientClient::new(ClientOptions::default());
//! let result = client
//!     .run_with_retry(|| async { Ok::<_, AttemptError>("{\"ok\":true}") })
//!     .await;
//! # let _ = result;
//! # }
//! ```

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod client;
pub mod config;
pub mod error;
pub mod retry;

pub use client::{ClientOptions, ResilientClient};
pub use error::AttemptError;
pub use retry::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, ErrorType, OnErrorHook, RetryConfig,
    RetryConfigOverride, RetryDecision, RetryError, calculate_delay, classify, classify_error,
    execute_with_retry, execute_with_retry_cancellable,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
