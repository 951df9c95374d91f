//! Per-failure observability hook
//!
//! Invoked for every retryable failure that will be retried, after the
//! breaker has recorded it and before the backoff sleep. A hook that fails
//! or panics is logged and ignored; it never aborts the retry loop.

use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use super::classifier::ErrorType;

/// Snapshot handed to the hook for one retryable failure.
#[derive(Debug, Clone)]
pub struct RetryStatus {
    /// Attempt that just failed (1-indexed)
    pub attempt: u32,
    /// Total elapsed time since the first attempt
    pub elapsed: Duration,
    /// Wait before the next attempt
    pub delay: Duration,
    /// Classification of the failure
    pub error_type: ErrorType,
    /// Human-readable reason from the classifier
    pub reason: &'static str,
    /// True when the delay is the fixed rate-limit delay (vs exponential backoff)
    pub is_rate_limit: bool,
}

/// Observer of retryable failures
#[async_trait]
pub trait OnErrorHook: Send + Sync {
    async fn on_error(
        &self,
        error: &(dyn std::error::Error + Send + Sync + 'static),
        status: &RetryStatus,
    ) -> anyhow::Result<()>;
}

/// Cloneable handle to an installed hook
#[derive(Clone)]
pub struct ErrorHook(Arc<dyn OnErrorHook>);

impl ErrorHook {
    pub fn new<H>(hook: H) -> Self
    where
        H: OnErrorHook + 'static,
    {
        Self(Arc::new(hook))
    }

    /// Adapt a synchronous closure.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&(dyn std::error::Error + Send + Sync + 'static), &RetryStatus) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        Self::new(FnHook(f))
    }

    /// Hook that does nothing.
    pub fn noop() -> Self {
        Self::new(NoopHook)
    }

    pub(crate) async fn notify(
        &self,
        error: &(dyn std::error::Error + Send + Sync + 'static),
        status: &RetryStatus,
    ) {
        match AssertUnwindSafe(self.0.on_error(error, status))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(hook_err)) => {
                tracing::warn!(
                    attempt = status.attempt,
                    error_type = %status.error_type,
                    "on_error hook failed, continuing retries: {hook_err:#}"
                );
            }
            Err(payload) => {
                tracing::warn!(
                    attempt = status.attempt,
                    error_type = %status.error_type,
                    "on_error hook panicked, continuing retries: {}",
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        *msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}

impl fmt::Debug for ErrorHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ErrorHook(..)")
    }
}

impl From<Arc<dyn OnErrorHook>> for ErrorHook {
    fn from(hook: Arc<dyn OnErrorHook>) -> Self {
        Self(hook)
    }
}

struct NoopHook;

#[async_trait]
impl OnErrorHook for NoopHook {
    async fn on_error(
        &self,
        _error: &(dyn std::error::Error + Send + Sync + 'static),
        _status: &RetryStatus,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

struct FnHook<F>(F);

#[async_trait]
impl<F> OnErrorHook for FnHook<F>
where
    F: Fn(&(dyn std::error::Error + Send + Sync + 'static), &RetryStatus) -> anyhow::Result<()>
        + Send
        + Sync,
{
    async fn on_error(
        &self,
        error: &(dyn std::error::Error + Send + Sync + 'static),
        status: &RetryStatus,
    ) -> anyhow::Result<()> {
        (self.0)(error, status)
    }
}
