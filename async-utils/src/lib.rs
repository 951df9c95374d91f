//! Cancellation helpers for the retry loop.
//!
//! `OrCancelExt` races any future against a `CancellationToken`;
//! `sleep_or_cancel` is the backoff wait built on top of it.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// The token fired before the raced future finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl std::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("operation cancelled")
    }
}

impl std::error::Error for Cancelled {}

/// Extension trait for making futures cancellable.
#[async_trait]
pub trait OrCancelExt: Sized {
    type Output;

    /// Returns `Ok(output)` if the future completes first, or
    /// `Err(Cancelled)` once the token fires.
    ///
    /// An already-cancelled token wins even if the future is ready.
    async fn or_cancel(self, token: &CancellationToken) -> Result<Self::Output, Cancelled>;
}

#[async_trait]
impl<F> OrCancelExt for F
where
    F: Future + Send,
    F::Output: Send,
{
    type Output = F::Output;

    async fn or_cancel(self, token: &CancellationToken) -> Result<Self::Output, Cancelled> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(Cancelled),
            res = self => Ok(res),
        }
    }
}

/// Sleep for `duration` unless `token` is cancelled first.
///
/// A zero duration still observes a token that is already cancelled.
pub async fn sleep_or_cancel(duration: Duration, token: &CancellationToken) -> Result<(), Cancelled> {
    if token.is_cancelled() {
        return Err(Cancelled);
    }
    if duration.is_zero() {
        return Ok(());
    }
    tokio::time::sleep(duration).or_cancel(token).await
}
