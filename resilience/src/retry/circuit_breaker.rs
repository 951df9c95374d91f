//! Circuit breaker for cascading failure prevention
//!
//! # State Transitions
//! ```text
//! Closed   → Open:     failure_count >= failure_threshold
//! Open     → HalfOpen: can_execute() after reset_timeout has elapsed
//! HalfOpen → Closed:   record_success()
//! HalfOpen → Open:     record_failure()
//! any      → Closed:   record_success() / reset()
//! ```
//!
//! The Open → HalfOpen move happens inside `can_execute`, not on a timer.
//! State and counter live behind one mutex so a breaker shared between
//! concurrent callers never loses an update.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use super::policy::CircuitBreakerConfig;

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,   // Normal operation
    Open,     // Failure threshold exceeded, fast-fail
    HalfOpen, // Testing if service recovered
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        })
    }
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    last_failure_at: Option<Instant>,
}

impl BreakerState {
    fn closed() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            last_failure_at: None,
        }
    }
}

/// Consecutive-failure circuit breaker
///
/// Cheap to share: wrap in an `Arc` to gate several call sites that hit the
/// same downstream dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(BreakerState::closed()),
        }
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    /// Whether a call may go out now.
    ///
    /// In `Open`, returns true (and moves to `HalfOpen`) once `reset_timeout`
    /// has elapsed since the last recorded failure.
    pub fn can_execute(&self) -> bool {
        if !self.config.enabled {
            return true;
        }

        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let cooled_down = inner
                    .last_failure_at
                    .is_none_or(|at| at.elapsed() >= self.reset_timeout());
                if cooled_down {
                    inner.state = CircuitState::HalfOpen;
                    tracing::info!(
                        failure_count = inner.failure_count,
                        "circuit breaker half-open, allowing trial call"
                    );
                }
                cooled_down
            }
        }
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.failure_count = inner.failure_count.saturating_add(1);

        if !self.config.enabled {
            return;
        }

        let now = Instant::now();
        inner.last_failure_at = Some(now);
        match inner.state {
            CircuitState::Closed => {
                if inner.failure_count >= self.threshold() {
                    inner.state = CircuitState::Open;
                    tracing::warn!(
                        failure_count = inner.failure_count,
                        reset_timeout_ms = self.config.reset_timeout_ms,
                        "circuit breaker opened"
                    );
                }
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                tracing::warn!(
                    failure_count = inner.failure_count,
                    "trial call failed, circuit breaker re-opened"
                );
            }
            CircuitState::Open => {}
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        if inner.state != CircuitState::Closed {
            tracing::info!(previous = %inner.state, "circuit breaker closed after success");
        }
        *inner = BreakerState::closed();
    }

    /// Force `Closed` with a zero count, whether or not the breaker is enabled.
    pub fn reset(&self) {
        *self.lock() = BreakerState::closed();
    }

    fn threshold(&self) -> u32 {
        self.config.failure_threshold.max(1)
    }

    fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.config.reset_timeout_ms)
    }

    // A panic while holding the lock cannot leave the state half-written,
    // so a poisoned guard is still usable.
    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}
