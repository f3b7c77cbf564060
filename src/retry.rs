//! Bounded exponential backoff around upstream calls.

use crate::error::GatewayError;
use log::{debug, warn};
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Spread delays over `[d/2, d]` so concurrent callers do not retry in lockstep.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: true,
        }
    }
}

/// Per-call bookkeeping. Lives for one [`RetryPolicy::run`] and is dropped with it.
#[derive(Debug, Default)]
pub struct RetryState {
    pub attempt: u32,
    pub next_backoff: Duration,
    pub last_failure: Option<String>,
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based): `base * 2^(attempt-1)`, capped.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1u32 << exp).min(self.max_delay);
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let max_ms = delay.as_millis() as u64;
        let jitter = fastrand::u64(0..=max_ms / 2);
        Duration::from_millis(max_ms - max_ms / 2 + jitter)
    }

    /// An explicit retry-after from upstream wins over the computed backoff.
    pub fn delay_for(&self, attempt: u32, err: &GatewayError) -> Duration {
        err.retry_after().unwrap_or_else(|| self.backoff_for(attempt))
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// The last transient failure is returned unchanged once the bound is hit.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let mut state = RetryState::default();
        loop {
            state.attempt += 1;
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() && state.attempt < self.max_attempts.max(1) => {
                    // A reset window longer than the cap would outlive the call deadline.
                    if let Some(wait) = e.retry_after().filter(|w| *w > self.max_delay) {
                        warn!(
                            "{} attempt {}/{} failed ({}), upstream asks to wait {:?}; not retrying",
                            label, state.attempt, self.max_attempts, e, wait
                        );
                        return Err(e);
                    }
                    state.next_backoff = self.delay_for(state.attempt, &e);
                    warn!(
                        "{} attempt {}/{} failed ({}), retrying in {:?}",
                        label, state.attempt, self.max_attempts, e, state.next_backoff
                    );
                    state.last_failure = Some(e.to_string());
                    tokio::time::sleep(state.next_backoff).await;
                }
                Err(e) => {
                    if e.is_transient() {
                        warn!("{} giving up after {} attempts: {}", label, state.attempt, e);
                    } else {
                        debug!("{} failed permanently: {}", label, e);
                    }
                    return Err(e);
                }
            }
        }
    }
}
