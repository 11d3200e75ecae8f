//! Condition polling.
//!
//! [`wait_until`] evaluates a predicate against a driver handle until it
//! returns `true`, the predicate fails, or the timeout elapses:
//!
//! - `Ok(true)` ends the wait successfully;
//! - `Err(e)` ends the wait with `e`, unchanged and never retried;
//! - `Ok(false)` sleeps for `interval` and tries again, unless more than
//!   `timeout` has passed since the first evaluation, in which case the wait
//!   fails with [`WdaError::WaitTimeout`].
//!
//! The predicate always runs at least once, even with a zero timeout.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

use crate::config::{WdaConfig, DEFAULT_WAIT_INTERVAL, DEFAULT_WAIT_TIMEOUT};
use crate::error::{Result, WdaError};

/// Timeout and interval used by the `wait` helpers when the caller does not
/// give its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitDefaults {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for WaitDefaults {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_WAIT_TIMEOUT,
            interval: DEFAULT_WAIT_INTERVAL,
        }
    }
}

impl From<&WdaConfig> for WaitDefaults {
    fn from(config: &WdaConfig) -> Self {
        Self {
            timeout: config.wait_timeout(),
            interval: config.wait_interval(),
        }
    }
}

/// Polls `condition` with a clone of `driver` until it holds.
pub async fn wait_until<D, F, Fut>(
    driver: &D,
    timeout: Duration,
    interval: Duration,
    mut condition: F,
) -> Result<()>
where
    D: Clone,
    F: FnMut(D) -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let start = Instant::now();
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        if condition(driver.clone()).await? {
            trace!(attempts, elapsed = ?start.elapsed(), "condition satisfied");
            return Ok(());
        }
        let elapsed = start.elapsed();
        if elapsed > timeout {
            trace!(attempts, ?elapsed, "condition timed out");
            return Err(WdaError::WaitTimeout { elapsed });
        }
        tokio::time::sleep(interval).await;
    }
}
