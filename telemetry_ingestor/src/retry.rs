//! Bounded-wait primitives shared by the quota suspension and the
//! asynchronous batch-status polling loop.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

/// Outcome of one polling attempt.
pub enum PollOutcome<T> {
    /// The operation produced its result.
    Ready(T),
    /// The remote side is still working; poll again after the interval.
    Pending,
}

/// Runs `op` until it reports [`PollOutcome::Ready`], at most `max_attempts`
/// times, sleeping `interval` between attempts.
///
/// Returns `Ok(None)` when every attempt came back pending; errors from `op`
/// propagate immediately.
pub async fn poll_until<T, E, F, Fut>(
    max_attempts: u32,
    interval: Duration,
    mut op: F,
) -> Result<Option<T>, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<PollOutcome<T>, E>>,
{
    for attempt in 0..max_attempts {
        match op(attempt).await? {
            PollOutcome::Ready(value) => return Ok(Some(value)),
            PollOutcome::Pending => {
                if attempt + 1 < max_attempts {
                    debug!(attempt, ?interval, "not ready yet; sleeping");
                    tokio::time::sleep(interval).await;
                }
            }
        }
    }
    Ok(None)
}

/// Sleeps until `deadline`, measured against the injected clock.
///
/// A deadline already in the past returns immediately. The sleep goes through
/// `tokio::time` so paused-clock tests can observe and fast-forward it.
pub async fn sleep_until_utc(deadline: DateTime<Utc>, now: fn() -> DateTime<Utc>) {
    let wait = deadline - now();
    if let Ok(wait) = wait.to_std() {
        tokio::time::sleep(wait).await;
    }
}
