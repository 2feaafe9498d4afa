//! Rate-limited fetcher.
//!
//! The fetcher is the single arbiter of request pacing: every logical API
//! call goes through [`RateLimitedFetcher::fetch`], which
//! - updates [`RateLimitState`] from the quota headers on every response,
//! - maps the "no result for this query" status to [`Fetched::NoData`]
//!   instead of an error, so callers can record absence as authoritative,
//! - on quota exhaustion either suspends until the reported reset time
//!   (plus a safety margin) and retries the same request once, or surfaces
//!   [`FetchError::RateLimitExceeded`] when the caller opted out of waiting.
//!
//! Exhaustion is honored both ways: a 403 quota response suspends before the
//! retry, and a previously reported `remaining = 0` suspends before the next
//! request is issued at all.
//!
//! The clock is injectable so suspension is testable with a paused runtime.

use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::errors::FetchError;
use crate::retry;
use crate::transport::Transport;

/// Response header carrying the requests left in the current quota period.
pub const RATE_LIMIT_REMAINING_HEADER: &str = "X-Rate-Limit-Remaining";
/// Response header carrying the quota period size.
pub const RATE_LIMIT_TOTAL_HEADER: &str = "X-Rate-Limit-Limit";
/// Response header carrying the reset instant as unix seconds.
pub const RATE_LIMIT_RESET_HEADER: &str = "X-Rate-Limit-Reset";

/// Extra wait in seconds added on top of `reset_time - now` before retrying,
/// so the retry never lands on the exact reset boundary.
pub const DEFAULT_SAFETY_MARGIN_SECS: i64 = 180;

/// Quota state as last reported by the remote source.
///
/// `remaining` is authoritative only immediately after a response; it is
/// never decremented speculatively between requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RateLimitState {
    pub remaining: Option<i64>,
    pub total: Option<i64>,
    pub reset_time: Option<DateTime<Utc>>,
}

impl RateLimitState {
    fn update_from_headers(&mut self, headers: &IndexMap<String, String>) {
        if let Some(v) = header_i64(headers, RATE_LIMIT_REMAINING_HEADER) {
            self.remaining = Some(v);
        }
        if let Some(v) = header_i64(headers, RATE_LIMIT_TOTAL_HEADER) {
            self.total = Some(v);
        }
        if let Some(secs) = header_i64(headers, RATE_LIMIT_RESET_HEADER) {
            self.reset_time = Utc.timestamp_opt(secs, 0).single();
        }
    }
}

fn header_i64(headers: &IndexMap<String, String>, name: &str) -> Option<i64> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .and_then(|(_, v)| v.trim().parse().ok())
}

/// One logical request: target URL, query parameters and request headers.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    pub url: String,
    pub params: Vec<(String, String)>,
    pub headers: IndexMap<String, String>,
}

/// Decoded fetch result. `NoData` is the remote source authoritatively
/// reporting that the query has no result; it is success, not failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fetched {
    Data(String),
    NoData,
}

enum Issued {
    Done(Fetched),
    QuotaExhausted { reset_time: DateTime<Utc> },
}

/// Fetcher wrapping a [`Transport`] with quota tracking and suspension.
pub struct RateLimitedFetcher<T> {
    transport: T,
    state: Mutex<RateLimitState>,
    safety_margin: Duration,
    now: fn() -> DateTime<Utc>,
}

impl<T: Transport> RateLimitedFetcher<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: Mutex::new(RateLimitState::default()),
            safety_margin: Duration::seconds(DEFAULT_SAFETY_MARGIN_SECS),
            now: Utc::now,
        }
    }

    /// Overrides the safety margin added to the quota wait.
    pub fn with_safety_margin(mut self, margin: Duration) -> Self {
        self.safety_margin = margin;
        self
    }

    /// Overrides the wall clock. Intended for tests that pause time.
    pub fn with_now(mut self, now: fn() -> DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Snapshot of the quota state after the most recent response.
    pub fn state(&self) -> RateLimitState {
        *self.state.lock().expect("rate limit state lock")
    }

    /// Reset instant when the last response reported the quota exhausted and
    /// that reset is still in the future.
    fn known_exhausted_until(&self) -> Option<DateTime<Utc>> {
        let state = self.state.lock().expect("rate limit state lock");
        match (state.remaining, state.reset_time) {
            (Some(remaining), Some(reset_time))
                if remaining <= 0 && reset_time > (self.now)() =>
            {
                Some(reset_time)
            }
            _ => None,
        }
    }

    async fn suspend_until(&self, reset_time: DateTime<Utc>) {
        let deadline = reset_time + self.safety_margin;
        warn!(
            %reset_time,
            wait_secs = (deadline - (self.now)()).num_seconds(),
            "rate limit exceeded; suspending until quota reset"
        );
        retry::sleep_until_utc(deadline, self.now).await;
        info!("quota reset reached; resuming requests");
    }

    /// Issues the request; on quota exhaustion, waits until the reported
    /// reset (plus the safety margin) and retries once, unless
    /// `wait_on_limit` is false in which case the exhaustion is surfaced.
    ///
    /// A quota already known exhausted from the previous response suspends
    /// before any request goes out.
    pub async fn fetch(&self, req: &ApiRequest, wait_on_limit: bool) -> Result<Fetched, FetchError> {
        if let Some(reset_time) = self.known_exhausted_until() {
            if !wait_on_limit {
                return Err(FetchError::RateLimitExceeded { reset_time });
            }
            self.suspend_until(reset_time).await;
        }

        match self.issue(req).await? {
            Issued::Done(fetched) => Ok(fetched),
            Issued::QuotaExhausted { reset_time } => {
                if !wait_on_limit {
                    return Err(FetchError::RateLimitExceeded { reset_time });
                }
                self.suspend_until(reset_time).await;
                match self.issue(req).await? {
                    Issued::Done(fetched) => Ok(fetched),
                    Issued::QuotaExhausted { reset_time } => {
                        Err(FetchError::RateLimitExceeded { reset_time })
                    }
                }
            }
        }
    }

    async fn issue(&self, req: &ApiRequest) -> Result<Issued, FetchError> {
        let response = self
            .transport
            .get(&req.url, &req.params, &req.headers)
            .await?;

        // 400 is how the source says "no result for this query".
        if response.status == 400 {
            return Ok(Issued::Done(Fetched::NoData));
        }

        // Quota headers are present on success and on the 403 quota response.
        let state = {
            let mut state = self.state.lock().expect("rate limit state lock");
            state.update_from_headers(&response.headers);
            *state
        };
        debug!(
            remaining = ?state.remaining,
            total = ?state.total,
            reset_time = ?state.reset_time,
            "rate limit state"
        );

        if response.status == 403 && state.remaining.unwrap_or(0) <= 0 {
            let reset_time = state.reset_time.unwrap_or_else(self.now);
            return Ok(Issued::QuotaExhausted { reset_time });
        }

        if !(200..300).contains(&response.status) {
            return Err(FetchError::TransportFailure {
                status: response.status,
                body: response.body,
            });
        }

        Ok(Issued::Done(Fetched::Data(response.body.trim().to_string())))
    }
}
