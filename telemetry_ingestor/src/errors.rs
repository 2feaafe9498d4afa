use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::transport::TransportError;

/// Errors raised by the rate-limited fetcher.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The per-period request quota is exhausted and the caller opted out of
    /// waiting (or the wait-then-retry also came back exhausted).
    #[error("rate limit exceeded; quota resets at {reset_time}")]
    RateLimitExceeded {
        /// When the remote quota counter resets.
        reset_time: DateTime<Utc>,
    },

    /// A non-2xx status outside the "no data" / quota cases. Never retried.
    #[error("request failed with status {status}: {body}")]
    TransportFailure { status: u16, body: String },

    /// Connection-level failure before any status was received.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors raised while decoding a wire payload into rows.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload carries more data columns than the supported schema.
    /// Raised for the consumption variant of batch history.
    #[error("unsupported schema: record has {num_columns} columns")]
    UnsupportedSchema { num_columns: usize },

    #[error("csv decode failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("bad timestamp {value:?}")]
    BadTimestamp { value: String },

    #[error("bad numeric field {value:?}")]
    BadNumber { value: String },
}

/// The unified error type for the `telemetry_ingestor` crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Requests for dates strictly in the future are rejected before any
    /// network call.
    #[error("requested date {0} is in the future")]
    FutureDate(NaiveDate),

    /// The asynchronous batch endpoint never produced data within the
    /// allowed number of polls.
    #[error("batch status not ready after {attempts} attempts")]
    PollExhausted { attempts: u32 },

    /// A data-service operation was requested without a data-service URL.
    #[error("data_service_url is not configured")]
    DataServiceUnconfigured,
}
