//! Provider abstraction for telemetry sources.
//!
//! [`TelemetryProvider`] is the unified interface for fetching per-day
//! status history, summary statistics, and batch history from a remote
//! telemetry service. The concrete PVOutput-style implementation lives in
//! [`pvoutput`]; tests substitute fakes through the same trait.

pub mod pvoutput;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::Error;
use crate::models::statistics::Statistic;
use crate::models::status::{BatchReading, StatusReading};

#[async_trait]
pub trait TelemetryProvider: Send + Sync {
    /// Fetches one day of status history for a system, sorted ascending by
    /// timestamp. An empty vec is the source authoritatively reporting that
    /// no data exists for that day.
    async fn day_status(
        &self,
        system_id: i64,
        day: NaiveDate,
        wait_on_limit: bool,
    ) -> Result<Vec<StatusReading>, Error>;

    /// Fetches summary statistics over an optional date window.
    async fn statistic(
        &self,
        system_id: i64,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
        wait_on_limit: bool,
    ) -> Result<Statistic, Error>;

    /// Fetches batch history through the asynchronous data-service endpoint,
    /// polling until the result is ready or `max_attempts` is reached.
    async fn batch_status(
        &self,
        system_id: i64,
        date_to: Option<NaiveDate>,
        max_attempts: u32,
        wait_on_limit: bool,
    ) -> Result<Vec<BatchReading>, Error>;
}
