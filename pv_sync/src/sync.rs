//! The sync engine: walks systems, finds uncovered days, fetches them, and
//! records the outcome so the next run starts where this one stopped.

use std::fmt;

use chrono::{Days, NaiveDate, Utc};
use diesel::SqliteConnection;
use telemetry_ingestor::errors::FetchError;
use telemetry_ingestor::models::status::StatusReading;
use telemetry_ingestor::providers::TelemetryProvider;
use tracing::{error, info, warn};

use crate::availability;
use crate::daterange::{DateRange, InvalidDateRange};
use crate::gaps;
use crate::store::SyncStore;

/// Sync failure.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The requested window is reversed.
    #[error(transparent)]
    Window(#[from] InvalidDateRange),
    /// The remote source failed or returned an undecodable payload.
    #[error("provider request failed: {0}")]
    Provider(#[from] telemetry_ingestor::Error),
    /// The local store failed; nothing was or will be written.
    #[error("store failure: {0}")]
    Store(#[from] anyhow::Error),
    /// A day's payload carried timestamps outside that day.
    #[error("system {pv_system_id} day {day}: {stray} of {total} rows fall outside the day")]
    SegmentOutOfWindow {
        /// System whose payload misbehaved.
        pv_system_id: i64,
        /// Day that was requested.
        day: NaiveDate,
        /// Rows outside the allowed window.
        stray: usize,
        /// Total rows in the payload.
        total: usize,
    },
}

/// Options for one sync run.
#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    /// First day of the requested window.
    pub start_date: NaiveDate,
    /// Last day of the requested window (inclusive).
    pub end_date: NaiveDate,
    /// Systems averaging fewer samples per day than this are skipped.
    pub min_outputs_per_day: f64,
    /// Suspend and resume on quota exhaustion instead of stopping the run.
    pub wait_on_limit: bool,
}

impl SyncOptions {
    /// Options for `start..=end` with default density threshold and
    /// quota waiting enabled.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            min_outputs_per_day: 30.0,
            wait_on_limit: true,
        }
    }
}

/// What one run accomplished.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Systems that had at least one day fetched.
    pub systems_processed: usize,
    /// Systems with nothing to do or nothing available.
    pub systems_skipped: usize,
    /// Days fetched and stored as segments.
    pub days_fetched: usize,
    /// Days newly recorded as missing.
    pub days_missing: usize,
    /// Days that failed and will be retried on the next run.
    pub day_failures: usize,
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} systems processed, {} skipped; {} days fetched, {} missing, {} failed",
            self.systems_processed,
            self.systems_skipped,
            self.days_fetched,
            self.days_missing,
            self.day_failures
        )
    }
}

enum DayOutcome {
    Fetched,
    Missing,
}

/// Syncs every system over the requested window.
///
/// Per-day failures are logged and counted but never abort the run; quota
/// exhaustion with waiting disabled and store failures do.
pub async fn sync_systems<S, P>(
    conn: &mut SqliteConnection,
    store: &S,
    provider: &P,
    pv_system_ids: &[i64],
    opts: &SyncOptions,
) -> Result<SyncReport, SyncError>
where
    S: SyncStore,
    P: TelemetryProvider + ?Sized,
{
    let window = DateRange::new(opts.start_date, opts.end_date)?;
    let mut report = SyncReport::default();

    for (position, &pv_system_id) in pv_system_ids.iter().enumerate() {
        info!(
            pv_system_id,
            "syncing system {} of {}",
            position + 1,
            pv_system_ids.len()
        );

        let missing = gaps::compute_missing_ranges(conn, store, pv_system_id, &window)?;
        if missing.is_empty() {
            info!(pv_system_id, %window, "window already covered");
            report.systems_skipped += 1;
            continue;
        }

        let ranges = match availability::clip_to_available(
            conn,
            store,
            provider,
            pv_system_id,
            &missing,
            opts.min_outputs_per_day,
            opts.wait_on_limit,
        )
        .await
        {
            Ok(ranges) => ranges,
            Err(err @ SyncError::Store(_)) => return Err(err),
            Err(err) if is_quota_stop(&err) => return Err(err),
            Err(err) => {
                warn!(pv_system_id, error = %err, "statistics unavailable; skipping system");
                report.systems_skipped += 1;
                continue;
            }
        };
        if ranges.is_empty() {
            report.systems_skipped += 1;
            continue;
        }

        let mut fetched_any = false;
        for range in &ranges {
            info!(pv_system_id, %range, "fetching range");
            for day in range.days() {
                match sync_one_day(conn, store, provider, pv_system_id, day, opts.wait_on_limit)
                    .await
                {
                    Ok(DayOutcome::Fetched) => {
                        fetched_any = true;
                        report.days_fetched += 1;
                    }
                    Ok(DayOutcome::Missing) => {
                        fetched_any = true;
                        report.days_missing += 1;
                    }
                    Err(err @ SyncError::Store(_)) => return Err(err),
                    Err(err) if is_quota_stop(&err) => return Err(err),
                    Err(err) => {
                        error!(pv_system_id, %day, error = %err, "day failed; continuing");
                        report.day_failures += 1;
                    }
                }
            }
        }

        if fetched_any {
            report.systems_processed += 1;
        } else {
            report.systems_skipped += 1;
        }
    }

    info!(%report, "sync finished");
    Ok(report)
}

async fn sync_one_day<S, P>(
    conn: &mut SqliteConnection,
    store: &S,
    provider: &P,
    pv_system_id: i64,
    day: NaiveDate,
    wait_on_limit: bool,
) -> Result<DayOutcome, SyncError>
where
    S: SyncStore,
    P: TelemetryProvider + ?Sized,
{
    let requested_at = Utc::now();
    let rows = provider.day_status(pv_system_id, day, wait_on_limit).await?;

    if rows.is_empty() {
        store.record_missing_date(conn, pv_system_id, day, requested_at)?;
        info!(pv_system_id, %day, "no data for day; recorded in ledger");
        return Ok(DayOutcome::Missing);
    }

    check_segment_window(pv_system_id, day, &rows)?;
    let written = store.append_segment(conn, pv_system_id, day, requested_at, &rows)?;
    info!(pv_system_id, %day, rows = written, "segment stored");
    Ok(DayOutcome::Fetched)
}

/// Every row must carry a date of `day` or `day + 1`; one sample spilling
/// just past midnight is a known source quirk and tolerated.
fn check_segment_window(
    pv_system_id: i64,
    day: NaiveDate,
    rows: &[StatusReading],
) -> Result<(), SyncError> {
    let next_day = day
        .checked_add_days(Days::new(1))
        .unwrap_or(NaiveDate::MAX);
    let stray = rows
        .iter()
        .filter(|r| r.ts.date() < day || r.ts.date() > next_day)
        .count();
    if stray > 0 {
        return Err(SyncError::SegmentOutOfWindow {
            pv_system_id,
            day,
            stray,
            total: rows.len(),
        });
    }
    Ok(())
}

/// Quota exhaustion surfaced to the caller ends the run; everything the run
/// completed so far is already durable.
fn is_quota_stop(err: &SyncError) -> bool {
    matches!(
        err,
        SyncError::Provider(telemetry_ingestor::Error::Fetch(
            FetchError::RateLimitExceeded { .. }
        ))
    )
}
