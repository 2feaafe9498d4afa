//! Local cache store: per-day telemetry segments, the missing-dates ledger,
//! and summary-statistics snapshots.

pub mod models;
mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::SqliteConnection;
use roaring::RoaringBitmap;
use telemetry_ingestor::models::status::StatusReading;

use crate::daterange::DateRange;

/// Store operations return `anyhow::Result`; callers treat failures as fatal.
pub type StoreResult<T> = anyhow::Result<T>;

/// Cached summary statistics for one system, plus the query window they were
/// fetched with.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsSnapshot {
    /// System the snapshot belongs to.
    pub pv_system_id: i64,
    /// First day the source actually has data for, if any.
    pub actual_date_from: Option<NaiveDate>,
    /// Last day the source actually has data for, if any.
    pub actual_date_to: Option<NaiveDate>,
    /// Number of samples across the actual window.
    pub num_outputs: i64,
    /// Start bound of the query that produced the snapshot; `None` means the
    /// query was unbounded at the start.
    pub query_date_from: Option<NaiveDate>,
    /// End bound of the query that produced the snapshot.
    pub query_date_to: NaiveDate,
    /// When the snapshot was fetched.
    pub requested_at: DateTime<Utc>,
}

impl StatisticsSnapshot {
    /// True if the snapshot's query window already covers a request for
    /// `date_from..date_to` and can be reused without a network call.
    pub fn is_fresh_for(&self, date_from: Option<NaiveDate>, date_to: Option<NaiveDate>) -> bool {
        let from_ok = match (date_from, self.query_date_from) {
            (None, _) | (Some(_), None) => true,
            (Some(df), Some(qdf)) => qdf <= df,
        };
        let to_ok = match date_to {
            None => true,
            Some(dt) => self.query_date_to >= dt,
        };
        from_ok && to_ok
    }

    /// Window the source actually holds data for; `None` when the source
    /// reported no data at all.
    pub fn actual_window(&self) -> Option<DateRange> {
        match (self.actual_date_from, self.actual_date_to) {
            (Some(from), Some(to)) if from <= to => DateRange::new(from, to).ok(),
            _ => None,
        }
    }
}

/// Persistence seam for the sync engine.
///
/// Every method takes the connection explicitly so callers control
/// transactions and tests can run on temp databases.
pub trait SyncStore {
    /// Bitmap of day numbers inside `window` that are covered, either by a
    /// stored segment or by a missing-date record.
    fn covered_days(
        &self,
        conn: &mut SqliteConnection,
        pv_system_id: i64,
        window: &DateRange,
    ) -> StoreResult<RoaringBitmap>;

    /// Appends one day's rows as a segment keyed by `query_date`.
    ///
    /// Returns the number of rows written. The whole segment lands in one
    /// transaction.
    fn append_segment(
        &self,
        conn: &mut SqliteConnection,
        pv_system_id: i64,
        query_date: NaiveDate,
        requested_at: DateTime<Utc>,
        rows: &[StatusReading],
    ) -> StoreResult<usize>;

    /// Records a day the source authoritatively has no data for. Re-recording
    /// the same day is a no-op.
    fn record_missing_date(
        &self,
        conn: &mut SqliteConnection,
        pv_system_id: i64,
        day: NaiveDate,
        requested_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Latest statistics snapshot for a system, if one is cached.
    fn statistics_get(
        &self,
        conn: &mut SqliteConnection,
        pv_system_id: i64,
    ) -> StoreResult<Option<StatisticsSnapshot>>;

    /// Replaces the cached snapshot for `snapshot.pv_system_id` atomically.
    fn statistics_replace(
        &self,
        conn: &mut SqliteConnection,
        snapshot: &StatisticsSnapshot,
    ) -> StoreResult<()>;

    /// Number of stored telemetry rows for a system.
    fn status_row_count(&self, conn: &mut SqliteConnection, pv_system_id: i64)
    -> StoreResult<i64>;

    /// Days recorded as missing for a system, ascending.
    fn missing_dates(
        &self,
        conn: &mut SqliteConnection,
        pv_system_id: i64,
    ) -> StoreResult<Vec<NaiveDate>>;
}
