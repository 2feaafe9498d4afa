mod common;

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{d, reading, setup_db};

use pv_sync::store::{SqliteStore, SyncStore};
use pv_sync::sync::{SyncOptions, SyncReport, sync_systems};
use telemetry_ingestor::Error;
use telemetry_ingestor::errors::FetchError;
use telemetry_ingestor::models::statistics::Statistic;
use telemetry_ingestor::models::status::{BatchReading, StatusReading};
use telemetry_ingestor::providers::TelemetryProvider;

/// Scripted provider: serves two readings per day, a fixed statistics
/// answer, and optional per-day no-data / failure behavior.
struct FakeProvider {
    stat: Statistic,
    empty_days: Vec<NaiveDate>,
    fail_days: Vec<NaiveDate>,
    day_calls: Mutex<Vec<NaiveDate>>,
    stat_calls: AtomicUsize,
}

impl FakeProvider {
    fn new(stat: Statistic) -> Self {
        Self {
            stat,
            empty_days: Vec::new(),
            fail_days: Vec::new(),
            day_calls: Mutex::new(Vec::new()),
            stat_calls: AtomicUsize::new(0),
        }
    }

    fn with_window(from: NaiveDate, to: NaiveDate, num_outputs: i64) -> Self {
        Self::new(Statistic {
            num_outputs,
            actual_date_from: Some(from),
            actual_date_to: Some(to),
            ..Statistic::default()
        })
    }

    fn days_called(&self) -> Vec<NaiveDate> {
        self.day_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TelemetryProvider for FakeProvider {
    async fn day_status(
        &self,
        _pv_system_id: i64,
        day: NaiveDate,
        _wait_on_limit: bool,
    ) -> Result<Vec<StatusReading>, Error> {
        self.day_calls.lock().unwrap().push(day);
        if self.fail_days.contains(&day) {
            return Err(Error::Fetch(FetchError::TransportFailure {
                status: 500,
                body: "server error".into(),
            }));
        }
        if self.empty_days.contains(&day) {
            return Ok(Vec::new());
        }
        Ok(vec![reading(day, 9, 0), reading(day, 9, 5)])
    }

    async fn statistic(
        &self,
        _pv_system_id: i64,
        _date_from: Option<NaiveDate>,
        _date_to: Option<NaiveDate>,
        _wait_on_limit: bool,
    ) -> Result<Statistic, Error> {
        self.stat_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.stat.clone())
    }

    async fn batch_status(
        &self,
        _pv_system_id: i64,
        _date_to: Option<NaiveDate>,
        _max_attempts: u32,
        _wait_on_limit: bool,
    ) -> Result<Vec<BatchReading>, Error> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn sync_fetches_uncovered_days_and_reruns_are_noops() {
    let (_db, mut conn) = setup_db();
    let store = SqliteStore::new();
    let mut provider = FakeProvider::with_window(d(2019, 1, 1), d(2019, 1, 10), 300);
    provider.empty_days = vec![d(2019, 1, 4)];

    let opts = SyncOptions::new(d(2019, 1, 1), d(2019, 1, 5));
    let report = sync_systems(&mut conn, &store, &provider, &[123], &opts)
        .await
        .unwrap();

    assert_eq!(
        report,
        SyncReport {
            systems_processed: 1,
            systems_skipped: 0,
            days_fetched: 4,
            days_missing: 1,
            day_failures: 0,
        }
    );
    assert_eq!(provider.days_called().len(), 5);
    assert_eq!(store.status_row_count(&mut conn, 123).unwrap(), 8);
    assert_eq!(store.missing_dates(&mut conn, 123).unwrap(), vec![d(2019, 1, 4)]);

    // Second run over the same window: everything is covered, so neither the
    // statistics endpoint nor any day is queried again.
    let report = sync_systems(&mut conn, &store, &provider, &[123], &opts)
        .await
        .unwrap();
    assert_eq!(report.systems_skipped, 1);
    assert_eq!(report.days_fetched + report.days_missing, 0);
    assert_eq!(provider.days_called().len(), 5);
    assert_eq!(provider.stat_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.status_row_count(&mut conn, 123).unwrap(), 8);
}

#[tokio::test]
async fn availability_clips_fetches_to_actual_window() {
    let (_db, mut conn) = setup_db();
    let store = SqliteStore::new();
    // 150 outputs over 5 actual days: density 30, right at the threshold.
    let provider = FakeProvider::with_window(d(2019, 1, 3), d(2019, 1, 7), 150);

    let opts = SyncOptions::new(d(2019, 1, 1), d(2019, 1, 10));
    let report = sync_systems(&mut conn, &store, &provider, &[123], &opts)
        .await
        .unwrap();

    assert_eq!(report.days_fetched, 5);
    let called = provider.days_called();
    assert_eq!(called.first(), Some(&d(2019, 1, 3)));
    assert_eq!(called.last(), Some(&d(2019, 1, 7)));
    assert_eq!(called.len(), 5);
}

#[tokio::test]
async fn sparse_system_is_skipped_without_day_fetches() {
    let (_db, mut conn) = setup_db();
    let store = SqliteStore::new();
    // 100 outputs over 10 days: density 10, below the default threshold.
    let provider = FakeProvider::with_window(d(2019, 1, 1), d(2019, 1, 10), 100);

    let opts = SyncOptions::new(d(2019, 1, 1), d(2019, 1, 10));
    let report = sync_systems(&mut conn, &store, &provider, &[123], &opts)
        .await
        .unwrap();

    assert_eq!(report.systems_skipped, 1);
    assert!(provider.days_called().is_empty());
}

#[tokio::test]
async fn no_data_system_fetches_nothing_and_records_nothing() {
    let (_db, mut conn) = setup_db();
    let store = SqliteStore::new();
    let provider = FakeProvider::new(Statistic::default());

    let opts = SyncOptions::new(d(2019, 1, 1), d(2019, 1, 10));
    let report = sync_systems(&mut conn, &store, &provider, &[123], &opts)
        .await
        .unwrap();

    assert_eq!(report.systems_skipped, 1);
    assert!(provider.days_called().is_empty());
    assert!(store.missing_dates(&mut conn, 123).unwrap().is_empty());
    assert_eq!(store.status_row_count(&mut conn, 123).unwrap(), 0);
}

#[tokio::test]
async fn day_failure_is_counted_and_retried_next_run() {
    let (_db, mut conn) = setup_db();
    let store = SqliteStore::new();
    let mut provider = FakeProvider::with_window(d(2019, 1, 1), d(2019, 1, 3), 300);
    provider.fail_days = vec![d(2019, 1, 2)];

    let opts = SyncOptions::new(d(2019, 1, 1), d(2019, 1, 3));
    let report = sync_systems(&mut conn, &store, &provider, &[123], &opts)
        .await
        .unwrap();

    assert_eq!(report.days_fetched, 2);
    assert_eq!(report.day_failures, 1);

    // The failed day stayed uncovered; a second run retries exactly it.
    let provider = FakeProvider::with_window(d(2019, 1, 1), d(2019, 1, 3), 300);
    let report = sync_systems(&mut conn, &store, &provider, &[123], &opts)
        .await
        .unwrap();
    assert_eq!(report.days_fetched, 1);
    assert_eq!(provider.days_called(), vec![d(2019, 1, 2)]);
}

#[tokio::test]
async fn multiple_systems_sync_independently() {
    let (_db, mut conn) = setup_db();
    let store = SqliteStore::new();
    let provider = FakeProvider::with_window(d(2019, 1, 1), d(2019, 1, 2), 120);

    let opts = SyncOptions::new(d(2019, 1, 1), d(2019, 1, 2));
    let report = sync_systems(&mut conn, &store, &provider, &[1, 2], &opts)
        .await
        .unwrap();

    assert_eq!(report.systems_processed, 2);
    assert_eq!(report.days_fetched, 4);
    assert_eq!(store.status_row_count(&mut conn, 1).unwrap(), 4);
    assert_eq!(store.status_row_count(&mut conn, 2).unwrap(), 4);
}
