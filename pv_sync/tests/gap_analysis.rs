mod common;

use chrono::Utc;
use common::{d, reading, setup_db};
use pv_sync::daterange::DateRange;
use pv_sync::gaps::compute_missing_ranges;
use pv_sync::store::{SqliteStore, SyncStore};

#[test]
fn empty_store_misses_whole_window() {
    let (_db, mut conn) = setup_db();
    let store = SqliteStore::new();
    let window = DateRange::new(d(2019, 1, 1), d(2019, 1, 10)).unwrap();

    let missing = compute_missing_ranges(&mut conn, &store, 123, &window).unwrap();
    assert_eq!(missing, vec![window]);
}

#[test]
fn coverage_punches_holes_into_ranges() {
    let (_db, mut conn) = setup_db();
    let store = SqliteStore::new();
    let now = Utc::now();

    // Segment on the 3rd, missing record on the 7th.
    store
        .append_segment(&mut conn, 123, d(2019, 1, 3), now, &[reading(d(2019, 1, 3), 9, 0)])
        .unwrap();
    store
        .record_missing_date(&mut conn, 123, d(2019, 1, 7), now)
        .unwrap();

    let window = DateRange::new(d(2019, 1, 1), d(2019, 1, 10)).unwrap();
    let missing = compute_missing_ranges(&mut conn, &store, 123, &window).unwrap();
    assert_eq!(
        missing,
        vec![
            DateRange::new(d(2019, 1, 1), d(2019, 1, 2)).unwrap(),
            DateRange::new(d(2019, 1, 4), d(2019, 1, 6)).unwrap(),
            DateRange::new(d(2019, 1, 8), d(2019, 1, 10)).unwrap(),
        ]
    );
}

#[test]
fn fully_covered_window_has_no_gaps() {
    let (_db, mut conn) = setup_db();
    let store = SqliteStore::new();
    let now = Utc::now();

    let window = DateRange::new(d(2019, 1, 1), d(2019, 1, 3)).unwrap();
    for day in window.days() {
        store
            .append_segment(&mut conn, 123, day, now, &[reading(day, 9, 0)])
            .unwrap();
    }

    let missing = compute_missing_ranges(&mut conn, &store, 123, &window).unwrap();
    assert!(missing.is_empty());
}

#[test]
fn single_day_window_round_trips() {
    let (_db, mut conn) = setup_db();
    let store = SqliteStore::new();

    let window = DateRange::single(d(2019, 1, 5));
    let missing = compute_missing_ranges(&mut conn, &store, 123, &window).unwrap();
    assert_eq!(missing, vec![window]);
}
