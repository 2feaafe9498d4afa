//! Gap analysis: which days inside a requested window still need fetching.
//!
//! Coverage is held as a roaring bitmap over day numbers. The missing set is
//! `window - covered`, coalesced back into contiguous day ranges so callers
//! see a handful of ranges instead of thousands of single days.

use anyhow::Context;
use diesel::SqliteConnection;
use roaring::RoaringBitmap;

use crate::daterange::{self, DateRange};
use crate::store::{StoreResult, SyncStore};

/// Days in `window` with no segment and no missing-date record, as ascending
/// disjoint ranges. Empty when the window is fully covered.
pub fn compute_missing_ranges<S: SyncStore>(
    conn: &mut SqliteConnection,
    store: &S,
    pv_system_id: i64,
    window: &DateRange,
) -> StoreResult<Vec<DateRange>> {
    let covered = store.covered_days(conn, pv_system_id, window)?;

    let start_bit = u32::try_from(daterange::day_number(window.start_date()))
        .context("window start precedes epoch")?;
    let end_bit = u32::try_from(daterange::day_number(window.end_date()))
        .context("window end precedes epoch")?;

    let mut wanted = RoaringBitmap::new();
    wanted.insert_range(start_bit..=end_bit);

    let missing = &wanted - &covered;
    Ok(coalesce_runs(&missing))
}

/// Coalesces consecutive day numbers into inclusive ranges.
fn coalesce_runs(missing: &RoaringBitmap) -> Vec<DateRange> {
    let mut out = Vec::new();
    let mut it = missing.iter();
    if let Some(mut run_start) = it.next() {
        let mut prev = run_start;
        for bit in it {
            if bit == prev + 1 {
                prev = bit;
                continue;
            }
            out.push(run_to_range(run_start, prev));
            run_start = bit;
            prev = bit;
        }
        out.push(run_to_range(run_start, prev));
    }
    out
}

fn run_to_range(start_bit: u32, end_bit: u32) -> DateRange {
    DateRange::new(
        daterange::date_from_day_number(start_bit),
        daterange::date_from_day_number(end_bit),
    )
    .expect("run bounds are ordered")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn bit(day: NaiveDate) -> u32 {
        u32::try_from(daterange::day_number(day)).unwrap()
    }

    #[test]
    fn coalesce_splits_on_holes() {
        let mut rb = RoaringBitmap::new();
        for day in [d(2019, 1, 1), d(2019, 1, 2), d(2019, 1, 5)] {
            rb.insert(bit(day));
        }
        let runs = coalesce_runs(&rb);
        assert_eq!(
            runs,
            vec![
                DateRange::new(d(2019, 1, 1), d(2019, 1, 2)).unwrap(),
                DateRange::single(d(2019, 1, 5)),
            ]
        );
    }

    #[test]
    fn empty_bitmap_coalesces_to_no_runs() {
        assert!(coalesce_runs(&RoaringBitmap::new()).is_empty());
    }
}
