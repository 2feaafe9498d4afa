//! Inclusive calendar-day ranges and the day-number mapping.
//!
//! One stable epoch: 1970-01-01 is day number 0. Day numbers are what the
//! coverage bitmaps index; everything user-facing stays a [`NaiveDate`].

use std::fmt;

use chrono::{Days, NaiveDate};

/// Day number 0.
pub const EPOCH_DAY: NaiveDate = match NaiveDate::from_ymd_opt(1970, 1, 1) {
    Some(day) => day,
    None => unreachable!(),
};

/// End date precedes start date.
#[derive(Debug, thiserror::Error)]
#[error("invalid date range: {end} precedes {start}")]
pub struct InvalidDateRange {
    /// Requested first day.
    pub start: NaiveDate,
    /// Requested last day.
    pub end: NaiveDate,
}

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a range covering `start..=end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, InvalidDateRange> {
        if end < start {
            return Err(InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// A range holding exactly one day.
    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    /// First day of the range.
    pub fn start_date(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the range (inclusive).
    pub fn end_date(&self) -> NaiveDate {
        self.end
    }

    /// Number of days covered; at least 1.
    pub fn total_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// True if `day` lies inside the range.
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Overlap of the two ranges, or `None` when they are disjoint.
    pub fn intersection(&self, other: &DateRange) -> Option<DateRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if start <= end {
            Some(DateRange { start, end })
        } else {
            None
        }
    }

    /// Iterates the days in ascending order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        self.start
            .iter_days()
            .take(usize::try_from(self.total_days()).unwrap_or(usize::MAX))
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Days since the epoch; negative before 1970.
pub fn day_number(day: NaiveDate) -> i64 {
    (day - EPOCH_DAY).num_days()
}

/// Inverse of [`day_number`] for bitmap indices.
pub fn date_from_day_number(n: u32) -> NaiveDate {
    EPOCH_DAY
        .checked_add_days(Days::new(u64::from(n)))
        .expect("day number within chrono range")
}
