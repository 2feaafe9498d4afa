//! Date and timestamp codecs for the store's TEXT columns.
//!
//! Days are stored as ISO `YYYY-MM-DD`, so lexicographic order in SQL equals
//! chronological order and range predicates work directly on the column.

use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

const DAY_FORMAT: &str = "%Y-%m-%d";
const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Formats a calendar day for storage.
pub fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

/// Parses a stored calendar day.
pub fn parse_day(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DAY_FORMAT).with_context(|| format!("parse stored day {s:?}"))
}

/// Formats a meter-local reading timestamp for storage.
pub fn format_ts(ts: NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

/// Parses a stored meter-local reading timestamp.
pub fn parse_ts(s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TS_FORMAT)
        .with_context(|| format!("parse stored timestamp {s:?}"))
}

/// Formats a UTC instant (fetch bookkeeping) as RFC3339 with milliseconds.
pub fn to_rfc3339_millis(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses a stored UTC instant back from RFC3339.
pub fn parse_rfc3339_utc(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("parse stored instant {s:?}"))?;
    Ok(parsed.with_timezone(&Utc))
}
