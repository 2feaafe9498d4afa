use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use roaring::RoaringBitmap;
use telemetry_ingestor::models::status::StatusReading;

use crate::daterange::{self, DateRange};
use crate::dates;
use crate::schema::missing_dates::dsl as md;
use crate::schema::pv_statistics::dsl as st;
use crate::schema::pv_status::dsl as ps;
use crate::store::models::{NewMissingDate, NewStatusRow, StatisticsRow};
use crate::store::{StatisticsSnapshot, StoreResult, SyncStore};

/// [`SyncStore`] backed by the crate's SQLite schema.
pub struct SqliteStore;

impl SqliteStore {
    /// Creates the store handle; all state lives in the connection.
    pub fn new() -> Self {
        Self
    }
}

impl Default for SqliteStore {
    fn default() -> Self {
        Self::new()
    }
}

fn day_bit(day: NaiveDate) -> StoreResult<u32> {
    u32::try_from(daterange::day_number(day)).with_context(|| format!("day {day} precedes epoch"))
}

impl SyncStore for SqliteStore {
    fn covered_days(
        &self,
        conn: &mut SqliteConnection,
        pv_system_id: i64,
        window: &DateRange,
    ) -> StoreResult<RoaringBitmap> {
        let from = dates::format_day(window.start_date());
        let to = dates::format_day(window.end_date());

        let segment_days: Vec<String> = ps::pv_status
            .filter(
                ps::pv_system_id
                    .eq(pv_system_id)
                    .and(ps::query_date.ge(&from))
                    .and(ps::query_date.le(&to)),
            )
            .select(ps::query_date)
            .distinct()
            .load(conn)?;

        let absent_days: Vec<String> = md::missing_dates
            .filter(
                md::pv_system_id
                    .eq(pv_system_id)
                    .and(md::missing_date.ge(&from))
                    .and(md::missing_date.le(&to)),
            )
            .select(md::missing_date)
            .load(conn)?;

        let mut covered = RoaringBitmap::new();
        for stored in segment_days.iter().chain(absent_days.iter()) {
            covered.insert(day_bit(dates::parse_day(stored)?)?);
        }
        Ok(covered)
    }

    fn append_segment(
        &self,
        conn: &mut SqliteConnection,
        pv_system_id: i64,
        query_date: NaiveDate,
        requested_at: DateTime<Utc>,
        rows: &[StatusReading],
    ) -> StoreResult<usize> {
        let query_date = dates::format_day(query_date);
        let requested_at = dates::to_rfc3339_millis(requested_at);

        let new_rows: Vec<NewStatusRow> = rows
            .iter()
            .map(|r| NewStatusRow {
                pv_system_id,
                ts: dates::format_ts(r.ts),
                cumulative_energy_wh: r.cumulative_energy_wh,
                energy_efficiency_kwh_per_kw: r.energy_efficiency_kwh_per_kw,
                instantaneous_power_w: r.instantaneous_power_w,
                average_power_w: r.average_power_w,
                power_normalised: r.power_normalised,
                energy_consumption_wh: r.energy_consumption_wh,
                power_demand_w: r.power_demand_w,
                temperature_c: r.temperature_c,
                voltage: r.voltage,
                query_date: query_date.clone(),
                requested_at: requested_at.clone(),
            })
            .collect();

        conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
            let written = diesel::insert_into(ps::pv_status)
                .values(&new_rows)
                .execute(conn)?;
            Ok(written)
        })
    }

    fn record_missing_date(
        &self,
        conn: &mut SqliteConnection,
        pv_system_id: i64,
        day: NaiveDate,
        requested_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let row = NewMissingDate {
            pv_system_id,
            missing_date: dates::format_day(day),
            requested_at: dates::to_rfc3339_millis(requested_at),
        };
        diesel::insert_into(md::missing_dates)
            .values(&row)
            .on_conflict((md::pv_system_id, md::missing_date))
            .do_nothing()
            .execute(conn)?;
        Ok(())
    }

    fn statistics_get(
        &self,
        conn: &mut SqliteConnection,
        pv_system_id: i64,
    ) -> StoreResult<Option<StatisticsSnapshot>> {
        let row = st::pv_statistics
            .filter(st::pv_system_id.eq(pv_system_id))
            .first::<StatisticsRow>(conn)
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(StatisticsSnapshot {
            pv_system_id: row.pv_system_id,
            actual_date_from: row.actual_date_from.as_deref().map(dates::parse_day).transpose()?,
            actual_date_to: row.actual_date_to.as_deref().map(dates::parse_day).transpose()?,
            num_outputs: row.num_outputs,
            query_date_from: row
                .query_date_from
                .as_deref()
                .map(dates::parse_day)
                .transpose()?,
            query_date_to: dates::parse_day(&row.query_date_to)?,
            requested_at: dates::parse_rfc3339_utc(&row.requested_at)?,
        }))
    }

    fn statistics_replace(
        &self,
        conn: &mut SqliteConnection,
        snapshot: &StatisticsSnapshot,
    ) -> StoreResult<()> {
        let row = StatisticsRow {
            pv_system_id: snapshot.pv_system_id,
            actual_date_from: snapshot.actual_date_from.map(dates::format_day),
            actual_date_to: snapshot.actual_date_to.map(dates::format_day),
            num_outputs: snapshot.num_outputs,
            query_date_from: snapshot.query_date_from.map(dates::format_day),
            query_date_to: dates::format_day(snapshot.query_date_to),
            requested_at: dates::to_rfc3339_millis(snapshot.requested_at),
        };

        conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
            diesel::delete(st::pv_statistics.filter(st::pv_system_id.eq(snapshot.pv_system_id)))
                .execute(conn)?;
            diesel::insert_into(st::pv_statistics)
                .values(&row)
                .execute(conn)?;
            Ok(())
        })
    }

    fn status_row_count(
        &self,
        conn: &mut SqliteConnection,
        pv_system_id: i64,
    ) -> StoreResult<i64> {
        let count = ps::pv_status
            .filter(ps::pv_system_id.eq(pv_system_id))
            .count()
            .get_result(conn)?;
        Ok(count)
    }

    fn missing_dates(
        &self,
        conn: &mut SqliteConnection,
        pv_system_id: i64,
    ) -> StoreResult<Vec<NaiveDate>> {
        let stored: Vec<String> = md::missing_dates
            .filter(md::pv_system_id.eq(pv_system_id))
            .select(md::missing_date)
            .order(md::missing_date.asc())
            .load(conn)?;
        stored.iter().map(|s| dates::parse_day(s)).collect()
    }
}
