//! Decoders for the source's CSV-ish payloads.
//!
//! Day history and statistics come back as comma-separated fields with
//! semicolon record terminators. Batch history uses a non-standard layout
//! (one line per date, each holding many `time,values` sections) that is
//! flattened to one record per sample before decoding.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::errors::DecodeError;
use crate::models::statistics::Statistic;
use crate::models::status::{BatchReading, StatusReading};
use crate::providers::pvoutput::params::WIRE_DATE_FORMAT;

/// Decodes one day of status history into ascending rows.
///
/// Records are semicolon-terminated; each carries `date,time` followed by up
/// to nine observation columns. Missing trailing columns decode as `None`.
pub fn decode_status_rows(text: &str) -> Result<Vec<StatusReading>, DecodeError> {
    let mut rows = Vec::new();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .terminator(csv::Terminator::Any(b';'))
        .from_reader(text.as_bytes());

    for record in reader.records() {
        let record = record?;
        let fields: Vec<&str> = record.iter().map(str::trim).collect();
        if fields.iter().all(|f| f.is_empty()) {
            continue;
        }
        let ts = parse_wire_datetime(
            fields.first().copied().unwrap_or(""),
            fields.get(1).copied().unwrap_or(""),
        )?;
        rows.push(StatusReading {
            ts,
            cumulative_energy_wh: opt_f64(fields.get(2))?,
            energy_efficiency_kwh_per_kw: opt_f64(fields.get(3))?,
            instantaneous_power_w: opt_f64(fields.get(4))?,
            average_power_w: opt_f64(fields.get(5))?,
            power_normalised: opt_f64(fields.get(6))?,
            energy_consumption_wh: opt_f64(fields.get(7))?,
            power_demand_w: opt_f64(fields.get(8))?,
            temperature_c: opt_f64(fields.get(9))?,
            voltage: opt_f64(fields.get(10))?,
        });
    }

    rows.sort_by_key(|r| r.ts);
    Ok(rows)
}

/// Decodes the single summary-statistics record. An empty payload decodes to
/// [`Statistic::default`] (no data window, zero outputs), not an error.
pub fn decode_statistic(text: &str) -> Result<Statistic, DecodeError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .terminator(csv::Terminator::Any(b';'))
        .from_reader(text.as_bytes());

    let Some(record) = reader.records().next() else {
        return Ok(Statistic::default());
    };
    let record = record?;
    let fields: Vec<&str> = record.iter().map(str::trim).collect();
    if fields.iter().all(|f| f.is_empty()) {
        return Ok(Statistic::default());
    }

    Ok(Statistic {
        total_energy_wh: opt_f64(fields.first())?,
        energy_exported_wh: opt_f64(fields.get(1))?,
        average_daily_energy_wh: opt_f64(fields.get(2))?,
        minimum_daily_energy_wh: opt_f64(fields.get(3))?,
        maximum_daily_energy_wh: opt_f64(fields.get(4))?,
        average_efficiency_kwh_per_kw: opt_f64(fields.get(5))?,
        num_outputs: opt_f64(fields.get(6))?.map(|v| v as i64).unwrap_or(0),
        actual_date_from: opt_wire_date(fields.get(7))?,
        actual_date_to: opt_wire_date(fields.get(8))?,
        record_efficiency_kwh_per_kw: opt_f64(fields.get(9))?,
        record_efficiency_date: opt_wire_date(fields.get(10))?,
    })
}

/// Decodes a batch-history payload into ascending rows.
///
/// Each input line is `YYYYMMDD;HH:MM,v1,v2[,...];HH:MM,...`. Lines are
/// flattened to one `date,time,values` record per sample. Records with eight
/// or more columns belong to the consumption variant, which this schema does
/// not support and is reported as [`DecodeError::UnsupportedSchema`].
pub fn decode_batch_status(text: &str) -> Result<Vec<BatchReading>, DecodeError> {
    let mut flattened: Vec<(&str, &str)> = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut sections = line.split(';');
        let date = sections.next().unwrap_or("").trim();
        for payload in sections {
            flattened.push((date, payload.trim()));
        }
    }

    if let Some((_, payload)) = flattened.first() {
        let num_columns = 1 + payload.split(',').count();
        if num_columns >= 8 {
            return Err(DecodeError::UnsupportedSchema { num_columns });
        }
    }

    let mut rows = Vec::with_capacity(flattened.len());
    for (date, payload) in flattened {
        let fields: Vec<&str> = payload.split(',').map(str::trim).collect();
        let ts = parse_wire_datetime(date, fields.first().copied().unwrap_or(""))?;
        rows.push(BatchReading {
            ts,
            cumulative_energy_wh: opt_f64(fields.get(1))?,
            instantaneous_power_w: opt_f64(fields.get(2))?,
            temperature_c: opt_f64(fields.get(3))?,
            voltage: opt_f64(fields.get(4))?,
        });
    }

    rows.sort_by_key(|r| r.ts);
    Ok(rows)
}

fn parse_wire_datetime(date: &str, time: &str) -> Result<NaiveDateTime, DecodeError> {
    let bad = || DecodeError::BadTimestamp {
        value: format!("{date} {time}"),
    };
    let date = NaiveDate::parse_from_str(date, WIRE_DATE_FORMAT).map_err(|_| bad())?;
    let time = NaiveTime::parse_from_str(time, "%H:%M").map_err(|_| bad())?;
    Ok(date.and_time(time))
}

fn opt_f64(field: Option<&&str>) -> Result<Option<f64>, DecodeError> {
    match field.copied() {
        None | Some("") | Some("NaN") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| DecodeError::BadNumber {
                value: value.to_string(),
            }),
    }
}

fn opt_wire_date(field: Option<&&str>) -> Result<Option<NaiveDate>, DecodeError> {
    match field.copied() {
        None | Some("") | Some("NaN") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, WIRE_DATE_FORMAT)
            .map(Some)
            .map_err(|_| DecodeError::BadTimestamp {
                value: value.to_string(),
            }),
    }
}
