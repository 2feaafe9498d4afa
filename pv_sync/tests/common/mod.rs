#![allow(dead_code)]

use std::path::PathBuf;

use diesel::prelude::*;
use pv_sync::db::{connection, migrate};
use tempfile::TempDir;

pub struct TestDb {
    _dir: TempDir, // keep alive for the life of the test
    pub path: String,
}

pub fn setup_db() -> (TestDb, SqliteConnection) {
    let dir = TempDir::new().expect("tempdir");
    let mut p = PathBuf::from(dir.path());
    p.push("test.db");
    let path = p.to_string_lossy().to_string();

    migrate::run_sqlite(&path).expect("migrations");

    let conn = connection::connect_sqlite(&path).expect("connect");
    (TestDb { _dir: dir, path }, conn)
}

pub fn d(y: i32, m: u32, day: u32) -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

pub fn reading(
    day: chrono::NaiveDate,
    hour: u32,
    minute: u32,
) -> telemetry_ingestor::models::status::StatusReading {
    telemetry_ingestor::models::status::StatusReading {
        ts: day.and_hms_opt(hour, minute, 0).unwrap(),
        cumulative_energy_wh: Some(100.0),
        energy_efficiency_kwh_per_kw: None,
        instantaneous_power_w: Some(50.0),
        average_power_w: None,
        power_normalised: None,
        energy_consumption_wh: None,
        power_demand_w: None,
        temperature_c: Some(21.5),
        voltage: Some(240.0),
    }
}
