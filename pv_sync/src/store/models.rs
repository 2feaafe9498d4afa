//! Row structs mapping store types onto the Diesel schema.

use diesel::prelude::*;

use crate::schema::{missing_dates, pv_statistics, pv_status};

#[derive(Insertable, Debug)]
#[diesel(table_name = pv_status)]
pub(crate) struct NewStatusRow {
    pub pv_system_id: i64,
    pub ts: String,
    pub cumulative_energy_wh: Option<f64>,
    pub energy_efficiency_kwh_per_kw: Option<f64>,
    pub instantaneous_power_w: Option<f64>,
    pub average_power_w: Option<f64>,
    pub power_normalised: Option<f64>,
    pub energy_consumption_wh: Option<f64>,
    pub power_demand_w: Option<f64>,
    pub temperature_c: Option<f64>,
    pub voltage: Option<f64>,
    pub query_date: String,
    pub requested_at: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = missing_dates)]
pub(crate) struct NewMissingDate {
    pub pv_system_id: i64,
    pub missing_date: String,
    pub requested_at: String,
}

#[derive(Insertable, Queryable, Debug)]
#[diesel(table_name = pv_statistics)]
pub(crate) struct StatisticsRow {
    pub pv_system_id: i64,
    pub actual_date_from: Option<String>,
    pub actual_date_to: Option<String>,
    pub num_outputs: i64,
    pub query_date_from: Option<String>,
    pub query_date_to: String,
    pub requested_at: String,
}
