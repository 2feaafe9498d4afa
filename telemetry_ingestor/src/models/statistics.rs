use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Summary statistics for one system as returned by the remote source.
///
/// `actual_date_from` / `actual_date_to` describe the system's true data
/// window; both `None` means the source confirmed the system has no data at
/// all. A "no result" response decodes to [`Statistic::default`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistic {
    pub total_energy_wh: Option<f64>,
    pub energy_exported_wh: Option<f64>,
    pub average_daily_energy_wh: Option<f64>,
    pub minimum_daily_energy_wh: Option<f64>,
    pub maximum_daily_energy_wh: Option<f64>,
    pub average_efficiency_kwh_per_kw: Option<f64>,
    /// Count of observations across the actual window; zero when absent.
    pub num_outputs: i64,
    pub actual_date_from: Option<NaiveDate>,
    pub actual_date_to: Option<NaiveDate>,
    pub record_efficiency_kwh_per_kw: Option<f64>,
    pub record_efficiency_date: Option<NaiveDate>,
}

impl Statistic {
    /// True when the source reported no data window for the system.
    pub fn has_no_data(&self) -> bool {
        self.actual_date_from.is_none() && self.actual_date_to.is_none()
    }
}
