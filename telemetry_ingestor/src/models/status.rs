use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One sample from a system's day history, indexed by the system's
/// localtime. All observation fields are optional; the source omits columns
/// a system does not report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusReading {
    /// Localtime of the remote system.
    pub ts: NaiveDateTime,
    pub cumulative_energy_wh: Option<f64>,
    pub energy_efficiency_kwh_per_kw: Option<f64>,
    pub instantaneous_power_w: Option<f64>,
    pub average_power_w: Option<f64>,
    pub power_normalised: Option<f64>,
    pub energy_consumption_wh: Option<f64>,
    pub power_demand_w: Option<f64>,
    pub temperature_c: Option<f64>,
    pub voltage: Option<f64>,
}

/// One row from the data service's batch history, which carries a reduced
/// four-column schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchReading {
    /// Localtime of the remote system.
    pub ts: NaiveDateTime,
    pub cumulative_energy_wh: Option<f64>,
    pub instantaneous_power_w: Option<f64>,
    pub temperature_c: Option<f64>,
    pub voltage: Option<f64>,
}
