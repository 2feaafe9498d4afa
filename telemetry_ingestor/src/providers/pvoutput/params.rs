//! Wire date handling and query-parameter construction.

use chrono::NaiveDate;

use crate::errors::Error;

/// Date format used on the wire for every request.
pub const WIRE_DATE_FORMAT: &str = "%Y%m%d";

/// Formats a calendar date as the wire's `YYYYMMDD`.
pub fn format_wire_date(day: NaiveDate) -> String {
    day.format(WIRE_DATE_FORMAT).to_string()
}

/// Rejects dates strictly in the future before any network call is made.
pub fn ensure_not_future(day: NaiveDate, today: NaiveDate) -> Result<(), Error> {
    if day > today {
        return Err(Error::FutureDate(day));
    }
    Ok(())
}

/// Query parameters for one day of status history.
///
/// `h=1` selects the history query; the limit of 288 is the API maximum
/// (number of 5-minute periods per day); extended data is excluded.
pub fn status_params(system_id: i64, wire_date: &str) -> Vec<(String, String)> {
    vec![
        ("d".into(), wire_date.to_string()),
        ("h".into(), "1".into()),
        ("limit".into(), "288".into()),
        ("ext".into(), "0".into()),
        ("sid1".into(), system_id.to_string()),
    ]
}

/// Query parameters for the summary-statistics endpoint. Consumption and
/// credit/debit breakdowns are excluded.
pub fn statistic_params(
    system_id: i64,
    wire_date_from: Option<&str>,
    wire_date_to: Option<&str>,
) -> Vec<(String, String)> {
    let mut params = vec![
        ("c".into(), "0".into()),
        ("crdr".into(), "0".into()),
        ("sid1".into(), system_id.to_string()),
    ];
    if let Some(df) = wire_date_from {
        params.push(("df".into(), df.to_string()));
    }
    if let Some(dt) = wire_date_to {
        params.push(("dt".into(), dt.to_string()));
    }
    params
}

/// Query parameters for the asynchronous batch-history endpoint.
pub fn batch_status_params(system_id: i64, wire_date_to: Option<&str>) -> Vec<(String, String)> {
    let mut params = vec![("sid1".into(), system_id.to_string())];
    if let Some(dt) = wire_date_to {
        params.push(("dt".into(), dt.to_string()));
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_date_round_trip() {
        let day = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        assert_eq!(format_wire_date(day), "20190101");
    }

    #[test]
    fn future_dates_are_rejected() {
        let today = NaiveDate::from_ymd_opt(2019, 6, 1).unwrap();
        assert!(ensure_not_future(today, today).is_ok());
        assert!(ensure_not_future(today.pred_opt().unwrap(), today).is_ok());
        let err = ensure_not_future(today.succ_opt().unwrap(), today).unwrap_err();
        assert!(matches!(err, Error::FutureDate(_)));
    }

    #[test]
    fn statistic_params_omit_absent_dates() {
        let params = statistic_params(123, None, Some("20190107"));
        assert!(params.iter().any(|(k, v)| k == "dt" && v == "20190107"));
        assert!(!params.iter().any(|(k, _)| k == "df"));
    }
}
