//! PVOutput-style provider.
//!
//! Builds signed requests for the public API and the subscription data
//! service, funnels every call through the [`RateLimitedFetcher`], and
//! decodes the payloads. No request pacing happens here; the fetcher is the
//! single arbiter.

pub mod params;
pub mod response;

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use indexmap::IndexMap;
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use crate::errors::Error;
use crate::models::statistics::Statistic;
use crate::models::status::{BatchReading, StatusReading};
use crate::providers::TelemetryProvider;
use crate::rate_limit::{ApiRequest, Fetched, RateLimitedFetcher};
use crate::retry::{self, PollOutcome};
use crate::transport::Transport;

/// Default public API base URL.
pub const BASE_URL: &str = "https://pvoutput.org";

/// How long to wait between polls of the asynchronous batch endpoint.
const BATCH_POLL_INTERVAL: StdDuration = StdDuration::from_secs(60);

/// Marker the batch endpoint returns while the result is still being built.
const BATCH_ACCEPTED_MARKER: &str = "Accepted 202";

pub struct PvOutputProvider<T> {
    fetcher: RateLimitedFetcher<T>,
    api_key: SecretString,
    account_system_id: String,
    base_url: String,
    data_service_url: Option<String>,
}

impl<T: Transport> PvOutputProvider<T> {
    /// Creates a provider over an already-configured fetcher.
    ///
    /// `account_system_id` identifies the API account (request signing); the
    /// systems being queried are passed per call.
    pub fn new(
        fetcher: RateLimitedFetcher<T>,
        api_key: SecretString,
        account_system_id: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            api_key,
            account_system_id: account_system_id.into(),
            base_url: BASE_URL.to_string(),
            data_service_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Enables the subscription data service (batch history).
    pub fn with_data_service_url(mut self, url: impl Into<String>) -> Self {
        self.data_service_url = Some(url.into());
        self
    }

    /// Quota state after the most recent response.
    pub fn rate_limit_state(&self) -> crate::rate_limit::RateLimitState {
        self.fetcher.state()
    }

    fn service_url(base: &str, service: &str) -> String {
        format!("{}/service/r2/{}.jsp", base.trim_end_matches('/'), service)
    }

    /// Public API request: credentials travel as headers.
    fn api_request(&self, service: &str, params: Vec<(String, String)>) -> ApiRequest {
        let headers = IndexMap::from([
            ("X-Rate-Limit".to_string(), "1".to_string()),
            (
                "X-Pvoutput-Apikey".to_string(),
                self.api_key.expose_secret().to_string(),
            ),
            (
                "X-Pvoutput-SystemId".to_string(),
                self.account_system_id.clone(),
            ),
        ]);
        ApiRequest {
            url: Self::service_url(&self.base_url, service),
            params,
            headers,
        }
    }

    /// Data-service request: credentials travel as query parameters.
    fn data_service_request(
        &self,
        service: &str,
        mut params: Vec<(String, String)>,
    ) -> Result<ApiRequest, Error> {
        let base = self
            .data_service_url
            .as_deref()
            .ok_or(Error::DataServiceUnconfigured)?;
        params.push(("key".into(), self.api_key.expose_secret().to_string()));
        params.push(("sid".into(), self.account_system_id.clone()));
        Ok(ApiRequest {
            url: Self::service_url(base, service),
            params,
            headers: IndexMap::from([("X-Rate-Limit".to_string(), "1".to_string())]),
        })
    }
}

#[async_trait]
impl<T: Transport> TelemetryProvider for PvOutputProvider<T> {
    async fn day_status(
        &self,
        system_id: i64,
        day: NaiveDate,
        wait_on_limit: bool,
    ) -> Result<Vec<StatusReading>, Error> {
        params::ensure_not_future(day, Utc::now().date_naive())?;
        info!(system_id, %day, "requesting day status");

        let wire_date = params::format_wire_date(day);
        let req = self.api_request("getstatus", params::status_params(system_id, &wire_date));
        match self.fetcher.fetch(&req, wait_on_limit).await? {
            Fetched::NoData => {
                info!(system_id, %day, "no status found for day");
                Ok(Vec::new())
            }
            Fetched::Data(text) => Ok(response::decode_status_rows(&text)?),
        }
    }

    async fn statistic(
        &self,
        system_id: i64,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
        wait_on_limit: bool,
    ) -> Result<Statistic, Error> {
        let today = Utc::now().date_naive();
        // A half-open request is widened the way the source expects: missing
        // "to" means today, missing "from" means the beginning of time.
        let (date_from, date_to) = match (date_from, date_to) {
            (Some(df), None) => (Some(df), Some(today)),
            (None, Some(dt)) => (
                NaiveDate::from_ymd_opt(1900, 1, 1),
                Some(dt),
            ),
            other => other,
        };
        for day in [date_from, date_to].into_iter().flatten() {
            params::ensure_not_future(day, today)?;
        }
        info!(system_id, ?date_from, ?date_to, "requesting statistics");

        let wire_from = date_from.map(params::format_wire_date);
        let wire_to = date_to.map(params::format_wire_date);
        let req = self.api_request(
            "getstatistic",
            params::statistic_params(system_id, wire_from.as_deref(), wire_to.as_deref()),
        );
        match self.fetcher.fetch(&req, wait_on_limit).await? {
            Fetched::NoData => Ok(Statistic::default()),
            Fetched::Data(text) => Ok(response::decode_statistic(&text)?),
        }
    }

    async fn batch_status(
        &self,
        system_id: i64,
        date_to: Option<NaiveDate>,
        max_attempts: u32,
        wait_on_limit: bool,
    ) -> Result<Vec<BatchReading>, Error> {
        let today = Utc::now().date_naive();
        if let Some(day) = date_to {
            params::ensure_not_future(day, today)?;
        }
        let wire_to = date_to.map(params::format_wire_date);
        let req = self
            .data_service_request("getbatchstatus", params::batch_status_params(system_id, wire_to.as_deref()))?;
        info!(system_id, ?date_to, "requesting batch status");

        let rows = retry::poll_until(max_attempts, BATCH_POLL_INTERVAL, |attempt| {
            let req = &req;
            async move {
                match self.fetcher.fetch(req, wait_on_limit).await? {
                    Fetched::NoData => {
                        info!(system_id, "no batch status found");
                        Ok::<_, Error>(PollOutcome::Ready(Vec::new()))
                    }
                    Fetched::Data(text) => {
                        if text.contains(BATCH_ACCEPTED_MARKER) {
                            if attempt == 0 {
                                info!(system_id, "batch request accepted; result pending");
                            }
                            Ok(PollOutcome::Pending)
                        } else {
                            Ok(PollOutcome::Ready(response::decode_batch_status(&text)?))
                        }
                    }
                }
            }
        })
        .await?;

        rows.ok_or(Error::PollExhausted {
            attempts: max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{RawResponse, TransportError};
    use std::sync::{Arc, Mutex};

    type SeenRequests = Arc<Mutex<Vec<(String, Vec<(String, String)>)>>>;

    struct ScriptedTransport {
        responses: Mutex<Vec<RawResponse>>,
        seen: SeenRequests,
    }

    impl ScriptedTransport {
        fn new(mut responses: Vec<RawResponse>) -> (Self, SeenRequests) {
            responses.reverse();
            let seen = SeenRequests::default();
            (
                Self {
                    responses: Mutex::new(responses),
                    seen: Arc::clone(&seen),
                },
                seen,
            )
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn get(
            &self,
            url: &str,
            params: &[(String, String)],
            _headers: &IndexMap<String, String>,
        ) -> Result<RawResponse, TransportError> {
            self.seen
                .lock()
                .unwrap()
                .push((url.to_string(), params.to_vec()));
            Ok(self.responses.lock().unwrap().pop().expect("response"))
        }
    }

    fn ok(body: &str) -> RawResponse {
        RawResponse {
            status: 200,
            headers: IndexMap::new(),
            body: body.to_string(),
        }
    }

    fn provider(transport: ScriptedTransport) -> PvOutputProvider<ScriptedTransport> {
        PvOutputProvider::new(
            RateLimitedFetcher::new(transport),
            SecretString::new("test-key".into()),
            "9999",
        )
        .with_base_url("http://api.test.org")
    }

    #[tokio::test]
    async fn day_status_builds_history_query() {
        let (transport, seen) = ScriptedTransport::new(vec![ok("20190101,09:00,200,0.1,50")]);
        let p = provider(transport);

        let day = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        let rows = p.day_status(123, day, false).await.unwrap();
        assert_eq!(rows.len(), 1);

        let seen = seen.lock().unwrap();
        let (url, params) = &seen[0];
        assert_eq!(url, "http://api.test.org/service/r2/getstatus.jsp");
        assert!(params.contains(&("d".to_string(), "20190101".to_string())));
        assert!(params.contains(&("sid1".to_string(), "123".to_string())));
    }

    #[tokio::test]
    async fn future_day_is_rejected_before_any_request() {
        let (transport, _) = ScriptedTransport::new(vec![]);
        let p = provider(transport);

        let tomorrow = Utc::now().date_naive().succ_opt().unwrap();
        let err = p.day_status(123, tomorrow, false).await.unwrap_err();
        assert!(matches!(err, Error::FutureDate(_)));
    }

    #[tokio::test]
    async fn batch_status_without_data_service_is_an_error() {
        let (transport, _) = ScriptedTransport::new(vec![]);
        let p = provider(transport);

        let err = p.batch_status(123, None, 1, false).await.unwrap_err();
        assert!(matches!(err, Error::DataServiceUnconfigured));
    }

    #[tokio::test(start_paused = true)]
    async fn batch_status_polls_past_accepted() {
        let (transport, _) = ScriptedTransport::new(vec![
            ok("Accepted 202: the request is being processed"),
            ok("20140330;07:35,2,24;07:40,4,24"),
        ]);
        let p = provider(transport).with_data_service_url("http://data.test.org");

        let rows = p.batch_status(123, None, 5, false).await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn batch_status_gives_up_after_max_attempts() {
        let (transport, _) = ScriptedTransport::new(vec![
            ok("Accepted 202"),
            ok("Accepted 202"),
        ]);
        let p = provider(transport).with_data_service_url("http://data.test.org");

        let err = p.batch_status(123, None, 2, false).await.unwrap_err();
        assert!(matches!(err, Error::PollExhausted { attempts: 2 }));
    }
}
