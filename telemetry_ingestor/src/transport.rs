//! Transport seam for the fetcher.
//!
//! [`Transport`] models the single logical operation the rest of the crate
//! needs from HTTP: one GET, returning status, headers and body. No retry or
//! backoff lives here; that is entirely the fetcher's job. The trait exists
//! so tests can substitute a scripted fake without a network.

use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::Client;
use thiserror::Error;

/// A raw response as seen by the fetcher: status line, response headers and
/// the body decoded to text.
#[derive(Clone, Debug)]
pub struct RawResponse {
    pub status: u16,
    pub headers: IndexMap<String, String>,
    pub body: String,
}

/// Connection-level transport failures (DNS, TLS, timeouts, body decode).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues one GET with the given query parameters and request headers.
    async fn get(
        &self,
        url: &str,
        params: &[(String, String)],
        headers: &IndexMap<String, String>,
    ) -> Result<RawResponse, TransportError>;
}

/// Production transport backed by a shared [`reqwest::Client`].
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Builds a client with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        params: &[(String, String)],
        headers: &IndexMap<String, String>,
    ) -> Result<RawResponse, TransportError> {
        let mut req = self.client.get(url).query(params);
        for (name, value) in headers {
            req = req.header(name.as_str(), value.as_str());
        }

        let response = req.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}
