//! Runtime configuration.
//!
//! Settings come from a TOML file; credentials prefer the environment
//! (`PVOUTPUT_API_KEY`, `PVOUTPUT_SYSTEM_ID`) and fall back to the file so
//! keys need not live on disk.

use std::fs;
use std::path::Path;

use secrecy::SecretString;
use serde::Deserialize;
use shared_utils::env::optional_env_var;

/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "PVOUTPUT_API_KEY";
/// Environment variable holding the account system id.
pub const SYSTEM_ID_VAR: &str = "PVOUTPUT_SYSTEM_ID";

/// Configuration failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("reading config file: {0}")]
    Read(#[from] std::io::Error),
    /// The file is not valid TOML for this schema.
    #[error("parsing config file: {0}")]
    Parse(#[from] toml::de::Error),
    /// A credential is absent from both the environment and the file.
    #[error("missing credential: set {0} or add it to the config file")]
    MissingCredential(&'static str),
    /// The data-service host does not look like one of the service's own.
    #[error("data service url {0:?} does not end in \".org\"")]
    BadDataServiceUrl(String),
}

/// Settings for the sync CLI.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Path of the SQLite store.
    pub database_path: String,
    /// API key; prefer [`API_KEY_VAR`] over this field.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Account system id used to sign requests; prefer [`SYSTEM_ID_VAR`].
    #[serde(default)]
    pub account_system_id: Option<String>,
    /// Public API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Subscription data-service base URL, when the account has one.
    #[serde(default)]
    pub data_service_url: Option<String>,
    /// Density threshold below which a system is skipped.
    #[serde(default = "default_min_outputs_per_day")]
    pub min_outputs_per_day: f64,
    /// Extra seconds to sleep past a quota reset.
    #[serde(default = "default_safety_margin_secs")]
    pub safety_margin_secs: i64,
}

fn default_base_url() -> String {
    telemetry_ingestor::providers::pvoutput::BASE_URL.to_string()
}

fn default_min_outputs_per_day() -> f64 {
    30.0
}

fn default_safety_margin_secs() -> i64 {
    telemetry_ingestor::rate_limit::DEFAULT_SAFETY_MARGIN_SECS
}

impl Config {
    /// Loads and validates the TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        if let Some(url) = &config.data_service_url {
            let host = url.trim_end_matches('/');
            if !host.ends_with(".org") {
                return Err(ConfigError::BadDataServiceUrl(url.clone()));
            }
        }
        Ok(config)
    }

    /// Resolves credentials, environment first.
    pub fn credentials(&self) -> Result<(SecretString, String), ConfigError> {
        let api_key = optional_env_var(API_KEY_VAR)
            .or_else(|| self.api_key.clone())
            .ok_or(ConfigError::MissingCredential(API_KEY_VAR))?;
        let system_id = optional_env_var(SYSTEM_ID_VAR)
            .or_else(|| self.account_system_id.clone())
            .ok_or(ConfigError::MissingCredential(SYSTEM_ID_VAR))?;
        Ok((SecretString::new(api_key.into()), system_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_file_gets_defaults() {
        let config = Config::from_toml("database_path = \"pv.db\"").unwrap();
        assert_eq!(config.database_path, "pv.db");
        assert_eq!(config.base_url, "https://pvoutput.org");
        assert_eq!(config.min_outputs_per_day, 30.0);
        assert_eq!(config.safety_margin_secs, 180);
        assert!(config.data_service_url.is_none());
    }

    #[test]
    fn foreign_data_service_host_is_rejected() {
        let err = Config::from_toml(
            "database_path = \"pv.db\"\ndata_service_url = \"https://data.example.com\"",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::BadDataServiceUrl(_)));
    }

    #[test]
    fn data_service_host_on_org_is_accepted() {
        let config = Config::from_toml(
            "database_path = \"pv.db\"\ndata_service_url = \"https://data.pvoutput.org\"",
        )
        .unwrap();
        assert_eq!(
            config.data_service_url.as_deref(),
            Some("https://data.pvoutput.org")
        );
    }

    #[test]
    fn file_credentials_are_a_fallback() {
        let config = Config::from_toml(
            "database_path = \"pv.db\"\napi_key = \"abc\"\naccount_system_id = \"123\"",
        )
        .unwrap();
        // Environment wins when set; these tests rely only on the fallback.
        if optional_env_var(API_KEY_VAR).is_none() && optional_env_var(SYSTEM_ID_VAR).is_none() {
            let (_key, system_id) = config.credentials().unwrap();
            assert_eq!(system_id, "123");
        }
    }
}
