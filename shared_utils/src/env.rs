use thiserror::Error;

/// An environment variable required by the application is not set.
#[derive(Debug, Error)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVarError(pub String);

/// Reads a required environment variable, returning a structured error if it
/// is missing.
///
/// Thin wrapper around `std::env::var` with a specific error type so callers
/// can report exactly which credential is absent at startup.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn get_env_var(name: &str) -> Result<String, MissingEnvVarError> {
    std::env::var(name).map_err(|_| MissingEnvVarError(name.to_string()))
}

/// Reads an optional environment variable.
///
/// Returns `None` when the variable is unset or empty, so an empty export
/// behaves like an absent one.
pub fn optional_env_var(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(v) if !v.is_empty() => Some(v),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_var_reports_name() {
        let err = get_env_var("PV_SYNC_TEST_SURELY_UNSET").unwrap_err();
        assert!(err.to_string().contains("PV_SYNC_TEST_SURELY_UNSET"));
    }
}
