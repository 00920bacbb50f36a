//! services/client/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub session_file: PathBuf,
    pub storage_poll_interval: Duration,
    pub page_size: usize,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Backend Settings ---
        let api_base_url = lookup("SPAMWALL_API_URL")
            .unwrap_or_else(|| "http://localhost:5000".to_string())
            .trim_end_matches('/')
            .to_string();
        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "SPAMWALL_API_URL".to_string(),
                format!("'{}' is not an http(s) URL", api_base_url),
            ));
        }

        let request_timeout =
            Duration::from_secs(parse_or(&lookup, "SPAMWALL_REQUEST_TIMEOUT_SECS", 30u64)?);
        let connect_timeout =
            Duration::from_secs(parse_or(&lookup, "SPAMWALL_CONNECT_TIMEOUT_SECS", 5u64)?);

        // --- Storage Settings ---
        let session_file = lookup("SPAMWALL_SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./.spamwall/session.json"));
        let storage_poll_interval =
            Duration::from_millis(parse_or(&lookup, "SPAMWALL_STORAGE_POLL_MS", 500u64)?);

        // --- View Settings ---
        let page_size = parse_or(&lookup, "SPAMWALL_PAGE_SIZE", 10usize)?;
        if page_size == 0 {
            return Err(ConfigError::InvalidValue(
                "SPAMWALL_PAGE_SIZE".to_string(),
                "page size must be at least 1".to_string(),
            ));
        }

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            api_base_url,
            request_timeout,
            connect_timeout,
            session_file,
            storage_poll_interval,
            page_size,
            log_level,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.api_base_url, "http://localhost:5000");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.session_file, PathBuf::from("./.spamwall/session.json"));
        assert_eq!(config.page_size, 10);
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = from_pairs(&[
            ("SPAMWALL_API_URL", "https://api.example.com/"),
            ("SPAMWALL_REQUEST_TIMEOUT_SECS", "45"),
            ("SPAMWALL_PAGE_SIZE", "25"),
            ("RUST_LOG", "debug"),
        ])
        .unwrap();
        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(config.request_timeout, Duration::from_secs(45));
        assert_eq!(config.page_size, 25);
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    fn bad_values_name_the_variable() {
        let err = from_pairs(&[("SPAMWALL_PAGE_SIZE", "0")]).unwrap_err();
        assert!(err.to_string().contains("SPAMWALL_PAGE_SIZE"));

        let err = from_pairs(&[("SPAMWALL_STORAGE_POLL_MS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("SPAMWALL_STORAGE_POLL_MS"));

        let err = from_pairs(&[("SPAMWALL_API_URL", "localhost:5000")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(key, _) if key == "SPAMWALL_API_URL"));
    }
}
