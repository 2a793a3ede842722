//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `SHOPCART_API_URL` - Base URL of the storefront API (default: <http://localhost:5000/api>)
//! - `SHOPCART_TIMEOUT_SECS` - Request timeout in seconds (default: 10)
//! - `SHOPCART_STATE_FILE` - Local state file holding the user id and shadow cart
//!   (default: `.shopcart/state.json`)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the API, e.g. `http://localhost:5000/api`
    pub api_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
    /// Path of the local state file
    pub state_file: PathBuf,
}

const DEFAULT_API_URL: &str = "http://localhost:5000/api";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_STATE_FILE: &str = ".shopcart/state.json";

impl ClientConfig {
    /// Configuration for `api_url` with the default timeout and state file.
    #[must_use]
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let api_url = parse_api_url(
            &std::env::var("SHOPCART_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
        )?;
        let timeout = std::env::var("SHOPCART_TIMEOUT_SECS")
            .ok()
            .map(|raw| parse_timeout(&raw))
            .transpose()?
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        let state_file = std::env::var("SHOPCART_STATE_FILE")
            .map_or_else(|_| PathBuf::from(DEFAULT_STATE_FILE), PathBuf::from);

        Ok(Self {
            api_url,
            timeout,
            state_file,
        })
    }
}

/// Parse the API base URL. Only `http` and `https` URLs are accepted.
fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEnvVar("SHOPCART_API_URL".to_string(), reason);

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.cannot_be_a_base() {
        return Err(invalid("URL cannot be a base".to_string()));
    }
    Ok(url)
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidEnvVar(
            "SHOPCART_TIMEOUT_SECS".to_string(),
            format!("'{raw}' is not a positive number of seconds"),
        )),
    }
}
