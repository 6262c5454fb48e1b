//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `BOUTIQUE_API_URL` - Base URL of the storefront API (default: `http://localhost:3001/api`)
//! - `BOUTIQUE_STATE_FILE` - Path of the local cart state document
//!   (default: `.boutique/state.json`)
//! - `BOUTIQUE_TIMEOUT_SECS` - Per-request timeout in seconds (default: 10)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:3001/api";
const DEFAULT_STATE_FILE: &str = ".boutique/state.json";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Storefront API base URL, always ending in `/`
    pub api_url: Url,
    /// Where the local cart state document lives
    pub state_file: PathBuf,
    /// Per-request timeout for remote calls
    pub timeout: Duration,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let api_url = parse_api_url(&get_env_or_default("BOUTIQUE_API_URL", DEFAULT_API_URL))
            .map_err(|e| ConfigError::InvalidEnvVar("BOUTIQUE_API_URL".to_string(), e))?;
        let state_file = PathBuf::from(get_env_or_default("BOUTIQUE_STATE_FILE", DEFAULT_STATE_FILE));
        let timeout_secs = get_env_or_default("BOUTIQUE_TIMEOUT_SECS", &DEFAULT_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("BOUTIQUE_TIMEOUT_SECS".to_string(), e.to_string())
            })?;

        Ok(Self {
            api_url,
            state_file,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Configuration pointing at `api_url` with default state file and timeout.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `api_url` is not an absolute http(s) URL.
    pub fn for_api(api_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: parse_api_url(api_url)
                .map_err(|e| ConfigError::InvalidEnvVar("api_url".to_string(), e))?,
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Resolve an API path such as `cart/items` against the base URL.
    ///
    /// # Errors
    ///
    /// Returns `url::ParseError` if `path` cannot be joined.
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.api_url.join(path.trim_start_matches('/'))
    }
}

/// Parse a base URL and make sure it ends in `/` so `join` appends to it.
fn parse_api_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_appends_to_api_prefix() {
        let config = ClientConfig::for_api("http://localhost:3001/api").unwrap();
        assert_eq!(
            config.endpoint("cart/items").unwrap().as_str(),
            "http://localhost:3001/api/cart/items"
        );
        assert_eq!(
            config.endpoint("/cart").unwrap().as_str(),
            "http://localhost:3001/api/cart"
        );
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        assert!(ClientConfig::for_api("ftp://shop.example/api").is_err());
        assert!(ClientConfig::for_api("not a url").is_err());
    }
}
