//! Client configuration (API key and base URL).

use std::env;
use std::fmt;

/// Environment variable holding the API key.
pub const API_KEY_ENV_VAR: &str = "AIRTRAIN_API_KEY";
/// Environment variable overriding the API base URL.
pub const API_URL_ENV_VAR: &str = "AIRTRAIN_API_URL";
/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.airtrain.ai";

/// Credentials and endpoint used to build a transport.
///
/// Use [`ClientConfig::from_env`] for the usual environment-driven setup and the `with_*`
/// methods to override individual settings (e.g. in tests).
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API key sent as a bearer token. `None` until one is configured.
    pub api_key: Option<String>,
    /// API base URL without a trailing `/`.
    pub base_url: String,
}

impl ClientConfig {
    /// Read [`API_KEY_ENV_VAR`] and [`API_URL_ENV_VAR`] from the environment.
    pub fn from_env() -> Self {
        Self {
            api_key: env::var(API_KEY_ENV_VAR).ok().filter(|k| !k.is_empty()),
            base_url: normalize_base_url(
                env::var(API_URL_ENV_VAR).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            ),
        }
    }

    /// Replace the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Replace the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = normalize_base_url(base_url.into());
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

// Keeps the key out of logs.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key_set", &self.api_key.is_some())
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn normalize_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
