//! Client configuration for the portal API. The base URL is the only setting
//! that changes backend behavior; the timeout and user agent shape every
//! request. Environment values override the defaults so a deployment can point
//! at another host without code changes. Configuration values are public; do
//! not store secrets here.

use super::errors::SessionError;
use std::{env, time::Duration};
use url::Url;

/// Backend used when nothing else is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";
/// Default per-request timeout (seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub(crate) static APP_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: APP_USER_AGENT.to_string(),
        }
    }
}

#[derive(Default)]
struct EnvOverrides {
    api_base_url: Option<String>,
    timeout_secs: Option<u64>,
}

impl ClientConfig {
    #[must_use]
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Loads defaults and applies `PORTAL_API_URL` / `PORTAL_TIMEOUT` when set.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        apply_overrides(&mut config, env_overrides());
        config
    }

    /// Parses the configured base URL.
    /// # Errors
    /// Returns `SessionError::Config` if the URL is malformed or not http(s).
    pub fn base_url(&self) -> Result<Url, SessionError> {
        let raw = self.api_base_url.trim();
        let url = Url::parse(raw)
            .map_err(|err| SessionError::Config(format!("Invalid API base URL {raw}: {err}")))?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(SessionError::Config(format!(
                "Unsupported API base URL scheme: {scheme}"
            ))),
        }
    }
}

fn env_overrides() -> EnvOverrides {
    EnvOverrides {
        api_base_url: env::var("PORTAL_API_URL")
            .ok()
            .and_then(|value| normalize_value(&value)),
        timeout_secs: env::var("PORTAL_TIMEOUT")
            .ok()
            .and_then(|value| normalize_value(&value))
            .and_then(|value| value.parse().ok()),
    }
}

fn apply_overrides(config: &mut ClientConfig, overrides: EnvOverrides) {
    if let Some(value) = overrides.api_base_url {
        config.api_base_url = value;
    }
    if let Some(secs) = overrides.timeout_secs {
        config.timeout = Duration::from_secs(secs);
    }
}

fn normalize_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
