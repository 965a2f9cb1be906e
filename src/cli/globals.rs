use crate::session::{ClientConfig, FileStore, SessionClient};
use anyhow::{Context, Result};
use std::{env, path::PathBuf, sync::Arc, time::Duration};

/// Settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub api_url: String,
    pub timeout: Duration,
    pub state_file: PathBuf,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(api_url: String, timeout: Duration, state_file: PathBuf) -> Self {
        Self {
            api_url,
            timeout,
            state_file,
        }
    }

    #[must_use]
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(self.api_url.clone()).with_timeout(self.timeout)
    }

    /// Builds a session client backed by the state file.
    /// # Errors
    /// Returns an error if the API URL is invalid or the state file is unreadable.
    pub fn client(&self) -> Result<SessionClient> {
        let store = Arc::new(FileStore::new(&self.state_file));
        SessionClient::new(&self.config(), store).with_context(|| {
            format!(
                "failed to initialize session (state file: {})",
                self.state_file.display()
            )
        })
    }
}

/// `$XDG_STATE_HOME/portal-session/session.json`, else `$HOME/.portal-session.json`.
#[must_use]
pub fn default_state_file() -> PathBuf {
    let non_empty = |key: &str| env::var(key).ok().filter(|value| !value.trim().is_empty());

    if let Some(state_home) = non_empty("XDG_STATE_HOME") {
        return PathBuf::from(state_home)
            .join("portal-session")
            .join("session.json");
    }

    non_empty("HOME")
        .map_or_else(|| PathBuf::from("."), PathBuf::from)
        .join(".portal-session.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_args() {
        let args = GlobalArgs::new(
            "http://localhost:5000".to_string(),
            Duration::from_secs(10),
            PathBuf::from("/tmp/session.json"),
        );
        let config = args.config();
        assert_eq!(config.api_base_url, "http://localhost:5000");
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_default_state_file_prefers_xdg() {
        temp_env::with_vars(
            [
                ("XDG_STATE_HOME", Some("/var/state")),
                ("HOME", Some("/home/student")),
            ],
            || {
                assert_eq!(
                    default_state_file(),
                    PathBuf::from("/var/state/portal-session/session.json")
                );
            },
        );
    }

    #[test]
    fn test_default_state_file_falls_back_to_home() {
        temp_env::with_vars(
            [
                ("XDG_STATE_HOME", None::<&str>),
                ("HOME", Some("/home/student")),
            ],
            || {
                assert_eq!(
                    default_state_file(),
                    PathBuf::from("/home/student/.portal-session.json")
                );
            },
        );
    }
}
