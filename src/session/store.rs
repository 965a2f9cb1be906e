//! Durable client-side storage for the session token and the reset-email hint.
//!
//! Each value is independently settable and clearable. `FileStore` keeps both in
//! a small JSON document that is rewritten atomically (temp file + rename) and
//! restricted to the owner on unix. `MemoryStore` backs tests and embedders that
//! do not want anything on disk. The token is a bearer credential; never log it.

use super::errors::SessionError;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};
use tracing::debug;
use ulid::Ulid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Token,
    ResetEmail,
}

impl StoreKey {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::ResetEmail => "resetEmail",
        }
    }
}

pub trait SessionStore: Send + Sync {
    /// # Errors
    /// Returns `SessionError::Storage` if the backing medium cannot be read.
    fn get(&self, key: StoreKey) -> Result<Option<String>, SessionError>;

    /// # Errors
    /// Returns `SessionError::Storage` if the backing medium cannot be written.
    fn set(&self, key: StoreKey, value: &str) -> Result<(), SessionError>;

    /// Removing a missing key is not an error.
    /// # Errors
    /// Returns `SessionError::Storage` if the backing medium cannot be written.
    fn remove(&self, key: StoreKey) -> Result<(), SessionError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<StoreKey, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: StoreKey) -> Result<Option<String>, SessionError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(&key).cloned())
    }

    fn set(&self, key: StoreKey, value: &str) -> Result<(), SessionError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: StoreKey) -> Result<(), SessionError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.remove(&key);
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reset_email: Option<String>,
}

impl StoredSession {
    fn slot(&mut self, key: StoreKey) -> &mut Option<String> {
        match key {
            StoreKey::Token => &mut self.token,
            StoreKey::ResetEmail => &mut self.reset_email,
        }
    }
}

/// JSON file store. Read-modify-write cycles are serialized within the process.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<StoredSession, SessionError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(StoredSession::default()),
            Err(err) => {
                return Err(SessionError::Storage(format!(
                    "Failed to read {}: {err}",
                    self.path.display()
                )))
            }
        };

        if raw.trim().is_empty() {
            return Ok(StoredSession::default());
        }

        serde_json::from_str(&raw).map_err(|err| {
            SessionError::Storage(format!("Corrupt session file {}: {err}", self.path.display()))
        })
    }

    fn write(&self, stored: &StoredSession) -> Result<(), SessionError> {
        let storage_err = |action: &str, err: std::io::Error| {
            SessionError::Storage(format!("Failed to {action} {}: {err}", self.path.display()))
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| storage_err("create directory for", err))?;
        }

        let payload = serde_json::to_vec_pretty(stored)
            .map_err(|err| SessionError::Serialization(format!("Failed to encode session: {err}")))?;

        // Unique per write: other processes may be replacing the same file.
        let tmp = self.path.with_extension(format!("{}.tmp", Ulid::new()));
        let replaced = fs::write(&tmp, payload)
            .map_err(|err| storage_err("write", err))
            .and_then(|()| {
                restrict_permissions(&tmp).map_err(|err| storage_err("set permissions on", err))
            })
            .and_then(|()| fs::rename(&tmp, &self.path).map_err(|err| storage_err("replace", err)));
        if replaced.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        replaced?;

        debug!("session file updated: {}", self.path.display());

        Ok(())
    }

    fn update(&self, key: StoreKey, value: Option<&str>) -> Result<(), SessionError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stored = self.read()?;
        let slot = stored.slot(key);
        if slot.as_deref() == value {
            return Ok(());
        }
        *slot = value.map(str::to_string);
        self.write(&stored)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

impl SessionStore for FileStore {
    fn get(&self, key: StoreKey) -> Result<Option<String>, SessionError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stored = self.read()?;
        Ok(stored.slot(key).take())
    }

    fn set(&self, key: StoreKey, value: &str) -> Result<(), SessionError> {
        self.update(key, Some(value))
    }

    fn remove(&self, key: StoreKey) -> Result<(), SessionError> {
        self.update(key, None)
    }
}
