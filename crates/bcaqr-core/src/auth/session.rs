use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::StoredCookie;
use crate::api::ApiError;

/// Session file name, placed in the user's home directory
pub const SESSION_FILE_NAME: &str = ".bcaqr_session.json";

/// Saved sessions are reused for this long before a fresh login is required.
/// The portal does not document token lifetime; a day matches observed behaviour.
pub const SESSION_MAX_AGE_HOURS: i64 = 24;

/// Default session file location: `~/.bcaqr_session.json`, or the current
/// directory when the home directory cannot be determined.
pub fn default_session_path() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(SESSION_FILE_NAME),
        None => PathBuf::from(SESSION_FILE_NAME),
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub token: String,
    #[serde(default, deserialize_with = "deserialize_null_as_empty")]
    pub cookies: Vec<StoredCookie>,
    pub base_url: String,
    pub saved_at: DateTime<Utc>,
}

// The token is a bearer credential; keep it out of logs.
impl fmt::Debug for SessionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionData")
            .field("token", &"[REDACTED]")
            .field("cookies", &self.cookies.len())
            .field("base_url", &self.base_url)
            .field("saved_at", &self.saved_at)
            .finish()
    }
}

impl SessionData {
    pub fn new(token: String, cookies: Vec<StoredCookie>, base_url: String) -> Self {
        Self {
            token,
            cookies,
            base_url,
            saved_at: Utc::now(),
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.saved_at + Duration::hours(SESSION_MAX_AGE_HOURS)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// A session saved exactly `SESSION_MAX_AGE_HOURS` ago is still usable.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now - self.saved_at > Duration::hours(SESSION_MAX_AGE_HOURS)
    }

    pub fn time_until_expiry(&self) -> Duration {
        self.expires_at() - Utc::now()
    }

    pub fn age_display(&self) -> String {
        let minutes = (Utc::now() - self.saved_at).num_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h {}m ago", minutes / 60, minutes % 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }

    /// Check the session can be used: a token is present and the freshness
    /// window has not elapsed.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.token.is_empty() {
            return Err(ApiError::Malformed("session file has no token".to_string()));
        }
        if self.is_expired() {
            return Err(ApiError::SessionExpired {
                saved_at: self.saved_at,
            });
        }
        Ok(())
    }

    /// Read and parse a session file without checking freshness.
    pub fn read(path: &Path) -> Result<Self, ApiError> {
        let contents = fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| {
            ApiError::Malformed(format!(
                "failed to parse session file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Load a session from disk, rejecting expired or token-less sessions.
    /// The file is never modified, even when it is rejected.
    pub fn load(path: &Path) -> Result<Self, ApiError> {
        let data = Self::read(path)?;
        data.validate()?;
        debug!(path = %path.display(), saved_at = %data.saved_at, "Loaded session");
        Ok(data)
    }

    /// Save session to disk as indented JSON, readable by the owner only.
    pub fn save(&self, path: &Path) -> Result<(), ApiError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ApiError::Malformed(format!("failed to serialize session: {}", e)))?;

        let mut file = open_owner_only(path)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;

        // A pre-existing file keeps its old mode through open(), so tighten it
        set_owner_only_permissions(path)?;

        debug!(path = %path.display(), cookies = self.cookies.len(), "Saved session");
        Ok(())
    }

    /// Delete a session file. Returns whether a file was removed.
    pub fn remove(path: &Path) -> Result<bool, ApiError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(unix)]
fn open_owner_only(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_owner_only(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

#[cfg(unix)]
fn set_owner_only_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn set_owner_only_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

// Older session files may carry `"cookies": null`
fn deserialize_null_as_empty<'de, D>(deserializer: D) -> Result<Vec<StoredCookie>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<Vec<StoredCookie>> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}
