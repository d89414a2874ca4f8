//! On-disk session token storage.
//!
//! Persists the token pair in `${ATLAS_HOME}/session.json` with restricted
//! permissions (0600). Tokens are never logged or displayed in full.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Persisted session tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    /// The short-lived access token, absent until the first refresh.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
    /// The long-lived refresh token.
    pub refresh: String,
}

/// Loads the stored session, if any.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load(path: &Path) -> Result<Option<StoredSession>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read session from {}", path.display()))?;

    let session = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse session from {}", path.display()))?;
    Ok(Some(session))
}

/// Saves the session with restricted permissions (0600).
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn save(path: &Path, session: &StoredSession) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let contents = serde_json::to_string_pretty(session).context("Failed to serialize session")?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .with_context(|| format!("Failed to open {} for writing", path.display()))?;
        file.write_all(contents.as_bytes())
            .with_context(|| format!("Failed to write to {}", path.display()))?;
    }

    #[cfg(not(unix))]
    {
        fs::write(path, contents)
            .with_context(|| format!("Failed to write to {}", path.display()))?;
    }

    Ok(())
}

/// Deletes the stored session. Missing files are not an error.
///
/// # Errors
/// Returns an error if the file exists but cannot be removed.
pub fn remove(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)
            .with_context(|| format!("Failed to remove session at {}", path.display()))?;
    }
    Ok(())
}
