//! Session bootstrap and teardown.

use anyhow::Result;
use atlas_api::config::paths;
use atlas_api::store::{self, StoredSession};

/// Stores the refresh token; the first authenticated request exchanges it
/// for an access credential.
pub fn login(refresh_token: &str) -> Result<()> {
    store::save(
        &paths::session_path(),
        &StoredSession {
            access: None,
            refresh: refresh_token.to_string(),
        },
    )?;
    println!("Session stored. The next request will authenticate.");
    Ok(())
}

/// Drops the stored session.
pub fn logout() -> Result<()> {
    store::remove(&paths::session_path())?;
    println!("Logged out.");
    Ok(())
}
