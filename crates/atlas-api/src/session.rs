//! Session store and single-flight credential refresh.
//!
//! [`Session`] owns the only mutable shared state in the crate: the token
//! pair and the in-flight refresh marker. Expiry is discovered reactively
//! (the API answers 401); no expiry timestamp is tracked client-side.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use serde::Deserialize;

use crate::error::RefreshError;
use crate::store::{self, StoredSession};

/// Opaque short-lived bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for the Authorization header.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Tokens are never logged or displayed in full.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<{} bytes>)", self.0.len())
    }
}

/// Handle shared by every caller waiting on the same refresh.
type InflightRefresh = Shared<BoxFuture<'static, Result<Credential, RefreshError>>>;

#[derive(Default)]
struct SessionState {
    access: Option<Credential>,
    refresh_token: Option<String>,
    inflight: Option<InflightRefresh>,
}

/// Wire shape of the refresh endpoint response.
#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    /// Some APIs rotate the refresh token on every exchange.
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Holder of the session tokens plus the refresh coordinator.
///
/// Constructed once and injected into the client; everything else only
/// reads the credential. A single mutex guards both tokens and the
/// in-flight marker, so no caller can observe a half-updated store. The
/// lock is never held across an await.
pub struct Session {
    http: reqwest::Client,
    refresh_url: String,
    /// Where to persist the token pair; `None` keeps the session in memory.
    store_path: Option<PathBuf>,
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new(http: reqwest::Client, refresh_url: String, store_path: Option<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            http,
            refresh_url,
            store_path,
            state: Mutex::new(SessionState::default()),
        })
    }

    /// Loads persisted tokens into memory. Returns whether a session existed.
    ///
    /// # Errors
    /// Returns an error if the session file exists but cannot be read.
    pub fn bootstrap(&self) -> anyhow::Result<bool> {
        let Some(path) = &self.store_path else {
            return Ok(false);
        };
        let Some(stored) = store::load(path)? else {
            return Ok(false);
        };

        let mut state = self.lock_state();
        state.access = stored.access.map(Credential::new);
        state.refresh_token = Some(stored.refresh);
        Ok(true)
    }

    /// Read-only snapshot of the live credential.
    pub fn credential(&self) -> Option<Credential> {
        self.lock_state().access.clone()
    }

    /// Installs a token pair (login / session bootstrap) and persists it.
    pub fn install(&self, access: Option<Credential>, refresh_token: impl Into<String>) {
        let refresh_token = refresh_token.into();
        {
            let mut state = self.lock_state();
            state.access = access.clone();
            state.refresh_token = Some(refresh_token.clone());
        }
        self.persist(access.as_ref(), &refresh_token);
    }

    /// Drops both tokens (logout or terminal refresh failure).
    pub fn clear(&self) {
        {
            let mut state = self.lock_state();
            state.access = None;
            state.refresh_token = None;
        }
        if let Some(path) = &self.store_path
            && let Err(error) = store::remove(path)
        {
            tracing::warn!(%error, "failed to remove persisted session");
        }
    }

    /// Returns a fresh credential, refreshing at most once across all
    /// concurrent callers.
    ///
    /// If a refresh is already in flight the caller awaits that same
    /// operation; otherwise it starts one. Every waiter observes the same
    /// outcome: the new credential on success, or [`RefreshError`] after
    /// the store has been cleared on failure. The in-flight marker is
    /// dropped when the refresh settles, so a later 401 starts a new cycle.
    ///
    /// # Errors
    /// Returns [`RefreshError`] if no refresh token is held or the refresh
    /// endpoint rejects the exchange.
    pub async fn ensure_fresh(self: &Arc<Self>) -> Result<Credential, RefreshError> {
        let shared = {
            let mut state = self.lock_state();
            if let Some(inflight) = &state.inflight {
                tracing::debug!("attaching to in-flight credential refresh");
                inflight.clone()
            } else {
                let Some(refresh_token) = state.refresh_token.clone() else {
                    return Err(RefreshError::new("no refresh token held; log in first"));
                };
                let session = Arc::clone(self);
                let shared: InflightRefresh = async move {
                    let outcome = session.refresh_once(&refresh_token).await;
                    session.settle(&outcome)
                }
                .boxed()
                .shared();
                state.inflight = Some(shared.clone());
                shared
            }
        };
        shared.await
    }

    /// Performs the actual token exchange. Runs at most once per cycle.
    async fn refresh_once(&self, refresh_token: &str) -> Result<RefreshResponse, RefreshError> {
        tracing::info!("refreshing access credential");
        let response = self
            .http
            .post(&self.refresh_url)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(|e| RefreshError::new(format!("refresh request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RefreshError::new(format!(
                "refresh rejected (HTTP {status}): {body}"
            )));
        }

        response
            .json::<RefreshResponse>()
            .await
            .map_err(|e| RefreshError::new(format!("malformed refresh response: {e}")))
    }

    /// Applies the refresh outcome to the store and clears the in-flight
    /// marker, then maps it to what the waiters receive.
    fn settle(&self, outcome: &Result<RefreshResponse, RefreshError>) -> Result<Credential, RefreshError> {
        match outcome {
            Ok(tokens) => {
                let credential = Credential::new(tokens.access_token.clone());
                let refresh_token;
                {
                    let mut state = self.lock_state();
                    state.inflight = None;
                    state.access = Some(credential.clone());
                    if let Some(rotated) = &tokens.refresh_token {
                        state.refresh_token = Some(rotated.clone());
                    }
                    refresh_token = state.refresh_token.clone();
                }
                if let Some(refresh_token) = refresh_token {
                    self.persist(Some(&credential), &refresh_token);
                }
                Ok(credential)
            }
            Err(error) => {
                tracing::warn!(%error, "credential refresh failed, ending session");
                {
                    let mut state = self.lock_state();
                    state.inflight = None;
                    state.access = None;
                    state.refresh_token = None;
                }
                if let Some(path) = &self.store_path
                    && let Err(remove_error) = store::remove(path)
                {
                    tracing::warn!(error = %remove_error, "failed to remove persisted session");
                }
                Err(error.clone())
            }
        }
    }

    /// Best-effort write-through to disk; a failed write keeps the session
    /// usable in memory.
    fn persist(&self, access: Option<&Credential>, refresh_token: &str) {
        let Some(path) = &self.store_path else {
            return;
        };
        let stored = StoredSession {
            access: access.map(|c| c.as_str().to_string()),
            refresh: refresh_token.to_string(),
        };
        if let Err(error) = store::save(path, &stored) {
            tracing::warn!(%error, "failed to persist session");
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_session(server: &MockServer) -> Arc<Session> {
        let session = Session::new(
            reqwest::Client::new(),
            format!("{}/auth/refresh", server.uri()),
            None,
        );
        session.install(None, "refresh-1");
        session
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let server = MockServer::start().await;
        // The delay keeps the exchange in flight while all callers attach.
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .and(body_partial_json(serde_json::json!({ "refresh_token": "refresh-1" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "access_token": "access-2" }))
                    .set_delay(Duration::from_millis(100)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let session = test_session(&server);
        let (a, b, c) = tokio::join!(
            session.ensure_fresh(),
            session.ensure_fresh(),
            session.ensure_fresh()
        );

        let a = a.unwrap();
        assert_eq!(a.as_str(), "access-2");
        assert_eq!(b.unwrap(), a);
        assert_eq!(c.unwrap(), a);
        assert_eq!(session.credential(), Some(a));
    }

    #[tokio::test]
    async fn test_settled_refresh_allows_a_new_cycle() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "access_token": "access-2" })),
            )
            .expect(2)
            .mount(&server)
            .await;

        let session = test_session(&server);
        session.ensure_fresh().await.unwrap();
        session.ensure_fresh().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_refresh_clears_the_store() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(403).set_body_string("revoked"))
            .expect(1)
            .mount(&server)
            .await;

        let session = test_session(&server);
        let error = session.ensure_fresh().await.unwrap_err();
        assert!(error.message.contains("403"), "unexpected error: {error}");
        assert!(session.credential().is_none());

        // The refresh token is gone too, so the next cycle fails locally.
        let error = session.ensure_fresh().await.unwrap_err();
        assert!(error.message.contains("no refresh token"));
    }

    #[tokio::test]
    async fn test_rotated_refresh_token_is_adopted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({ "refresh_token": "refresh-1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({ "access_token": "access-2", "refresh_token": "refresh-2" }),
            ))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({ "refresh_token": "refresh-2" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "access_token": "access-3" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let session = test_session(&server);
        assert_eq!(session.ensure_fresh().await.unwrap().as_str(), "access-2");
        assert_eq!(session.ensure_fresh().await.unwrap().as_str(), "access-3");
    }

    #[test]
    fn test_credential_debug_redacts_token() {
        let credential = Credential::new("super-secret-token");
        assert!(!format!("{credential:?}").contains("super-secret-token"));
    }
}
