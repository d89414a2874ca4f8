//! Authenticated HTTP client for the places API.
//!
//! Attaches the session credential to every request and, on a 401,
//! refreshes it through the session coordinator and replays the identical
//! request exactly once. Callers never implement their own retry-on-401;
//! the single retry lives here only.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cache::{TtlCache, cache_key};
use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::session::Session;

/// How many times a single request may be replayed after a refresh.
const MAX_AUTH_RETRIES: u8 = 1;

/// A successful response, body undecoded.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

/// HTTP client core: credential attachment, one-shot replay, cache access.
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    session: Arc<Session>,
    cache: Arc<TtlCache>,
}

impl ApiClient {
    /// Builds a client from config with an injected session.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client
    /// cannot be constructed.
    pub fn new(config: &Config, session: Arc<Session>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: config.resolved_base_url()?,
            http,
            session,
            cache: Arc::new(TtlCache::new()),
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn cache(&self) -> &Arc<TtlCache> {
        &self.cache
    }

    /// Sends a request, replaying it at most once after a credential
    /// refresh.
    ///
    /// The replay budget is an explicit counter: a 401 with budget left
    /// consumes it, waits for [`Session::ensure_fresh`] (shared across all
    /// concurrently failing requests), and resends the identical
    /// method/path/query/body. A 401 with the budget spent, or a failed
    /// refresh, ends the session.
    ///
    /// # Errors
    /// [`ApiError::Network`] on transport failure, [`ApiError::HttpStatus`]
    /// on any other non-2xx, [`ApiError::AuthExpired`] when the session is
    /// over.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> ApiResult<ApiResponse> {
        let url = format!("{}{}", self.base_url, path);
        let mut retries: u8 = 0;
        loop {
            let mut builder = self.http.request(method.clone(), &url);
            if !query.is_empty() {
                builder = builder.query(query);
            }
            if let Some(body) = body {
                builder = builder.json(body);
            }
            if let Some(credential) = self.session.credential() {
                builder = builder.bearer_auth(credential.as_str());
            }

            let response = builder
                .send()
                .await
                .map_err(|e| ApiError::Network(e.to_string()))?;
            let status = response.status();

            if status == StatusCode::UNAUTHORIZED {
                if retries >= MAX_AUTH_RETRIES {
                    tracing::warn!(path, "still unauthorized after refresh, ending session");
                    self.session.clear();
                    return Err(ApiError::AuthExpired { cause: None });
                }
                retries += 1;
                tracing::debug!(path, "credential rejected, refreshing before replay");
                self.session
                    .ensure_fresh()
                    .await
                    .map_err(|cause| ApiError::AuthExpired { cause: Some(cause) })?;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ApiError::HttpStatus {
                    status: status.as_u16(),
                    body,
                });
            }

            let body = response
                .text()
                .await
                .map_err(|e| ApiError::Network(e.to_string()))?;
            return Ok(ApiResponse {
                status: status.as_u16(),
                body,
            });
        }
    }

    /// GET with a decoded JSON body.
    ///
    /// # Errors
    /// As [`ApiClient::request`], plus [`ApiError::Decode`] on a malformed
    /// body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> ApiResult<T> {
        let response = self.request(Method::GET, path, query, None).await?;
        serde_json::from_str(&response.body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// GET through the response cache under the canonical key for
    /// `path` + `query`.
    ///
    /// # Errors
    /// As [`ApiClient::get_json`]; cache misses are never an error.
    pub async fn get_json_cached<T: Serialize + DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        ttl: Duration,
    ) -> ApiResult<T> {
        let key = cache_key(path, query);
        self.cache
            .fetch_with(&key, ttl, || self.get_json(path, query))
            .await
    }

    /// Drops every cached read under an endpoint path; call after a
    /// mutation that makes those reads stale.
    pub fn invalidate_prefix(&self, path: &str) {
        self.cache.delete_prefix(path);
    }

    /// Clears the session (memory and disk). The next requests go out
    /// unauthenticated.
    pub fn logout(&self) {
        tracing::info!("logging out");
        self.session.clear();
    }
}
