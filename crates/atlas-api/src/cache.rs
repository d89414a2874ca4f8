//! Shared TTL response cache.
//!
//! An unbounded key → value map where entries expire after their TTL.
//! Eviction is lazy and time-based (not an LRU): an expired entry is
//! dropped by the read that observes it. Misses are a normal value, never
//! an error.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Instant;

use crate::error::ApiResult;

struct CacheEntry {
    value: Value,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) < self.ttl
    }
}

/// In-memory TTL cache shared across callers.
///
/// Keys follow the canonical [`cache_key`] convention so prefix
/// invalidation on a bare endpoint path clears every parameterized variant.
#[derive(Default)]
pub struct TtlCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl TtlCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value, or `None` if the key was never stored or
    /// its TTL elapsed.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.lock_entries();
        match entries.get(key) {
            Some(entry) if entry.is_fresh(Instant::now()) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores or overwrites a value, starting a fresh TTL window.
    pub fn set(&self, key: impl Into<String>, value: Value, ttl: Duration) {
        self.lock_entries().insert(
            key.into(),
            CacheEntry {
                value,
                stored_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Removes one entry regardless of remaining TTL.
    pub fn delete(&self, key: &str) {
        self.lock_entries().remove(key);
    }

    /// Removes every entry whose key starts with `prefix`.
    ///
    /// Used after mutations that make cached reads stale, e.g. a bookmark
    /// toggle invalidating `/places/recommended` and all its variants.
    pub fn delete_prefix(&self, prefix: &str) {
        self.lock_entries().retain(|key, _| !key.starts_with(prefix));
    }

    /// Returns the cached value for `key` if still valid; otherwise runs
    /// the loader, stores its result with the given TTL, and returns it.
    ///
    /// Concurrent misses for the same key may each run their own loader;
    /// a duplicate data fetch is cheap and harmless, unlike a duplicate
    /// credential refresh, so there is no single-flight here.
    ///
    /// # Errors
    /// Propagates the loader's error. A value that fails to serialize is
    /// returned uncached.
    pub async fn fetch_with<T, F, Fut>(&self, key: &str, ttl: Duration, loader: F) -> ApiResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        if let Some(hit) = self.get(key)
            && let Ok(value) = serde_json::from_value(hit)
        {
            tracing::debug!(key, "cache hit");
            return Ok(value);
        }

        tracing::debug!(key, "cache miss, loading");
        let loaded = loader().await?;
        match serde_json::to_value(&loaded) {
            Ok(value) => self.set(key, value, ttl),
            Err(error) => tracing::warn!(key, %error, "response not cacheable"),
        }
        Ok(loaded)
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Builds the canonical cache key `<endpoint-path>?<normalized-query>`.
///
/// Query pairs are sorted by key so logically equal requests share one
/// entry; an empty query yields the bare path, which keeps prefix
/// invalidation on the path matching every variant.
pub fn cache_key(path: &str, query: &[(&str, &str)]) -> String {
    if query.is_empty() {
        return path.to_string();
    }
    let mut pairs = query.to_vec();
    pairs.sort_unstable();
    let joined = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{path}?{joined}")
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::error::ApiError;

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = TtlCache::new();
        cache.set("/a", json!(1), Duration::from_millis(100));
        assert_eq!(cache.get("/a"), Some(json!(1)));

        tokio::time::advance(Duration::from_millis(150)).await;
        assert_eq!(cache.get("/a"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_restarts_the_ttl_window() {
        let cache = TtlCache::new();
        cache.set("/a", json!(1), Duration::from_millis(100));
        tokio::time::advance(Duration::from_millis(80)).await;
        cache.set("/a", json!(2), Duration::from_millis(100));
        tokio::time::advance(Duration::from_millis(80)).await;

        assert_eq!(cache.get("/a"), Some(json!(2)));
    }

    #[tokio::test]
    async fn test_delete_defeats_remaining_ttl() {
        let cache = TtlCache::new();
        cache.set("/a", json!(1), Duration::from_secs(3600));
        cache.delete("/a");
        assert_eq!(cache.get("/a"), None);
    }

    #[tokio::test]
    async fn test_delete_prefix_clears_variants_only() {
        let cache = TtlCache::new();
        let ttl = Duration::from_secs(3600);
        cache.set("/places/recommended", json!(1), ttl);
        cache.set("/places/recommended?page=2", json!(2), ttl);
        cache.set("/places/nearby", json!(3), ttl);

        cache.delete_prefix("/places/recommended");
        assert_eq!(cache.get("/places/recommended"), None);
        assert_eq!(cache.get("/places/recommended?page=2"), None);
        assert_eq!(cache.get("/places/nearby"), Some(json!(3)));
    }

    #[tokio::test]
    async fn test_fetch_with_skips_loader_on_warm_key() {
        let cache = TtlCache::new();
        let calls = AtomicUsize::new(0);
        let ttl = Duration::from_secs(60);

        let first: Vec<u32> = cache
            .fetch_with("/a", ttl, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![1, 2, 3])
            })
            .await
            .unwrap();
        let second: Vec<u32> = cache
            .fetch_with("/a", ttl, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![9])
            })
            .await
            .unwrap();

        assert_eq!(first, vec![1, 2, 3]);
        assert_eq!(second, vec![1, 2, 3]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_with_propagates_loader_error_uncached() {
        let cache = TtlCache::new();
        let result: ApiResult<Vec<u32>> = cache
            .fetch_with("/a", Duration::from_secs(60), || async {
                Err(ApiError::Network("connection reset".to_string()))
            })
            .await;

        assert!(matches!(result, Err(ApiError::Network(_))));
        assert_eq!(cache.get("/a"), None);
    }

    #[test]
    fn test_cache_key_normalizes_query_order() {
        assert_eq!(
            cache_key("/places/recommended", &[("page", "2"), ("lang", "en")]),
            "/places/recommended?lang=en&page=2"
        );
        assert_eq!(
            cache_key("/places/recommended", &[("lang", "en"), ("page", "2")]),
            cache_key("/places/recommended", &[("page", "2"), ("lang", "en")])
        );
        assert_eq!(cache_key("/places/recommended", &[]), "/places/recommended");
    }
}
