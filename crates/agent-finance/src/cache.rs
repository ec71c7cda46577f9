//! Time-bounded cache for market data lookups
//!
//! Validation and analysis of the same ticker within one turn hit the same
//! endpoints, so info records are kept for a short TTL.

use cached::{Cached, TimedCache};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Cache key for a lookup request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Ticker symbol or series code
    pub subject: String,
    /// Endpoint or operation name
    pub endpoint: String,
    /// Extra parameters, serialized
    pub params: String,
}

impl CacheKey {
    /// Create a new cache key
    pub fn new(
        subject: impl Into<String>,
        endpoint: impl Into<String>,
        params: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            endpoint: endpoint.into(),
            params: params.into(),
        }
    }
}

/// Shared, thread-safe lookup cache
#[derive(Clone)]
pub struct LookupCache {
    cache: Arc<RwLock<TimedCache<CacheKey, Value>>>,
}

impl LookupCache {
    /// Create a new cache with the given TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(RwLock::new(TimedCache::with_lifespan(ttl))),
        }
    }

    /// Get a value from the cache
    pub async fn get(&self, key: &CacheKey) -> Option<Value> {
        // TimedCache evicts on read, so even lookups need the write lock.
        let mut cache = self.cache.write().await;
        cache.cache_get(key).cloned()
    }

    /// Insert a value into the cache
    pub async fn insert(&self, key: CacheKey, value: Value) {
        let mut cache = self.cache.write().await;
        let _ = cache.cache_set(key, value);
    }

    /// Return the cached value or run `fetcher` and cache its success
    ///
    /// Errors are never cached.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: CacheKey, fetcher: F) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Value, E>>,
    {
        if let Some(value) = self.get(&key).await {
            tracing::debug!(?key, "cache hit");
            return Ok(value);
        }

        tracing::debug!(?key, "cache miss");
        let value = fetcher().await?;
        self.insert(key, value.clone()).await;

        Ok(value)
    }

    /// Clear all cached entries
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        cache.cache_clear();
    }

    /// Number of cached entries
    pub async fn len(&self) -> usize {
        let cache = self.cache.read().await;
        cache.cache_size()
    }

    /// Check if the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_and_get() {
        let cache = LookupCache::new(Duration::from_secs(60));
        let key = CacheKey::new("AAPL", "info", "");
        let value = json!({"shortName": "Apple Inc."});

        cache.insert(key.clone(), value.clone()).await;
        assert_eq!(cache.get(&key).await, Some(value));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_or_fetch_calls_fetcher_once() {
        let cache = LookupCache::new(Duration::from_secs(60));
        let key = CacheKey::new("AAPL", "info", "");
        let value = json!({"regularMarketPrice": 190.0});

        let mut call_count = 0;
        let result = cache
            .get_or_fetch(key.clone(), || {
                call_count += 1;
                async { Ok::<_, String>(value.clone()) }
            })
            .await
            .unwrap();
        assert_eq!(result, value);

        let result = cache
            .get_or_fetch(key, || {
                call_count += 1;
                async { Ok::<_, String>(json!(null)) }
            })
            .await
            .unwrap();
        assert_eq!(result, value);
        assert_eq!(call_count, 1);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = LookupCache::new(Duration::from_secs(60));
        let key = CacheKey::new("NOPE", "info", "");

        let result = cache
            .get_or_fetch(key.clone(), || async { Err::<Value, _>("boom") })
            .await;
        assert!(result.is_err());
        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = LookupCache::new(Duration::from_secs(60));
        for i in 0..3 {
            cache
                .insert(CacheKey::new(format!("S{i}"), "info", ""), json!(i))
                .await;
        }
        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
