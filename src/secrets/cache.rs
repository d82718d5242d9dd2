//! Credential cache for reducing secret store calls
//!
//! Holds resolved [`CredentialPayload`]s keyed by deployment environment.
//! Entries live until explicitly invalidated; an optional expiry can be
//! configured, in which case an expired entry behaves exactly like an absent
//! one.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

use super::payload::CredentialPayload;
use crate::observability::metrics;

const CACHE_KEY_PREFIX: &str = "DATABASE_SECRET_FOR_";

/// Key under which one environment's credentials are cached.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key for the single credential set of a deployment environment,
    /// e.g. `DATABASE_SECRET_FOR_PRODUCTION`.
    pub fn for_environment(environment: &str) -> Self {
        Self(format!("{}{}", CACHE_KEY_PREFIX, environment.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: CredentialPayload,
    inserted_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, expiry: Option<Duration>) -> bool {
        expiry.is_some_and(|ttl| self.inserted_at.elapsed() >= ttl)
    }
}

/// Process-wide credential cache.
///
/// Cloning is cheap and clones share storage, so one instance can be created
/// at startup and handed to every connection factory.
///
/// `get_or_fetch` does not hold the lock while fetching: two concurrent
/// misses on the same key may both call the store, and the last writer wins.
#[derive(Debug, Clone, Default)]
pub struct CredentialCache {
    inner: Arc<RwLock<HashMap<CacheKey, CacheEntry>>>,
    expiry: Option<Duration>,
}

impl CredentialCache {
    /// Create a cache whose entries never expire.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache with an optional expiry (`None` = unbounded).
    pub fn with_expiry(expiry: Option<Duration>) -> Self {
        Self { inner: Arc::new(RwLock::new(HashMap::new())), expiry }
    }

    /// Get the cached payload if present and not expired. Never fetches.
    pub async fn get(&self, key: &CacheKey) -> Option<CredentialPayload> {
        let cache = self.inner.read().await;

        match cache.get(key) {
            Some(entry) if !entry.is_expired(self.expiry) => {
                debug!(key = %key, "Credential cache hit");
                Some(entry.payload.clone())
            }
            Some(_) => {
                debug!(key = %key, "Cached credentials expired");
                None
            }
            None => None,
        }
    }

    /// Return the cached payload, or call `fetch`, store its result under
    /// `key` and return it.
    ///
    /// A failing `fetch` leaves the key unpopulated and its error is returned
    /// unchanged.
    pub async fn get_or_fetch<F, Fut, E>(
        &self,
        key: &CacheKey,
        fetch: F,
    ) -> Result<CredentialPayload, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CredentialPayload, E>>,
    {
        if let Some(payload) = self.get(key).await {
            metrics::record_cache_hit();
            return Ok(payload);
        }

        metrics::record_cache_miss();
        debug!(key = %key, "Credential cache miss, fetching");
        let payload = fetch().await?;
        self.insert(key, payload.clone()).await;
        Ok(payload)
    }

    /// Store a payload, replacing any previous entry.
    pub async fn insert(&self, key: &CacheKey, payload: CredentialPayload) {
        let mut cache = self.inner.write().await;
        debug!(
            key = %key,
            expiry_secs = ?self.expiry.map(|d| d.as_secs()),
            "Caching credentials"
        );
        cache.insert(key.clone(), CacheEntry { payload, inserted_at: Instant::now() });
    }

    /// Remove the entry for `key`. Removing an absent key is a no-op.
    pub async fn invalidate(&self, key: &CacheKey) {
        let mut cache = self.inner.write().await;
        if cache.remove(key).is_some() {
            debug!(key = %key, "Invalidated cached credentials");
        }
    }

    /// Clear all cache entries
    pub async fn clear(&self) {
        let mut cache = self.inner.write().await;
        debug!(count = cache.len(), "Clearing credential cache");
        cache.clear();
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    pub fn expiry(&self) -> Option<Duration> {
        self.expiry
    }
}
