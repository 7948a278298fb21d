//! In-memory cache of upstream responses.

use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::CacheConfig;
use crate::observability::metrics;

/// A stored upstream response.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    stored_at: Instant,
}

impl CachedResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
            stored_at: Instant::now(),
        }
    }

    fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

/// Thread-safe response cache keyed by upstream and request URI.
#[derive(Clone)]
pub struct ResponseCache {
    inner: Arc<DashMap<String, Arc<CachedResponse>>>,
    ttl: Duration,
    max_entry_bytes: u64,
    max_entries: usize,
}

impl ResponseCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl: Duration::from_secs(config.ttl_secs),
            max_entry_bytes: config.max_entry_bytes,
            max_entries: config.max_entries,
        }
    }

    /// Look up a fresh entry; expired entries are evicted on the way.
    pub fn get(&self, key: &str) -> Option<Arc<CachedResponse>> {
        let entry = self.inner.get(key).map(|e| e.value().clone());

        let result = match entry {
            Some(cached) if cached.is_fresh(self.ttl) => Some(cached),
            Some(_) => {
                self.inner.remove(key);
                None
            }
            None => None,
        };

        metrics::record_cache_lookup(result.is_some());
        result
    }

    /// Whether a response of this length may be stored.
    pub fn accepts(&self, content_length: Option<u64>) -> bool {
        matches!(content_length, Some(len) if len <= self.max_entry_bytes)
    }

    pub fn max_entry_bytes(&self) -> u64 {
        self.max_entry_bytes
    }

    pub fn insert(&self, key: String, response: CachedResponse) {
        if self.inner.len() >= self.max_entries && !self.inner.contains_key(&key) {
            self.evict_expired();
            if self.inner.len() >= self.max_entries {
                tracing::debug!(key = %key, "Cache full, not storing response");
                return;
            }
        }

        tracing::debug!(key = %key, size = response.body.len(), "Caching upstream response");
        self.inner.insert(key, Arc::new(response));
    }

    fn evict_expired(&self) {
        let ttl = self.ttl;
        self.inner.retain(|_, v| v.is_fresh(ttl));
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
