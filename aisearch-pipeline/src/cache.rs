//! In-memory cache for search backend candidates.
//!
//! Caches the candidate list returned by SearXNG keyed by the full wire
//! payload (form fields plus engine cookie). Uses [`moka`] for
//! async-friendly caching with a configurable TTL and automatic eviction.
//! The cache is owned by the [`crate::searxng::SearchClient`] that uses it.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use moka::future::Cache;

use crate::query::SearxngPayload;
use crate::types::SearchCandidate;

/// Maximum number of cached candidate lists.
const MAX_CACHE_ENTRIES: u64 = 100;

/// Composite cache key: verbatim query text + hash of every other field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Query text exactly as sent to the backend.
    query: String,
    /// Hash of the remaining form fields and the engine cookie, so that
    /// different topics, windows or engine sets produce different entries.
    payload_hash: u64,
}

impl CacheKey {
    /// Build a deterministic cache key from a backend payload.
    pub fn new(payload: &SearxngPayload) -> Self {
        let query = payload.query_text().to_owned();
        let mut hasher = DefaultHasher::new();
        for (key, value) in payload.form.iter().filter(|(k, _)| k != "q") {
            key.hash(&mut hasher);
            value.hash(&mut hasher);
        }
        payload.cookie.hash(&mut hasher);
        Self {
            query,
            payload_hash: hasher.finish(),
        }
    }
}

/// TTL-bounded candidate cache.
#[derive(Clone)]
pub struct CandidateCache {
    inner: Cache<CacheKey, Vec<SearchCandidate>>,
}

impl CandidateCache {
    /// Create a cache whose entries expire after `ttl_seconds`.
    ///
    /// Returns `None` when `ttl_seconds` is 0 (caching disabled).
    pub fn new(ttl_seconds: u64) -> Option<Self> {
        if ttl_seconds == 0 {
            return None;
        }
        let inner = Cache::builder()
            .max_capacity(MAX_CACHE_ENTRIES)
            .time_to_live(Duration::from_secs(ttl_seconds))
            .build();
        Some(Self { inner })
    }

    /// Look up cached candidates. Returns `None` on a miss.
    pub async fn get(&self, key: &CacheKey) -> Option<Vec<SearchCandidate>> {
        self.inner.get(key).await
    }

    /// Insert candidates for a key.
    pub async fn insert(&self, key: CacheKey, candidates: Vec<SearchCandidate>) {
        self.inner.insert(key, candidates).await;
    }
}
