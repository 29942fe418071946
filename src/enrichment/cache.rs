use crate::enrichment::EnrichmentType;
use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// A stored enrichment result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub enrichment_type: EnrichmentType,
    /// Request the key was computed from.
    pub input: serde_json::Value,
    pub result: serde_json::Value,
    /// Set by the cache on upsert from the supplied TTL.
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(
        key: String,
        enrichment_type: EnrichmentType,
        input: serde_json::Value,
        result: serde_json::Value,
    ) -> Self {
        Self {
            key,
            enrichment_type,
            input,
            result,
            expires_at: Utc::now(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Stable cache key for an enrichment request: the first 128 bits of
/// SHA-256 over `type ":" json(input)`, hex encoded.
///
/// `serde_json` maps keep their keys sorted, so equal inputs serialise
/// identically regardless of construction order.
pub fn cache_key(enrichment_type: EnrichmentType, input: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(enrichment_type.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(input.to_string().as_bytes());
    hex::encode(&hasher.finalize()[..16])
}

/// Storage port for enrichment results, shared by concurrent evaluations.
pub trait EnrichmentCache: Send + Sync {
    /// Entry for `key`, or `None` when absent or expired.
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<CacheEntry>>;

    /// Inserts or replaces the entry under `entry.key`, expiring after `ttl`.
    /// Concurrent writers for one key resolve last-write-wins.
    fn upsert<'a>(&'a self, entry: CacheEntry, ttl: Duration) -> BoxFuture<'a, ()>;
}

fn expiry(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// In-process [`EnrichmentCache`] bounded by entry count.
pub struct MemoryCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, CacheEntry>> {
        // Entries are replaced whole, so a poisoned lock still guards valid data.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn get_now(&self, key: &str) -> Option<CacheEntry> {
        let mut entries = self.lock();
        let entry = entries.get(key)?;
        if entry.is_expired(Utc::now()) {
            entries.pop(key);
            return None;
        }
        Some(entry.clone())
    }

    fn upsert_now(&self, mut entry: CacheEntry, ttl: Duration) {
        entry.expires_at = expiry(Utc::now(), ttl);
        self.lock().put(entry.key.clone(), entry);
    }
}

impl EnrichmentCache for MemoryCache {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<CacheEntry>> {
        async move { self.get_now(key) }.boxed()
    }

    fn upsert<'a>(&'a self, entry: CacheEntry, ttl: Duration) -> BoxFuture<'a, ()> {
        async move { self.upsert_now(entry, ttl) }.boxed()
    }
}
