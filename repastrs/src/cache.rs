//! TTL-bounded result cache keyed by request fingerprint.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::sync::Cache;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::executor::QueryResult;
use crate::models::QueryRequest;

/// SHA-256 over the request's canonical JSON form, as a 64-character lowercase
/// hex string. Struct field order fixes the serialization, so two requests
/// that differ only in wire-level key order share a fingerprint.
pub fn fingerprint(request: &QueryRequest) -> Result<String> {
    fingerprint_value(request)
}

pub(crate) fn fingerprint_value<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

pub struct ResultCache {
    cache: Cache<String, QueryResult>,
    hits: AtomicU64,
    misses: AtomicU64,
    ttl: Duration,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::with_config(1000, Duration::from_secs(300))
    }

    pub fn with_config(max_entries: u64, ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(ttl)
                .build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<QueryResult> {
        if let Some(result) = self.cache.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            Some(result)
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    pub fn put(&self, key: String, result: QueryResult) {
        self.cache.insert(key, result);
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            hits,
            misses,
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
            entry_count: self.cache.entry_count(),
            ttl_secs: self.ttl.as_secs(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub entry_count: u64,
    pub ttl_secs: u64,
}
