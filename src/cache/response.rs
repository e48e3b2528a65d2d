//! Content-addressed response cache for deterministic generate calls.
//!
//! [`ResponseCache`] stores the text of previously observed responses,
//! keyed by a hash of (model, prompt-version, prompt). Only calls with a
//! deterministic sampling configuration (no temperature, or exactly 0.0)
//! are eligible — the gateway enforces that; this module just stores.
//!
//! # Architecture
//!
//! The cache sits in the [`Gateway`](crate::gateway::Gateway), above the
//! provider adapter. A cache hit bypasses the concurrency gate, retry
//! logic, and the provider entirely. Hit/miss metrics are emitted here.
//!
//! The cache never stores prompt content — only the key hash and the
//! response text — so it cannot be reverse-mapped to free-text notes.
//!
//! # Pluggable backends
//!
//! [`CacheBackend`] is the two-method contract an external store (e.g. a
//! shared key-value service for multi-process deployments) can implement.
//! The moka-backed in-memory [`MemoryBackend`] is the default and is
//! sufficient for single-process use; it gives TTL-on-read expiry and
//! capacity-driven LRU eviction, and a re-insert replaces the entry and
//! refreshes its recency.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use crate::telemetry;

/// Configuration for the response cache.
///
/// ```rust
/// # use munin::cache::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(10_000)
///     .ttl(Duration::from_secs(3600));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached entries. Default: 10,000.
    pub max_entries: u64,
    /// Time-to-live for cached entries. Default: 1 hour.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl: Duration::from_secs(3600),
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached entries.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the time-to-live for cached entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Two-method storage contract behind [`ResponseCache`].
///
/// TTL and capacity are properties of the backend, fixed at construction.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Look up a response text. Expired entries are a miss.
    async fn get(&self, key: u64) -> Option<String>;
    /// Store (or replace) a response text.
    async fn insert(&self, key: u64, value: String);
}

/// Default in-memory backend: moka LRU + TTL.
struct MemoryBackend {
    cache: Cache<u64, String>,
}

impl MemoryBackend {
    fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .build();
        Self { cache }
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: u64) -> Option<String> {
        self.cache.get(&key).await
    }

    async fn insert(&self, key: u64, value: String) {
        self.cache.insert(key, value).await;
    }
}

/// Content-addressed cache of generate response text.
pub struct ResponseCache {
    backend: Arc<dyn CacheBackend>,
}

impl ResponseCache {
    /// Create a cache on the default in-memory backend.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            backend: Arc::new(MemoryBackend::new(config)),
        }
    }

    /// Create a cache on a custom backend (e.g. an external store).
    pub fn with_backend(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Look up a cached response. Emits hit/miss metrics.
    pub async fn get(&self, key: u64) -> Option<String> {
        match self.backend.get(key).await {
            Some(text) => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                Some(text)
            }
            None => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                None
            }
        }
    }

    /// Store a response. Racing inserts for the same key are benign — the
    /// values are equivalent for deterministic requests.
    pub async fn insert(&self, key: u64, value: String) {
        self.backend.insert(key, value).await;
    }
}

/// Compute a cache key from model, prompt-version tag, and prompt.
///
/// Uses `DefaultHasher` (SipHash): deterministic within a process
/// lifetime, which is sufficient for the in-memory backend. A
/// cross-process backend would hash with a stable function at its own
/// boundary.
pub fn cache_key(model: &str, prompt_version: Option<&str>, prompt: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    model.hash(&mut hasher);
    prompt_version.hash(&mut hasher);
    prompt.hash(&mut hasher);
    hasher.finish()
}
