//! Tests for [`ResponseCache`] — content-addressed LRU + TTL store.

use std::time::Duration;

use munin::cache::response::cache_key;
use munin::cache::{CacheConfig, ResponseCache};

// ============================================================================
// CacheConfig
// ============================================================================

#[test]
fn cache_config_defaults() {
    let config = CacheConfig::default();
    assert_eq!(config.max_entries, 10_000);
    assert_eq!(config.ttl, Duration::from_secs(3600));
}

#[test]
fn cache_config_builder() {
    let config = CacheConfig::new()
        .max_entries(500)
        .ttl(Duration::from_secs(60));
    assert_eq!(config.max_entries, 500);
    assert_eq!(config.ttl, Duration::from_secs(60));
}

// ============================================================================
// Get/insert behaviour
// ============================================================================

#[tokio::test]
async fn miss_then_hit() {
    let cache = ResponseCache::new(&CacheConfig::default());
    let key = cache_key("model-a", Some("v1"), "note text");

    assert!(cache.get(key).await.is_none());

    cache.insert(key, "extracted codes".to_string()).await;

    assert_eq!(cache.get(key).await.as_deref(), Some("extracted codes"));
}

#[tokio::test]
async fn different_prompt_version_is_miss() {
    let cache = ResponseCache::new(&CacheConfig::default());

    let v1 = cache_key("model-a", Some("v1"), "note text");
    let v2 = cache_key("model-a", Some("v2"), "note text");
    cache.insert(v1, "old prompt output".to_string()).await;

    assert!(cache.get(v2).await.is_none());
}

#[tokio::test]
async fn reinsert_replaces_value() {
    let cache = ResponseCache::new(&CacheConfig::default());
    let key = cache_key("model-a", None, "note");

    cache.insert(key, "first".to_string()).await;
    cache.insert(key, "second".to_string()).await;

    assert_eq!(cache.get(key).await.as_deref(), Some("second"));
}

#[tokio::test]
async fn ttl_expiry_is_a_miss() {
    let config = CacheConfig::new().ttl(Duration::from_millis(50));
    let cache = ResponseCache::new(&config);
    let key = cache_key("model", Some("v1"), "text");

    cache.insert(key, "cached".to_string()).await;
    assert!(cache.get(key).await.is_some());

    // Wait for TTL + some margin
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(cache.get(key).await.is_none());
}
