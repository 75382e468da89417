//! Tests for cache key derivation and the get/put contract.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;

use crate::cache::{CacheLayer, CacheStore, MemoryStore, Params};
use crate::country::CountryRegistry;
use crate::error::StoreError;

/// Store wrapper that counts reads and writes.
struct CountingStore {
    inner: MemoryStore,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }
}

impl CacheStore for CountingStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(key)
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write(key, value)
    }
}

/// Store whose every operation fails, for the soft-failure contract.
struct BrokenStore;

impl CacheStore for BrokenStore {
    fn read(&self, _key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Err(StoreError("bucket offline".to_string()))
    }

    fn write(&self, _key: &str, _value: &[u8]) -> Result<(), StoreError> {
        Err(StoreError("bucket offline".to_string()))
    }
}

fn params_of(pairs: &[(&str, serde_json::Value)]) -> Params {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn get_after_put_returns_identical_payload() {
    let cache = CacheLayer::new(Box::new(MemoryStore::new()), "1.0.0");
    let params = params_of(&[("a", json!(1)), ("b", json!(2))]);
    let payload = json!({ "budgetaryImpact": -12.5 });

    cache.put("uk", "population_reform", &params, &payload);
    let hit = cache.get("uk", "population_reform", &params).unwrap();
    assert_eq!(hit, payload);
}

#[test]
fn version_bump_strands_old_entries() {
    let store = Arc::new(MemoryStore::new());
    let v1 = CacheLayer::new(Box::new(Arc::clone(&store)), "1.0.0");
    let v2 = CacheLayer::new(Box::new(Arc::clone(&store)), "1.1.0");
    let params = params_of(&[("a", json!(1))]);

    v1.put("uk", "ubi", &params, &json!({ "UBI": 100.0 }));
    assert!(v1.get("uk", "ubi", &params).is_some());
    assert!(v2.get("uk", "ubi", &params).is_none());
}

#[test]
fn key_is_order_independent() {
    let cache = CacheLayer::new(Box::new(MemoryStore::new()), "1.0.0");
    let mut forward = Params::new();
    forward.insert("a".to_string(), json!(1));
    forward.insert("b".to_string(), json!(2));
    let mut backward = Params::new();
    backward.insert("b".to_string(), json!(2));
    backward.insert("a".to_string(), json!(1));

    assert_eq!(
        cache.key("uk", "population_reform", &forward),
        cache.key("uk", "population_reform", &backward)
    );
}

#[test]
fn key_normalizes_query_string_typing() {
    let cache = CacheLayer::new(Box::new(MemoryStore::new()), "1.0.0");
    // A query-string "1" and a JSON-body 1 describe the same request.
    let stringly = params_of(&[("tax.income_tax.basic_rate", json!("0.25")), ("flag", json!("true"))]);
    let typed = params_of(&[("tax.income_tax.basic_rate", json!(0.25)), ("flag", json!(true))]);
    assert_eq!(cache.key("uk", "ubi", &stringly), cache.key("uk", "ubi", &typed));
}

#[test]
fn key_differs_across_country_and_endpoint() {
    let cache = CacheLayer::new(Box::new(MemoryStore::new()), "1.0.0");
    let params = params_of(&[("a", json!(1))]);
    let base = cache.key("uk", "ubi", &params);
    assert_ne!(base, cache.key("us", "ubi", &params));
    assert_ne!(base, cache.key("uk", "population_reform", &params));
}

#[test]
fn disabled_layer_never_stores() {
    let cache = CacheLayer::disabled("1.0.0");
    let params = Params::new();
    cache.put("uk", "ubi", &params, &json!({ "UBI": 1.0 }));
    assert!(cache.get("uk", "ubi", &params).is_none());
}

#[test]
fn broken_store_is_a_soft_failure() {
    let cache = CacheLayer::new(Box::new(BrokenStore), "1.0.0");
    let params = Params::new();
    // Neither operation panics or errors; the read is just a miss.
    cache.put("uk", "ubi", &params, &json!({ "UBI": 1.0 }));
    assert!(cache.get("uk", "ubi", &params).is_none());
}

#[test]
fn non_cacheable_endpoints_bypass_the_store() {
    let store = Arc::new(CountingStore::new());
    let cache = CacheLayer::new(Box::new(Arc::clone(&store)), "1.0.0");
    let registry = CountryRegistry::bundled(cache).unwrap();
    let params = Params::new();

    registry.dispatch("uk", "parameters", &params).unwrap();
    registry.dispatch("uk", "parameters", &params).unwrap();
    assert_eq!(store.reads.load(Ordering::SeqCst), 0);
    assert_eq!(store.writes.load(Ordering::SeqCst), 0);
}

#[test]
fn cacheable_endpoints_compute_once() {
    let store = Arc::new(CountingStore::new());
    let cache = CacheLayer::new(Box::new(Arc::clone(&store)), "1.0.0");
    let registry = CountryRegistry::bundled(cache).unwrap();
    let params = Params::new();

    let first = registry.dispatch("uk", "ubi", &params).unwrap();
    assert_eq!(store.writes.load(Ordering::SeqCst), 1);
    let second = registry.dispatch("uk", "ubi", &params).unwrap();
    // Served from the store, not rewritten.
    assert_eq!(store.writes.load(Ordering::SeqCst), 1);
    assert_eq!(first, second);
}
