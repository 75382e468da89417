//! Response caching: content-addressed keys over an injected blob store.
//!
//! The layer owns key derivation and the get/put contract only; the
//! backing store (object storage in production, sqlite in the bundled
//! server, memory in tests) is an injected capability. Store failures
//! are always soft: a failing read is a miss and a failing write is
//! skipped, so the cache can never fail a request.

use std::collections::BTreeMap;
use std::sync::Mutex;

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::error::StoreError;

/// The flat, merged request-parameter mapping.
pub type Params = BTreeMap<String, Value>;

/// Injected persistence capability. Absence of a key is a normal miss.
pub trait CacheStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    fn write(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;
}

impl<S: CacheStore + ?Sized> CacheStore for std::sync::Arc<S> {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        (**self).write(key, value)
    }
}

/// In-memory store, used in tests and local development.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<FxHashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| StoreError(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StoreError(e.to_string()))?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

/// Caches JSON payloads keyed by (country, endpoint, version, params).
///
/// Entries are never invalidated explicitly; bumping the version string
/// moves every key to a fresh epoch and strands the old entries.
pub struct CacheLayer {
    store: Option<Box<dyn CacheStore>>,
    version: String,
}

impl CacheLayer {
    #[must_use]
    pub fn new(store: Box<dyn CacheStore>, version: impl Into<String>) -> Self {
        Self {
            store: Some(store),
            version: version.into(),
        }
    }

    /// A layer with no store: every get misses, every put is dropped.
    /// Used when the debug flag disables caching.
    #[must_use]
    pub fn disabled(version: impl Into<String>) -> Self {
        Self {
            store: None,
            version: version.into(),
        }
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Deterministic cache key: blake3 over a canonical encoding of the
    /// request identity. Key order and scalar typing of `params` do not
    /// affect the result.
    #[must_use]
    pub fn key(&self, country: &str, endpoint: &str, params: &Params) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(country.as_bytes());
        hasher.update(&[0]);
        hasher.update(endpoint.as_bytes());
        hasher.update(&[0]);
        hasher.update(self.version.as_bytes());
        hasher.update(&[0]);
        let mut encoded = String::new();
        for (name, value) in params {
            encoded.push_str(name);
            encoded.push('=');
            canonical_json(&normalize_value(value), &mut encoded);
            encoded.push('&');
        }
        hasher.update(encoded.as_bytes());
        hasher.finalize().to_hex().to_string()
    }

    pub fn get(&self, country: &str, endpoint: &str, params: &Params) -> Option<Value> {
        let store = self.store.as_ref()?;
        let key = self.key(country, endpoint, params);
        match store.read(&key) {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(payload) => Some(payload),
                Err(e) => {
                    tracing::warn!(key, error = %e, "discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache read failed, recomputing");
                None
            }
        }
    }

    pub fn put(&self, country: &str, endpoint: &str, params: &Params, payload: &Value) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        let key = self.key(country, endpoint, params);
        match serde_json::to_vec(payload) {
            Ok(bytes) => {
                if let Err(e) = store.write(&key, &bytes) {
                    tracing::warn!(key, error = %e, "cache write failed, skipping");
                }
            }
            Err(e) => tracing::warn!(key, error = %e, "payload not serializable, not cached"),
        }
    }
}

/// Type-normalize one request value: strings that parse as numbers or
/// booleans become those scalars, and all numbers go through `f64` so a
/// query-string `"1"` and a JSON-body `1` encode identically.
#[must_use]
pub fn normalize_value(value: &Value) -> Value {
    match value {
        Value::String(s) => {
            if let Ok(x) = s.parse::<f64>() {
                serde_json::Number::from_f64(x).map_or_else(|| value.clone(), Value::Number)
            } else if let Ok(b) = s.parse::<bool>() {
                Value::Bool(b)
            } else {
                value.clone()
            }
        }
        Value::Number(n) => n
            .as_f64()
            .and_then(serde_json::Number::from_f64)
            .map_or_else(|| value.clone(), Value::Number),
        Value::Array(items) => Value::Array(items.iter().map(normalize_value).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), normalize_value(v)))
                .collect(),
        ),
        _ => value.clone(),
    }
}

/// Normalize every value of a merged parameter mapping.
#[must_use]
pub fn normalize_params(params: Params) -> Params {
    params
        .into_iter()
        .map(|(k, v)| {
            let normalized = normalize_value(&v);
            (k, normalized)
        })
        .collect()
}

/// Order-independent, whitespace-free JSON encoding: object keys are
/// emitted sorted regardless of the map's iteration order.
fn canonical_json(value: &Value, out: &mut String) {
    match value {
        Value::Object(fields) => {
            let sorted: BTreeMap<&String, &Value> = fields.iter().collect();
            out.push('{');
            for (i, (key, inner)) in sorted.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                canonical_json(inner, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, inner) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                canonical_json(inner, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
