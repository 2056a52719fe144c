//! Cache key generation.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Join key shared by the response cache and the in-flight table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub hash: String,
    pub operation: String,
}

impl CacheKey {
    /// Derive the key for an (operation, payload) pair.
    ///
    /// Object keys are sorted recursively before hashing, so payloads that
    /// differ only in field order share a key.
    pub fn for_call(operation: &str, payload: &Value) -> Self {
        let mut canonical = Map::new();
        canonical.insert("operation".into(), Value::String(operation.to_string()));
        canonical.insert("payload".into(), canonicalize(payload));
        let text = serde_json::to_string(&Value::Object(canonical)).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        Self {
            hash: hex::encode(hasher.finalize()),
            operation: operation.to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = Map::new();
            for (k, v) in entries {
                sorted.insert(k.clone(), canonicalize(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
