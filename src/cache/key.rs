//! Deterministic cache keys for outbound requests.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Identity of a request for caching purposes.
///
/// Params and body are normalized on construction (params sorted by name,
/// object keys sorted recursively), so two requests that differ only in
/// ordering map to the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    method: String,
    url: String,
    params: BTreeMap<String, String>,
    body: Option<Value>,
    key: String,
}

impl RequestDescriptor {
    pub fn new(
        method: &str,
        url: &str,
        params: impl IntoIterator<Item = (String, String)>,
        body: Option<&Value>,
    ) -> Self {
        let method = method.to_ascii_uppercase();
        let params: BTreeMap<String, String> = params.into_iter().collect();
        let body = body.map(normalize);
        let key = format!(
            "{}:{}:{}:{}",
            method,
            url,
            canonical_json(&params),
            body.as_ref()
                .map(canonical_json)
                .unwrap_or_else(|| "{}".to_string()),
        );
        Self {
            method,
            url: url.to_string(),
            params,
            body,
            key,
        }
    }

    /// `METHOD:url:{params}:{body}`, e.g. `GET:/foo:{}:{}`.
    pub fn cache_key(&self) -> &str {
        &self.key
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }
}

impl std::fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key)
    }
}

fn canonical_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

/// Rebuild `value` with every object's keys in sorted order.
fn normalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for k in keys {
                sorted.insert(k.clone(), normalize(&map[k]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(normalize).collect()),
        other => other.clone(),
    }
}
