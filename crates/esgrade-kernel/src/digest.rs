//! Content digests for scored inputs.
//!
//! A report names the exact inputs it scored by hashing their canonical
//! JSON: object keys sorted recursively, compact separators.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

pub const DIGEST_PREFIX: &str = "sha256:";

fn sort_json_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            let mut sorted = Map::new();
            for key in keys {
                if let Some(item) = map.get(key) {
                    sorted.insert(key.clone(), sort_json_value(item));
                }
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_json_value).collect()),
        _ => value.clone(),
    }
}

pub fn canonical_json(value: &Value) -> String {
    // Serializing a `Value` cannot fail: keys are strings and numbers finite.
    serde_json::to_string(&sort_json_value(value)).unwrap_or_default()
}

pub fn content_digest(value: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_json(value).as_bytes());
    format!("{DIGEST_PREFIX}{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn digest_ignores_key_order() {
        let a = json!({"company": "Acme", "ghg": {"scope1_tco2e": 1.5, "scope3_tco2e": null}});
        let b = json!({"ghg": {"scope3_tco2e": null, "scope1_tco2e": 1.5}, "company": "Acme"});
        assert_eq!(content_digest(&a), content_digest(&b));
        assert!(content_digest(&a).starts_with(DIGEST_PREFIX));
    }

    #[test]
    fn digest_is_value_sensitive() {
        assert_ne!(
            content_digest(&json!({"year": 2023})),
            content_digest(&json!({"year": 2024}))
        );
    }

    #[test]
    fn canonical_json_is_compact() {
        assert_eq!(canonical_json(&json!({"b": [1, 2], "a": true})), r#"{"a":true,"b":[1,2]}"#);
    }
}
