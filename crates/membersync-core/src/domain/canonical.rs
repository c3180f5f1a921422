//! Canonical serialization and content hashing
//!
//! Change detection rests on one guarantee: two structurally equal payloads
//! always produce the same hash, irrespective of the order in which object
//! keys were inserted. `stable_stringify` produces that canonical form and
//! `hash_value` is SHA-256 over its UTF-8 bytes.
//!
//! The hash is for cheap equality checks only, not cryptographic integrity.

use serde_json::Value;
use sha2::{Digest, Sha256};

use super::errors::DomainError;
use super::newtypes::ContentHash;

/// Serializes a JSON value deterministically.
///
/// - `null` serializes to the fixed literal `null`
/// - arrays serialize element-wise, in order
/// - objects serialize with keys in sorted order, recursively
/// - scalars use their canonical `serde_json` literal form
pub fn stable_stringify(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => {
            // serde_json's string serialization is canonical (escaping included)
            out.push_str(&Value::String(s.clone()).to_string());
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
    }
}

/// SHA-256 of the UTF-8 bytes of `input`, as lowercase hex.
pub fn hash_canonical(input: &str) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    ContentHash::new(hex).expect("SHA-256 digest is always 64 hex characters")
}

/// Content hash of a payload: SHA-256 over its canonical serialization.
pub fn hash_value(value: &Value) -> ContentHash {
    hash_canonical(&stable_stringify(value))
}

/// Parses a stored hash column, mapping format errors to `DomainError`.
pub fn parse_hash(s: &str) -> Result<ContentHash, DomainError> {
    ContentHash::new(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_is_fixed_literal() {
        assert_eq!(stable_stringify(&Value::Null), "null");
    }

    #[test]
    fn test_scalars_canonical() {
        assert_eq!(stable_stringify(&json!(true)), "true");
        assert_eq!(stable_stringify(&json!(42)), "42");
        assert_eq!(stable_stringify(&json!("hi")), "\"hi\"");
    }

    #[test]
    fn test_array_order_preserved() {
        assert_eq!(stable_stringify(&json!([3, 1, 2])), "[3,1,2]");
    }

    #[test]
    fn test_object_keys_sorted() {
        let v = json!({"zebra": 1, "apple": 2, "mango": 3});
        assert_eq!(
            stable_stringify(&v),
            "{\"apple\":2,\"mango\":3,\"zebra\":1}"
        );
    }

    #[test]
    fn test_key_order_does_not_affect_output() {
        let a: Value = serde_json::from_str(r#"{"name":"Alice","email":"a@example.com"}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"email":"a@example.com","name":"Alice"}"#).unwrap();
        assert_eq!(stable_stringify(&a), stable_stringify(&b));
        assert_eq!(hash_value(&a), hash_value(&b));
    }

    #[test]
    fn test_nested_objects_sorted_recursively() {
        let a = json!({"outer": {"b": 1, "a": 2}, "list": [{"y": 0, "x": 9}]});
        let b = json!({"list": [{"x": 9, "y": 0}], "outer": {"a": 2, "b": 1}});
        assert_eq!(hash_value(&a), hash_value(&b));
    }

    #[test]
    fn test_different_values_different_hash() {
        let a = json!({"name": "Alice"});
        let b = json!({"name": "Alicia"});
        assert_ne!(hash_value(&a), hash_value(&b));
    }

    #[test]
    fn test_string_escaping_is_canonical() {
        let v = json!({"note": "line1\nline2 \"quoted\""});
        let out = stable_stringify(&v);
        assert!(out.contains("\\n"));
        assert!(out.contains("\\\""));
    }

    #[test]
    fn test_hash_is_sha256_hex() {
        // SHA-256 of the empty string, a fixed vector
        let hash = hash_canonical("");
        assert_eq!(
            hash.as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_hash_stable_across_calls() {
        let v = json!({"a": [1, 2, 3], "b": null});
        assert_eq!(hash_value(&v), hash_value(&v));
    }
}
