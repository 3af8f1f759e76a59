use serde_json::Value;
use sha2::{Digest, Sha256};

/// Sentinel fingerprint for an empty or null output value — the empty
/// string itself, so every `in_digest.is_empty()` / `derive_status` check
/// downstream (§4.6: "if `d == ""`, skip"; "`in_digest = ""` -> pending")
/// can test it directly without a second "is this the unknown sentinel"
/// comparison.
pub const UNKNOWN: &str = "";

/// Deterministic, content-addressable fingerprint of an arbitrary
/// JSON-representable value.
///
/// Canonicalization: object keys are sorted lexicographically (`serde_json`
/// already parses objects into a `BTreeMap` by key, so this falls out of
/// parsing rather than a secondary sort pass); array order is preserved as
/// written; numbers are hashed in their original textual form (via
/// `arbitrary_precision`, so `1.0` and `1.00` are **not** considered equal —
/// re-serialization never normalizes them); strings are hashed as their
/// decoded UTF-8 bytes, not their JSON-escaped form.
///
/// A `null` value, or an empty string, fingerprints to the sentinel
/// [`UNKNOWN`] (the empty string) rather than a SHA-256 digest — there is
/// nothing to distinguish an absent output from another absent output.
pub fn fingerprint(value: &Value) -> String {
    if is_empty(value) {
        return UNKNOWN.to_string();
    }
    let mut buf = Vec::new();
    write_canonical(value, &mut buf);
    to_hex(&Sha256::digest(&buf))
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Writes a length-prefixed, type-tagged canonical encoding of `value` into
/// `buf`. The type tag and length prefixes prevent ambiguity between, e.g.,
/// `{"a": "bc"}` and `{"ab": "c"}` hashing to the same bytes.
fn write_canonical(value: &Value, buf: &mut Vec<u8>) {
    match value {
        Value::Null => buf.push(0),
        Value::Bool(b) => {
            buf.push(1);
            buf.push(u8::from(*b));
        }
        Value::Number(n) => {
            buf.push(2);
            write_len_prefixed(buf, n.to_string().as_bytes());
        }
        Value::String(s) => {
            buf.push(3);
            write_len_prefixed(buf, s.as_bytes());
        }
        Value::Array(items) => {
            buf.push(4);
            buf.extend_from_slice(&(items.len() as u64).to_be_bytes());
            for item in items {
                write_canonical(item, buf);
            }
        }
        Value::Object(map) => {
            buf.push(5);
            buf.extend_from_slice(&(map.len() as u64).to_be_bytes());
            for (key, val) in map {
                write_len_prefixed(buf, key.as_bytes());
                write_canonical(val, buf);
            }
        }
    }
}

fn write_len_prefixed(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u64).to_be_bytes());
    buf.extend_from_slice(bytes);
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_and_empty_string_are_unknown() {
        assert_eq!(fingerprint(&Value::Null), UNKNOWN);
        assert_eq!(fingerprint(&json!("")), UNKNOWN);
        assert!(fingerprint(&Value::Null).is_empty());
    }

    #[test]
    fn object_key_order_does_not_affect_fingerprint() {
        let a = serde_json::from_str::<Value>(r#"{"a":1,"b":2}"#).unwrap();
        let b = serde_json::from_str::<Value>(r#"{"b":2,"a":1}"#).unwrap();
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn array_order_changes_fingerprint() {
        let a = json!([1, 2, 3]);
        let b = json!([3, 2, 1]);
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn idempotent_on_reparse() {
        let v = json!({"vpc_id": "vpc-1", "count": 3});
        let reparsed: Value = serde_json::from_str(&v.to_string()).unwrap();
        assert_eq!(fingerprint(&v), fingerprint(&reparsed));
    }

    #[test]
    fn different_values_differ() {
        assert_ne!(fingerprint(&json!("vpc-1")), fingerprint(&json!("vpc-2")));
    }
}
