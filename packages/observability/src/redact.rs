//! Field redaction applied before log lines are written.
//!
//! Wallet addresses stay readable; bearer tokens, wallet signatures and key
//! material never reach disk.

use serde_json::{Map, Value};
use std::collections::HashMap;

pub const REDACTED: &str = "[REDACTED]";

const MAX_FIELD_LEN: usize = 512;

const DENYLIST_KEYS: [&str; 9] = [
    "token",
    "authorization",
    "signature",
    "secret",
    "private_key",
    "keypair",
    "password",
    "cookie",
    "nonce",
];

/// Redact every field of a log entry in place.
pub fn sanitize_fields(fields: &mut HashMap<String, Value>) {
    for (key, value) in fields.iter_mut() {
        *value = sanitize_value(key, value);
    }
}

/// Redact a single value given the key it is stored under.
pub fn sanitize_value(key: &str, value: &Value) -> Value {
    if is_sensitive_key(key) {
        return Value::String(REDACTED.to_string());
    }

    match value {
        Value::String(s) => sanitize_string(s),
        Value::Object(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                out.insert(k.clone(), sanitize_value(k, v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(|item| sanitize_value(key, item)).collect()),
        _ => value.clone(),
    }
}

fn sanitize_string(raw: &str) -> Value {
    if looks_like_sensitive_value(raw) {
        return Value::String(REDACTED.to_string());
    }
    if raw.len() > MAX_FIELD_LEN {
        let mut end = MAX_FIELD_LEN;
        while !raw.is_char_boundary(end) {
            end -= 1;
        }
        return Value::String(format!("{}...[TRUNCATED]", &raw[..end]));
    }
    Value::String(raw.to_string())
}

/// Heuristics for secrets logged under an innocent key.
///
/// A base58 ed25519 signature is 87-88 characters and trips the long
/// alphanumeric check; a 32-44 character wallet address does not.
pub fn looks_like_sensitive_value(raw: &str) -> bool {
    let lower = raw.to_ascii_lowercase();
    if lower.starts_with("bearer ") {
        return true;
    }
    if raw.matches('.').count() == 2 && raw.len() > 40 && !raw.contains(' ') {
        return true;
    }
    is_long_hex(raw) || is_long_base64(raw)
}

pub fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    DENYLIST_KEYS.iter().any(|entry| lower.contains(entry))
}

fn is_long_hex(value: &str) -> bool {
    value.len() > 48 && value.chars().all(|c| c.is_ascii_hexdigit())
}

fn is_long_base64(value: &str) -> bool {
    value.len() > 48
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=' || c == '_' || c == '-')
}
