//! Redaction of audit payloads.
//!
//! Bearer tokens, request signatures, principal secrets and authorization
//! headers never reach the audit file.

use serde_json::{Map, Value};

/// Key fragments whose values are redacted (matched case-insensitively).
const SENSITIVE_KEYS: &[&str] = &[
    "token",
    "signature",
    "secret",
    "authorization",
    "auth",
    "api_key",
    "password",
    "credential",
];

/// Maximum length for string values before truncation.
const MAX_STRING_LENGTH: usize = 1024;

/// Keys whose values are truncated when long.
const TRUNCATABLE_KEYS: &[&str] = &["body", "body_base64", "query"];

const REDACTED: &str = "[REDACTED]";

/// Return a copy of `value` with sensitive keys redacted and large request
/// bodies truncated. Applied to both params and result data.
pub fn sanitize_params(value: &Value) -> Value {
    sanitize_value(value, false)
}

fn is_sensitive(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_KEYS.iter().any(|s| key.contains(s))
}

fn sanitize_value(value: &Value, truncatable: bool) -> Value {
    match value {
        Value::Object(map) => {
            let mut sanitized = Map::new();
            for (key, val) in map {
                if is_sensitive(key) {
                    sanitized.insert(key.clone(), Value::String(REDACTED.to_string()));
                } else {
                    let truncate = TRUNCATABLE_KEYS.iter().any(|k| key.eq_ignore_ascii_case(k));
                    sanitized.insert(key.clone(), sanitize_value(val, truncate));
                }
            }
            Value::Object(sanitized)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| sanitize_value(v, truncatable))
                .collect(),
        ),
        Value::String(s) if truncatable && s.len() > MAX_STRING_LENGTH => {
            Value::String(format!("[TRUNCATED - {} bytes]", s.len()))
        }
        _ => value.clone(),
    }
}
