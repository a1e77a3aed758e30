//! Produce safe-to-share config snapshots by masking secrets.

use serde_json::Value;

const SENSITIVE_KEYS: &[&str] = &[
    "api_key",
    "apiKey",
    "access_token",
    "accessToken",
    "token",
    "secret",
    "password",
];

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

/// Replace every sensitive string with its first four characters + `***`.
pub fn redact(value: &Value) -> Value {
    redact_recursive(value, "")
}

fn redact_recursive(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) if is_sensitive_key(key) && !s.is_empty() => {
            let hint: String = s.chars().take(4).collect();
            if s.chars().count() > 4 {
                Value::String(format!("{hint}***"))
            } else {
                Value::String("***".to_string())
            }
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| redact_recursive(v, key)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_recursive(v, k)))
                .collect(),
        ),
        other => other.clone(),
    }
}
