//! `${VAR_NAME}` substitution for config values.
//!
//! Only uppercase `[A-Z_][A-Z0-9_]*` names are matched. `$${VAR}` escapes to
//! a literal `${VAR}`.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;

/// Group 1 is the escaping `$`, group 2 the variable name.
static ENV_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$(\$)?\{([A-Z_][A-Z0-9_]*)\}").expect("static regex"));

#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references across a config value tree.
/// Missing or empty variables are an error.
pub fn resolve_env_vars_with(
    value: &Value,
    env: &HashMap<String, String>,
) -> Result<Value, MissingEnvVarError> {
    substitute_value(value, env, "")
}

fn substitute_value(
    value: &Value,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<Value, MissingEnvVarError> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                let child = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                out.insert(k.clone(), substitute_value(v, env, &child)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(
    s: &str,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<String, MissingEnvVarError> {
    if !s.contains('$') {
        return Ok(s.to_string());
    }

    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    for caps in ENV_REF.captures_iter(s) {
        let whole = caps.get(0).expect("group 0 always present");
        out.push_str(&s[last..whole.start()]);
        out.push_str(&expand(&caps, env, path)?);
        last = whole.end();
    }
    out.push_str(&s[last..]);
    Ok(out)
}

fn expand(
    caps: &Captures<'_>,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<String, MissingEnvVarError> {
    let name = &caps[2];
    if caps.get(1).is_some() {
        return Ok(format!("${{{name}}}"));
    }
    match env.get(name) {
        Some(val) if !val.is_empty() => Ok(val.clone()),
        _ => Err(MissingEnvVarError {
            var_name: name.to_string(),
            config_path: path.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_nested_values() {
        let value = json!({
            "generator": { "api_key": "${GEMINI_API_KEY}" },
            "ocr": { "base_url": "https://${HOST}/v1", "location": "us" }
        });
        let resolved = resolve_env_vars_with(
            &value,
            &env(&[("GEMINI_API_KEY", "k-123"), ("HOST", "example.test")]),
        )
        .unwrap();
        assert_eq!(resolved["generator"]["api_key"], "k-123");
        assert_eq!(resolved["ocr"]["base_url"], "https://example.test/v1");
        assert_eq!(resolved["ocr"]["location"], "us");
    }

    #[test]
    fn missing_var_reports_path() {
        let value = json!({ "ocr": { "access_token": "${MISSING_TOKEN}" } });
        let err = resolve_env_vars_with(&value, &HashMap::new()).unwrap_err();
        assert_eq!(err.var_name, "MISSING_TOKEN");
        assert_eq!(err.config_path, "ocr.access_token");
    }

    #[test]
    fn escaped_reference_is_literal() {
        let value = json!({ "note": "cost $${NOT_A_VAR}" });
        let resolved = resolve_env_vars_with(&value, &HashMap::new()).unwrap();
        assert_eq!(resolved["note"], "cost ${NOT_A_VAR}");
    }
}
