//! Log Redaction
//!
//! Scrubs API keys and bearer tokens from strings (typically upstream error
//! bodies and URLs) before they reach the log.

use regex::Regex;
use std::sync::LazyLock;

static BEARER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Bearer\s+[a-zA-Z0-9\-\._~+/]+=*").unwrap());
/// Google API keys and OpenAI-style secret keys.
static API_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(AIza[0-9A-Za-z\-_]{20,})|(sk-[a-zA-Z0-9\-_]{20,})").unwrap());
static KEY_PARAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([?&](?:key|access_token)=)[^&\s]+").unwrap());

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = BEARER_RE.replace_all(input, "Bearer [REDACTED_TOKEN]");
    let redacted = API_KEY_RE.replace_all(&redacted, "[REDACTED_KEY]");
    KEY_PARAM_RE
        .replace_all(&redacted, "${1}[REDACTED]")
        .into_owned()
}
