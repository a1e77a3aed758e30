//! Shared request/response handling for upstream JSON APIs.

use perceptor_core::PerceptorError;
use perceptor_logging::redact_sensitive_data;
use reqwest::RequestBuilder;
use serde_json::Value;
use tracing::debug;

/// Longest upstream error body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

/// Send `request`, require a 2xx status, and parse the body as JSON.
pub(crate) async fn send_json(service: &str, request: RequestBuilder) -> Result<Value, PerceptorError> {
    let response = request
        .send()
        .await
        .map_err(|e| PerceptorError::upstream(service, redact_sensitive_data(&e.to_string())))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let body = redact_sensitive_data(&truncate(&body));
        debug!(service, status = status.as_u16(), body = %body, "Upstream returned error status");
        return Err(PerceptorError::upstream_status(
            service,
            status.as_u16(),
            format!("{status}: {body}"),
        ));
    }

    response.json::<Value>().await.map_err(|e| {
        PerceptorError::upstream_status(
            service,
            status.as_u16(),
            format!("invalid JSON response: {e}"),
        )
    })
}

fn truncate(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.to_string(),
    }
}
