//! Optical Character Recognition (OCR)
//!
//! Two hosted backends: Google Document AI (processor `:process` endpoint)
//! and a Gemini vision model prompted to transcribe the image.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use perceptor_core::{OcrProvider, PerceptorError};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::auth::AccessTokenSource;
use crate::http::send_json;

/// Text returned when the OCR service finds nothing to read.
pub const NO_TEXT_FOUND: &str = "No text found.";

const TRANSCRIBE_PROMPT: &str = "Transcribe all text visible in this image exactly as written. \
Return only the text, preserving reading order. If there is no text, return an empty response.";

/// Google Document AI processor.
///
/// A token is requested from `tokens` for every call, so refreshing sources
/// keep working past the lifetime of a single OAuth token.
pub struct DocumentAiOcr {
    client: Client,
    project_id: String,
    location: String,
    processor_id: String,
    tokens: Arc<dyn AccessTokenSource>,
    base_url: String,
}

impl DocumentAiOcr {
    pub fn new(
        project_id: impl Into<String>,
        location: impl Into<String>,
        processor_id: impl Into<String>,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Self {
        let location = location.into();
        Self {
            client: Client::new(),
            base_url: format!("https://{location}-documentai.googleapis.com"),
            project_id: project_id.into(),
            location,
            processor_id: processor_id.into(),
            tokens,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/processors/{}:process",
            self.base_url, self.project_id, self.location, self.processor_id
        )
    }
}

#[async_trait]
impl OcrProvider for DocumentAiOcr {
    fn name(&self) -> &str {
        "document_ai"
    }

    async fn extract_text(&self, image: &[u8], mime_type: &str) -> Result<String, PerceptorError> {
        let start = Instant::now();
        let body = json!({
            "rawDocument": {
                "content": STANDARD.encode(image),
                "mimeType": mime_type,
            }
        });

        let token = self.tokens.access_token().await?;
        debug!(
            processor = %self.processor_id,
            bytes = image.len(),
            auth = self.tokens.name(),
            "Sending document to Document AI"
        );

        let request = self
            .client
            .post(self.endpoint())
            .bearer_auth(token)
            .json(&body);
        let response = send_json(self.name(), request).await?;

        let text = document_text(&response);
        info!(
            chars = text.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Document AI OCR complete"
        );
        Ok(text)
    }
}

fn document_text(response: &Value) -> String {
    match response["document"]["text"].as_str() {
        Some(text) if !text.trim().is_empty() => text.to_string(),
        _ => NO_TEXT_FOUND.to_string(),
    }
}

/// Gemini multimodal model used as an OCR engine.
pub struct GeminiVisionOcr {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiVisionOcr {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl OcrProvider for GeminiVisionOcr {
    fn name(&self) -> &str {
        "gemini_vision"
    }

    async fn extract_text(&self, image: &[u8], mime_type: &str) -> Result<String, PerceptorError> {
        let start = Instant::now();
        let body = json!({
            "contents": [{ "parts": [
                { "text": TRANSCRIBE_PROMPT },
                { "inlineData": { "mimeType": mime_type, "data": STANDARD.encode(image) } }
            ]}]
        });

        debug!(model = %self.model, bytes = image.len(), "Sending image to Gemini vision");

        let request = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body);
        let response = send_json(self.name(), request).await?;

        let text = crate::gemini::candidate_text(&response);
        info!(
            chars = text.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Gemini vision OCR complete"
        );
        if text.trim().is_empty() {
            Ok(NO_TEXT_FOUND.to_string())
        } else {
            Ok(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::{Json, Router, extract::State, http::HeaderMap, http::StatusCode, routing::post};

    use super::*;
    use crate::auth::StaticToken;

    fn token(value: &str) -> Arc<dyn AccessTokenSource> {
        Arc::new(StaticToken::new(value))
    }

    /// Hands out `tok-1`, `tok-2`, ... like a source that refreshed in between.
    #[derive(Default)]
    struct RotatingToken {
        issued: AtomicUsize,
    }

    #[async_trait]
    impl AccessTokenSource for RotatingToken {
        fn name(&self) -> &str {
            "rotating"
        }

        async fn access_token(&self) -> Result<String, PerceptorError> {
            let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("tok-{n}"))
        }
    }

    struct FailingToken;

    #[async_trait]
    impl AccessTokenSource for FailingToken {
        fn name(&self) -> &str {
            "failing"
        }

        async fn access_token(&self) -> Result<String, PerceptorError> {
            Err(PerceptorError::upstream("google_auth", "metadata server unreachable"))
        }
    }

    #[derive(Clone, Default)]
    struct Captured {
        auth: Arc<Mutex<Option<String>>>,
        body: Arc<Mutex<Option<Value>>>,
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn document_ai_stub(captured: Captured, reply: Value) -> Router {
        Router::new()
            .route(
                "/v1/projects/{project}/locations/{location}/processors/{processor}",
                post(
                    move |State(captured): State<Captured>, headers: HeaderMap, Json(body): Json<Value>| {
                        let reply = reply.clone();
                        async move {
                            *captured.auth.lock().unwrap() = headers
                                .get("authorization")
                                .and_then(|v| v.to_str().ok())
                                .map(str::to_string);
                            *captured.body.lock().unwrap() = Some(body);
                            Json(reply)
                        }
                    },
                ),
            )
            .with_state(captured)
    }

    #[tokio::test]
    async fn test_document_ai_returns_document_text() {
        let captured = Captured::default();
        let base = serve(document_ai_stub(
            captured.clone(),
            json!({ "document": { "text": "Invoice Total: $500" } }),
        ))
        .await;

        let ocr = DocumentAiOcr::new("proj", "us", "proc-1", token("token-abc")).with_base_url(base);
        let text = ocr.extract_text(b"fake-png", "image/png").await.unwrap();
        assert_eq!(text, "Invoice Total: $500");

        let auth = captured.auth.lock().unwrap().clone();
        assert_eq!(auth.as_deref(), Some("Bearer token-abc"));
        let body = captured.body.lock().unwrap().clone().unwrap();
        assert_eq!(body["rawDocument"]["mimeType"], "image/png");
        assert_eq!(body["rawDocument"]["content"], STANDARD.encode(b"fake-png"));
    }

    #[tokio::test]
    async fn test_document_ai_empty_document() {
        let base = serve(document_ai_stub(Captured::default(), json!({ "document": {} }))).await;
        let ocr = DocumentAiOcr::new("proj", "us", "proc-1", token("t")).with_base_url(base);
        let text = ocr.extract_text(b"x", "image/jpeg").await.unwrap();
        assert_eq!(text, NO_TEXT_FOUND);
    }

    #[tokio::test]
    async fn test_document_ai_error_status_is_upstream_error() {
        let router = Router::new().route(
            "/v1/projects/{project}/locations/{location}/processors/{processor}",
            post(|| async { (StatusCode::FORBIDDEN, "permission denied") }),
        );
        let base = serve(router).await;
        let ocr = DocumentAiOcr::new("proj", "us", "proc-1", token("t")).with_base_url(base);

        let err = ocr.extract_text(b"x", "image/jpeg").await.unwrap_err();
        match &err {
            PerceptorError::Upstream { status, service, .. } => {
                assert_eq!(*status, Some(403));
                assert_eq!(service, "document_ai");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_document_ai_asks_token_source_on_every_call() {
        let captured = Captured::default();
        let base = serve(document_ai_stub(
            captured.clone(),
            json!({ "document": { "text": "hi" } }),
        ))
        .await;
        let ocr = DocumentAiOcr::new("proj", "us", "proc-1", Arc::new(RotatingToken::default()))
            .with_base_url(base);

        ocr.extract_text(b"a", "image/png").await.unwrap();
        assert_eq!(captured.auth.lock().unwrap().as_deref(), Some("Bearer tok-1"));
        ocr.extract_text(b"b", "image/png").await.unwrap();
        assert_eq!(captured.auth.lock().unwrap().as_deref(), Some("Bearer tok-2"));
    }

    #[tokio::test]
    async fn test_document_ai_token_failure_skips_request() {
        let captured = Captured::default();
        let base = serve(document_ai_stub(captured.clone(), json!({}))).await;
        let ocr = DocumentAiOcr::new("proj", "us", "proc-1", Arc::new(FailingToken)).with_base_url(base);

        let err = ocr.extract_text(b"x", "image/jpeg").await.unwrap_err();
        assert!(err.is_transient());
        assert!(captured.body.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_gemini_vision_reads_candidate_text() {
        let router = Router::new().route(
            "/v1beta/models/{model}",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["contents"][0]["parts"][1]["inlineData"]["mimeType"], "image/png");
                Json(json!({
                    "candidates": [{ "content": { "parts": [{ "text": "STOP" }] } }]
                }))
            }),
        );
        let base = serve(router).await;
        let ocr = GeminiVisionOcr::new("key", "gemini-2.0-flash").with_base_url(base);
        assert_eq!(ocr.extract_text(b"img", "image/png").await.unwrap(), "STOP");
    }

    #[test]
    fn test_document_endpoint_shape() {
        let ocr = DocumentAiOcr::new("p1", "eu", "abc", token("t"));
        assert_eq!(
            ocr.endpoint(),
            "https://eu-documentai.googleapis.com/v1/projects/p1/locations/eu/processors/abc:process"
        );
    }
}
