use std::time::Instant;

use async_trait::async_trait;
use perceptor_core::{GenerationRequest, GenerationResponse, PerceptorError, TextGenerator};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

use crate::http::send_json;

/// Google Gemini `generateContent` text generator.
pub struct GeminiGenerator {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiGenerator {
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
impl TextGenerator for GeminiGenerator {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<GenerationResponse, PerceptorError> {
        let start = Instant::now();
        let body = json!({
            "contents": [{ "parts": [{ "text": request.prompt }] }],
            "generationConfig": {
                "maxOutputTokens": request.max_tokens,
                "temperature": request.temperature,
            }
        });

        debug!(model = %self.model, "Sending request to Gemini");

        let http_request = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body);
        let response = send_json(self.name(), http_request).await?;

        Ok(GenerationResponse {
            content: candidate_text(&response),
            provider: "gemini".to_string(),
            model: self.model.clone(),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Concatenate the text parts of the first candidate.
pub(crate) fn candidate_text(response: &Value) -> String {
    response["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p["text"].as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use axum::{Json, Router, http::HeaderMap, routing::post};

    use super::*;

    #[test]
    fn test_candidate_text_joins_parts() {
        let response = json!({
            "candidates": [{ "content": { "parts": [{ "text": "Joy" }, { "text": "ful" }] } }]
        });
        assert_eq!(candidate_text(&response), "Joyful");
        assert_eq!(candidate_text(&json!({ "candidates": [] })), "");
    }

    #[tokio::test]
    async fn test_complete_sends_key_header_and_config() {
        let router = Router::new().route(
            "/v1beta/models/{model}",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let key = headers
                    .get("x-goog-api-key")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                let tokens = body["generationConfig"]["maxOutputTokens"].clone();
                Json(json!({
                    "candidates": [{ "content": { "parts": [{ "text": format!("{key}:{tokens}") }] } }]
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let generator =
            GeminiGenerator::new("secret-key", "gemini-1.5-flash").with_base_url(format!("http://{addr}"));
        let response = generator
            .complete(&GenerationRequest::new("hello").with_max_tokens(16))
            .await
            .unwrap();
        assert_eq!(response.content, "secret-key:16");
        assert_eq!(response.provider, "gemini");
        assert_eq!(response.model, "gemini-1.5-flash");
    }
}
