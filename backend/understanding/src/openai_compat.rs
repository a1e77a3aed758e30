use std::time::Instant;

use async_trait::async_trait;
use perceptor_core::{GenerationRequest, GenerationResponse, PerceptorError, TextGenerator};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http::send_json;

/// Any server speaking the OpenAI `/chat/completions` dialect.
pub struct OpenAiCompatGenerator {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiCompatGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[async_trait]
impl TextGenerator for OpenAiCompatGenerator {
    fn name(&self) -> &str {
        "openai_compat"
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<GenerationResponse, PerceptorError> {
        let start = Instant::now();
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!(model = %self.model, base_url = %self.base_url, "Sending chat completion request");

        let mut http_request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if !self.api_key.is_empty() {
            http_request = http_request.bearer_auth(&self.api_key);
        }
        let value = send_json(self.name(), http_request).await?;

        let chat: ChatResponse = serde_json::from_value(value).map_err(|e| {
            PerceptorError::upstream(self.name(), format!("unexpected response shape: {e}"))
        })?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        Ok(GenerationResponse {
            content,
            provider: "openai_compat".to_string(),
            model: self.model.clone(),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
