use async_trait::async_trait;

use crate::error::PerceptorError;

/// Document-to-text capability backed by an OCR service.
#[async_trait]
pub trait OcrProvider: Send + Sync {
    /// Provider name (e.g., "document_ai", "gemini_vision").
    fn name(&self) -> &str;

    /// Extract all discernible text from an encoded image.
    async fn extract_text(&self, image: &[u8], mime_type: &str) -> Result<String, PerceptorError>;
}

/// Prompt-to-text capability backed by a generative model.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Provider name (e.g., "gemini", "openai_compat").
    fn name(&self) -> &str;

    /// Send a single-turn prompt and return the model's text.
    async fn complete(&self, request: &GenerationRequest) -> Result<GenerationResponse, PerceptorError>;
}

/// Request to a generative-text provider.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: 256,
            temperature: 0.2,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Response from a generative-text provider.
#[derive(Debug, Clone)]
pub struct GenerationResponse {
    pub content: String,
    pub provider: String,
    pub model: String,
    pub latency_ms: u64,
}
