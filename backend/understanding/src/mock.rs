//! In-process providers for tests and offline runs.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use perceptor_core::{GenerationRequest, GenerationResponse, OcrProvider, PerceptorError, TextGenerator};

/// OCR provider that returns the same text for every image.
pub struct StaticOcr {
    text: String,
}

impl StaticOcr {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl OcrProvider for StaticOcr {
    fn name(&self) -> &str {
        "static"
    }

    async fn extract_text(&self, _image: &[u8], _mime_type: &str) -> Result<String, PerceptorError> {
        Ok(self.text.clone())
    }
}

/// Generator that replays queued responses, then repeats a default.
pub struct ScriptedGenerator {
    queue: Mutex<VecDeque<String>>,
    default: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            default: default.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_responses<I, S>(self, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Ok(mut queue) = self.queue.lock() {
            queue.extend(responses.into_iter().map(Into::into));
        }
        self
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "static"
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<GenerationResponse, PerceptorError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(request.prompt.clone());
        }
        let content = self
            .queue
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_else(|| self.default.clone());

        Ok(GenerationResponse {
            content,
            provider: "static".to_string(),
            model: "scripted".to_string(),
            latency_ms: 0,
        })
    }
}
