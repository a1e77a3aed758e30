//! Summary and overall mood of an extracted text.

use std::sync::Arc;

use perceptor_core::{
    GenerationRequest, PerceptorError, TextGenerator, TextSummary, UpstreamCallPolicy,
    call_with_retry,
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::clean::{clean_text, scrub_escapes, strip_code_fences};

#[derive(Debug, Deserialize)]
struct SummaryAnswer {
    summary: String,
    #[serde(default)]
    mood: String,
}

fn summary_prompt(text: &str) -> String {
    format!(
        r#"Summarize the following text in a **concise, fluent, and meaningful** manner.

### **Text to Summarize:**
{text}

### **Expected JSON Response Format:**
{{
  "summary": "A fluent, well-structured, and meaningful summary of the text.",
  "mood": "Detected mood"
}}"#
    )
}

fn parse_answer(raw: &str) -> Option<SummaryAnswer> {
    let candidate = strip_code_fences(raw);
    serde_json::from_str(&candidate)
        .or_else(|_| serde_json::from_str(&scrub_escapes(&candidate)))
        .ok()
}

pub struct Summarizer {
    generator: Arc<dyn TextGenerator>,
    policy: UpstreamCallPolicy,
}

impl Summarizer {
    pub fn new(generator: Arc<dyn TextGenerator>, policy: UpstreamCallPolicy) -> Self {
        Self { generator, policy }
    }

    pub async fn summarize(&self, text: &str) -> Result<TextSummary, PerceptorError> {
        let request = GenerationRequest::new(summary_prompt(text)).with_max_tokens(512);
        let response = call_with_retry(self.generator.name(), &self.policy, || {
            self.generator.complete(&request)
        })
        .await?;
        debug!(latency_ms = response.latency_ms, "Summary response received");

        let answer = parse_answer(&response.content).ok_or_else(|| {
            warn!(provider = %response.provider, "Summary answer is not valid JSON");
            PerceptorError::upstream_status(
                self.generator.name(),
                200,
                "summary answer is not the expected JSON object",
            )
        })?;

        Ok(TextSummary {
            full_text: clean_text(text),
            summary: clean_text(&answer.summary),
            mood: clean_text(&answer.mood),
        })
    }
}
