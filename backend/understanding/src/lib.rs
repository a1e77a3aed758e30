pub mod auth;
pub mod clean;
pub mod emotion;
pub mod gemini;
mod http;
pub mod mime;
pub mod mock;
pub mod ocr;
pub mod openai_compat;
pub mod pipeline;
pub mod sentences;
pub mod summary;

pub use auth::{AccessTokenSource, CLOUD_PLATFORM_SCOPE, GoogleCredentials, StaticToken};
pub use clean::{clean_analysis, clean_text, strip_code_fences};
pub use emotion::{EmotionAnalyzer, EmotionFold, emotion_prompt, parse_emotion};
pub use gemini::GeminiGenerator;
pub use mime::{is_supported_document, mime_for_filename, resolve_upload_mime};
pub use mock::{ScriptedGenerator, StaticOcr};
pub use ocr::{DocumentAiOcr, GeminiVisionOcr, NO_TEXT_FOUND};
pub use openai_compat::OpenAiCompatGenerator;
pub use pipeline::{TextPipeline, UploadedImage};
pub use sentences::split_sentences;
pub use summary::Summarizer;
