//! perceptor runtime configuration schema.
//!
//! Every section is optional in the YAML file; missing sections and fields
//! take the values from `defaults`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use perceptor_core::{RetryPolicy, UpstreamCallPolicy};

use crate::defaults::*;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptorConfig {
    /// HTTP listener and upload handling
    pub server: ServerConfig,
    /// Document-to-text provider
    pub ocr: OcrConfig,
    /// Prompt-to-text provider (emotion tagging, summaries)
    pub generator: GeneratorConfig,
    /// Detector and depth models
    pub vision: VisionConfig,
    /// Streaming session pacing
    pub stream: StreamConfig,
    /// Timeout and retry policy for upstream APIs
    pub upstream: UpstreamConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Directory holding in-flight uploads; files never outlive a request.
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            cors_permissive: true,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

// ---------------------------------------------------------------------------
// OCR
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OcrProviderKind {
    /// Google Document AI `:process` endpoint
    #[default]
    DocumentAi,
    /// Gemini generateContent with the image inlined
    GeminiVision,
    /// Fixed text, for offline runs
    Static,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub provider: OcrProviderKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processor_id: Option<String>,
    /// Fixed OAuth bearer token for Document AI; overrides `credentials_file`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Service-account key file; application-default credentials when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<String>,
    /// API key for the Gemini vision provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_text: Option<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            provider: OcrProviderKind::default(),
            project_id: None,
            location: DEFAULT_DOCUMENT_AI_LOCATION.to_string(),
            processor_id: None,
            access_token: None,
            credentials_file: None,
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: None,
            static_text: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Generative text
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorProviderKind {
    #[default]
    Gemini,
    /// Any `/chat/completions` compatible endpoint
    OpenaiCompat,
    /// Fixed response, for offline runs
    Static,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub provider: GeneratorProviderKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_response: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: GeneratorProviderKind::default(),
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: None,
            static_response: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Vision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// YOLOv8 ONNX export
    pub detector_model: PathBuf,
    /// One class name per line; COCO-80 is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels_path: Option<PathBuf>,
    pub detector_input_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    /// MiDaS ONNX export
    pub depth_model: PathBuf,
    pub depth_input_size: u32,
    /// Multiplier turning a 0-255 depth value into the reported depth
    pub depth_scale: f32,
    /// Concurrent inference jobs across all sessions
    pub inference_workers: usize,
    pub inference_timeout_ms: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            detector_model: PathBuf::from(DEFAULT_DETECTOR_MODEL),
            labels_path: None,
            detector_input_size: DEFAULT_DETECTOR_INPUT_SIZE,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            depth_model: PathBuf::from(DEFAULT_DEPTH_MODEL),
            depth_input_size: DEFAULT_DEPTH_INPUT_SIZE,
            depth_scale: DEFAULT_DEPTH_SCALE,
            inference_workers: DEFAULT_INFERENCE_WORKERS,
            inference_timeout_ms: DEFAULT_INFERENCE_TIMEOUT_MS,
        }
    }
}

impl VisionConfig {
    pub fn inference_timeout(&self) -> Duration {
        Duration::from_millis(self.inference_timeout_ms)
    }
}

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Fixed pause after every processed frame
    pub frame_interval_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
        }
    }
}

impl StreamConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

// ---------------------------------------------------------------------------
// Upstream calls
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub timeout_ms: u64,
    pub retry: RetryPolicy,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_UPSTREAM_TIMEOUT_MS,
            retry: RetryPolicy::default(),
        }
    }
}

impl UpstreamConfig {
    pub fn call_policy(&self) -> UpstreamCallPolicy {
        UpstreamCallPolicy {
            timeout: Duration::from_millis(self.timeout_ms),
            retry: self.retry.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Rolling NDJSON log directory; console only when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            dir: None,
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = r#"
server:
  port: 9001
vision:
  depth_scale: 0.1
"#;
        let config: PerceptorConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.server.bind, DEFAULT_BIND);
        assert_eq!(config.vision.depth_scale, 0.1);
        assert_eq!(config.vision.detector_input_size, DEFAULT_DETECTOR_INPUT_SIZE);
        assert_eq!(config.stream.frame_interval_ms, 50);
        assert_eq!(config.ocr.provider, OcrProviderKind::DocumentAi);
    }

    #[test]
    fn provider_kinds_are_snake_case() {
        let yaml = "ocr:\n  provider: gemini_vision\ngenerator:\n  provider: openai_compat\n";
        let config: PerceptorConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.ocr.provider, OcrProviderKind::GeminiVision);
        assert_eq!(config.generator.provider, GeneratorProviderKind::OpenaiCompat);
    }

    #[test]
    fn upstream_policy_conversion() {
        let upstream = UpstreamConfig::default();
        let policy = upstream.call_policy();
        assert_eq!(policy.timeout, Duration::from_secs(30));
        assert_eq!(policy.retry.max_attempts, 3);
    }
}
