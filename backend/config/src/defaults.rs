//! Config defaults and environment fallbacks for credentials.

use std::collections::HashMap;

use crate::schema::PerceptorConfig;

pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
/// 10 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub const DEFAULT_DOCUMENT_AI_LOCATION: &str = "us";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

pub const DEFAULT_DETECTOR_MODEL: &str = "models/yolov8s.onnx";
pub const DEFAULT_DETECTOR_INPUT_SIZE: u32 = 640;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;
pub const DEFAULT_DEPTH_MODEL: &str = "models/midas_small.onnx";
pub const DEFAULT_DEPTH_INPUT_SIZE: u32 = 384;
pub const DEFAULT_DEPTH_SCALE: f32 = 0.05;
pub const DEFAULT_INFERENCE_WORKERS: usize = 2;
pub const DEFAULT_INFERENCE_TIMEOUT_MS: u64 = 5_000;

/// ~20 frames per second
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 50;
pub const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_GOOGLE_ACCESS_TOKEN: &str = "GOOGLE_ACCESS_TOKEN";
pub const ENV_GOOGLE_APPLICATION_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const ENV_DOCUMENTAI_PROJECT_ID: &str = "DOCUMENTAI_PROJECT_ID";
pub const ENV_DOCUMENTAI_LOCATION: &str = "DOCUMENTAI_LOCATION";
pub const ENV_DOCUMENTAI_PROCESSOR_ID: &str = "DOCUMENTAI_PROCESSOR_ID";
pub const ENV_BIND: &str = "PERCEPTOR_BIND";
pub const ENV_PORT: &str = "PERCEPTOR_PORT";

/// Apply defaults using a provided env map (useful for testing).
pub fn apply_all_defaults_with(
    config: PerceptorConfig,
    env: &HashMap<String, String>,
) -> PerceptorConfig {
    let config = apply_server_overrides(config, env);
    let config = apply_credential_fallbacks(config, env);
    apply_model_defaults(config)
}

fn env_value<'a>(env: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    env.get(key).map(String::as_str).filter(|v| !v.trim().is_empty())
}

/// `PERCEPTOR_BIND` / `PERCEPTOR_PORT` win over the file.
fn apply_server_overrides(
    mut config: PerceptorConfig,
    env: &HashMap<String, String>,
) -> PerceptorConfig {
    if let Some(bind) = env_value(env, ENV_BIND) {
        config.server.bind = bind.to_string();
    }
    if let Some(port) = env_value(env, ENV_PORT).and_then(|p| p.parse().ok()) {
        config.server.port = port;
    }
    config
}

/// Unset credentials fall back to the conventional env vars.
fn apply_credential_fallbacks(
    mut config: PerceptorConfig,
    env: &HashMap<String, String>,
) -> PerceptorConfig {
    let fill = |slot: &mut Option<String>, key: &str| {
        if slot.as_deref().map_or(true, |v| v.trim().is_empty()) {
            *slot = env_value(env, key).map(str::to_string);
        }
    };

    fill(&mut config.generator.api_key, ENV_GEMINI_API_KEY);
    fill(&mut config.ocr.api_key, ENV_GEMINI_API_KEY);
    fill(&mut config.ocr.access_token, ENV_GOOGLE_ACCESS_TOKEN);
    fill(&mut config.ocr.credentials_file, ENV_GOOGLE_APPLICATION_CREDENTIALS);
    fill(&mut config.ocr.project_id, ENV_DOCUMENTAI_PROJECT_ID);
    fill(&mut config.ocr.processor_id, ENV_DOCUMENTAI_PROCESSOR_ID);

    if let Some(location) = env_value(env, ENV_DOCUMENTAI_LOCATION) {
        if config.ocr.location == DEFAULT_DOCUMENT_AI_LOCATION || config.ocr.location.is_empty() {
            config.ocr.location = location.to_string();
        }
    }
    config
}

/// Blank model names revert to the default model.
fn apply_model_defaults(mut config: PerceptorConfig) -> PerceptorConfig {
    if config.generator.model.trim().is_empty() {
        config.generator.model = DEFAULT_GEMINI_MODEL.to_string();
    }
    if config.ocr.model.trim().is_empty() {
        config.ocr.model = DEFAULT_GEMINI_MODEL.to_string();
    }
    if config.ocr.location.trim().is_empty() {
        config.ocr.location = DEFAULT_DOCUMENT_AI_LOCATION.to_string();
    }
    if config.logging.level.trim().is_empty() {
        config.logging.level = DEFAULT_LOG_LEVEL.to_string();
    }
    config
}
