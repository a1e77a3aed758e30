//! Config validation: field checks with user-friendly messages.

use crate::schema::{GeneratorProviderKind, OcrProviderKind, PerceptorConfig};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// Errors are fatal at startup; warnings are only logged.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

pub fn validate(config: &PerceptorConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_server(config, &mut report);
    validate_ocr(config, &mut report);
    validate_generator(config, &mut report);
    validate_vision(config, &mut report);
    validate_upstream(config, &mut report);
    report
}

fn validate_server(config: &PerceptorConfig, report: &mut ValidationReport) {
    if config.server.port == 0 {
        report.error("server.port", "Port must be non-zero");
    }
    if config.server.bind.trim().is_empty() {
        report.error("server.bind", "Bind address cannot be empty");
    }
    if config.server.max_upload_bytes == 0 {
        report.error("server.max_upload_bytes", "Upload limit must be positive");
    }
}

fn missing(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn validate_ocr(config: &PerceptorConfig, report: &mut ValidationReport) {
    let ocr = &config.ocr;
    match ocr.provider {
        OcrProviderKind::DocumentAi => {
            if missing(&ocr.project_id) {
                report.warn("ocr.project_id", "Document AI project id is not set; OCR calls will fail");
            }
            if missing(&ocr.processor_id) {
                report.warn("ocr.processor_id", "Document AI processor id is not set; OCR calls will fail");
            }
            if missing(&ocr.access_token) {
                match ocr.credentials_file.as_deref().filter(|p| !p.trim().is_empty()) {
                    None => report.warn(
                        "ocr.credentials_file",
                        "No access token or credentials file; using application-default credentials",
                    ),
                    Some(path) if !std::path::Path::new(path).exists() => {
                        report.warn("ocr.credentials_file", format!("Credentials file not found: {path}"))
                    }
                    Some(_) => {}
                }
            }
        }
        OcrProviderKind::GeminiVision => {
            if missing(&ocr.api_key) {
                report.warn("ocr.api_key", "No Gemini API key configured; OCR calls will fail");
            }
        }
        OcrProviderKind::Static => {
            if missing(&ocr.static_text) {
                report.warn("ocr.static_text", "Static OCR provider has no text; uploads will yield no sentences");
            }
        }
    }
}

fn validate_generator(config: &PerceptorConfig, report: &mut ValidationReport) {
    let generator = &config.generator;
    match generator.provider {
        GeneratorProviderKind::Gemini => {
            if missing(&generator.api_key) {
                report.warn("generator.api_key", "No Gemini API key configured; emotion tagging will fail");
            }
        }
        GeneratorProviderKind::OpenaiCompat => {
            if missing(&generator.base_url) {
                report.error("generator.base_url", "openai_compat provider requires a base_url");
            }
        }
        GeneratorProviderKind::Static => {}
    }
}

fn validate_vision(config: &PerceptorConfig, report: &mut ValidationReport) {
    let vision = &config.vision;
    for (path, value) in [
        ("vision.confidence_threshold", vision.confidence_threshold),
        ("vision.iou_threshold", vision.iou_threshold),
    ] {
        if !(0.0..=1.0).contains(&value) {
            report.error(path, format!("Must be within [0, 1], got {value}"));
        }
    }
    if !(vision.depth_scale > 0.0) {
        report.error("vision.depth_scale", "Depth scale must be positive");
    }
    if vision.inference_workers == 0 {
        report.error("vision.inference_workers", "At least one inference worker is required");
    }
    if vision.detector_input_size == 0 {
        report.error("vision.detector_input_size", "Input size must be positive");
    }
    if vision.depth_input_size == 0 {
        report.error("vision.depth_input_size", "Input size must be positive");
    }
    if vision.inference_timeout_ms == 0 {
        report.error("vision.inference_timeout_ms", "Timeout must be positive");
    }
    if !vision.detector_model.exists() {
        report.warn(
            "vision.detector_model",
            format!("Model file not found: {}", vision.detector_model.display()),
        );
    }
    if !vision.depth_model.exists() {
        report.warn(
            "vision.depth_model",
            format!("Model file not found: {}", vision.depth_model.display()),
        );
    }
    if let Some(labels) = &vision.labels_path {
        if !labels.exists() {
            report.warn("vision.labels_path", format!("Labels file not found: {}", labels.display()));
        }
    }
}

fn validate_upstream(config: &PerceptorConfig, report: &mut ValidationReport) {
    let upstream = &config.upstream;
    if upstream.timeout_ms == 0 {
        report.error("upstream.timeout_ms", "Timeout must be positive");
    }
    if upstream.retry.max_attempts == 0 {
        report.error("upstream.retry.max_attempts", "At least one attempt is required");
    }
    if upstream.retry.backoff_factor < 1.0 {
        report.warn("upstream.retry.backoff_factor", "Backoff factor below 1.0 shrinks delays");
    }
}
