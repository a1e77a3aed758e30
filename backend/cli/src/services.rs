//! Build providers, models and gateway state from the loaded config.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use perceptor_config::{
    GeneratorConfig, GeneratorProviderKind, OcrConfig, OcrProviderKind, PerceptorConfig,
    VisionConfig,
};
use perceptor_core::{OcrProvider, TextGenerator};
use perceptor_gateway::GatewayState;
use perceptor_understanding::{
    AccessTokenSource, DocumentAiOcr, GeminiGenerator, GeminiVisionOcr, GoogleCredentials,
    OpenAiCompatGenerator, ScriptedGenerator, StaticOcr, StaticToken, TextPipeline,
};
use perceptor_vision::{
    load_labels, FrameProcessor, TractMidasEstimator, TractYoloDetector, COCO_LABELS,
};

pub async fn build_state(config: &PerceptorConfig) -> Result<GatewayState> {
    let ocr = build_ocr(&config.ocr).await?;
    let generator = build_generator(&config.generator)?;
    info!(ocr = ocr.name(), generator = generator.name(), "Providers ready");

    let pipeline = TextPipeline::new(
        ocr,
        generator,
        config.upstream.call_policy(),
        config.server.upload_dir.clone(),
    );
    let frames = build_frame_processor(&config.vision)?;

    Ok(GatewayState::new(
        Arc::new(pipeline),
        Arc::new(frames),
        config.stream.frame_interval(),
    ))
}

fn required<'a>(value: &'a Option<String>, what: &str) -> Result<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .with_context(|| format!("{what} is not set"))
}

/// A fixed `access_token` wins, then `credentials_file`, then
/// application-default credentials.
pub async fn build_token_source(config: &OcrConfig) -> Result<Arc<dyn AccessTokenSource>> {
    if let Ok(token) = required(&config.access_token, "ocr.access_token") {
        return Ok(Arc::new(StaticToken::new(token)));
    }
    let credentials = match required(&config.credentials_file, "ocr.credentials_file") {
        Ok(path) => GoogleCredentials::from_file(path)?,
        Err(_) => GoogleCredentials::discover().await?,
    };
    Ok(Arc::new(credentials))
}

pub async fn build_ocr(config: &OcrConfig) -> Result<Arc<dyn OcrProvider>> {
    let provider: Arc<dyn OcrProvider> = match config.provider {
        OcrProviderKind::DocumentAi => {
            let project_id = required(&config.project_id, "ocr.project_id")?;
            let processor_id = required(&config.processor_id, "ocr.processor_id")?;
            let tokens = build_token_source(config).await?;
            info!(auth = tokens.name(), "Document AI credentials ready");
            let mut ocr = DocumentAiOcr::new(
                project_id,
                config.location.clone(),
                processor_id,
                tokens,
            );
            if let Some(url) = &config.base_url {
                ocr = ocr.with_base_url(url);
            }
            Arc::new(ocr)
        }
        OcrProviderKind::GeminiVision => {
            let mut ocr = GeminiVisionOcr::new(
                required(&config.api_key, "ocr.api_key")?,
                config.model.clone(),
            );
            if let Some(url) = &config.base_url {
                ocr = ocr.with_base_url(url);
            }
            Arc::new(ocr)
        }
        OcrProviderKind::Static => Arc::new(StaticOcr::new(
            config.static_text.clone().unwrap_or_default(),
        )),
    };
    Ok(provider)
}

pub fn build_generator(config: &GeneratorConfig) -> Result<Arc<dyn TextGenerator>> {
    let generator: Arc<dyn TextGenerator> = match config.provider {
        GeneratorProviderKind::Gemini => {
            let mut generator = GeminiGenerator::new(
                required(&config.api_key, "generator.api_key")?,
                config.model.clone(),
            );
            if let Some(url) = &config.base_url {
                generator = generator.with_base_url(url);
            }
            Arc::new(generator)
        }
        GeneratorProviderKind::OpenaiCompat => {
            let mut generator = OpenAiCompatGenerator::new(
                config.api_key.clone().unwrap_or_default(),
                config.model.clone(),
            );
            if let Some(url) = &config.base_url {
                generator = generator.with_base_url(url);
            }
            Arc::new(generator)
        }
        GeneratorProviderKind::Static => Arc::new(ScriptedGenerator::new(
            config
                .static_response
                .clone()
                .unwrap_or_else(|| "Neutral".to_string()),
        )),
    };
    Ok(generator)
}

pub fn build_frame_processor(config: &VisionConfig) -> Result<FrameProcessor> {
    let labels = match &config.labels_path {
        Some(path) => load_labels(path)?,
        None => COCO_LABELS.iter().map(|l| l.to_string()).collect(),
    };

    let detector = TractYoloDetector::load(
        &config.detector_model,
        labels,
        config.detector_input_size,
        config.confidence_threshold,
        config.iou_threshold,
    )
    .context("failed to load detector model")?;
    let depth = TractMidasEstimator::load(&config.depth_model, config.depth_input_size)
        .context("failed to load depth model")?;

    Ok(FrameProcessor::new(
        Arc::new(detector),
        Arc::new(depth),
        config.inference_workers,
        config.inference_timeout(),
        config.depth_scale,
    ))
}
