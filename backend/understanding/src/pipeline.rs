//! Upload → OCR → sentence emotions (or summary).
//!
//! Every upload is written to a `NamedTempFile` under the upload directory
//! for the duration of the request; the file is removed when the guard drops,
//! whichever way the request ends.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use perceptor_core::{
    OcrProvider, PerceptorError, TextAnalysis, TextGenerator, TextSummary, UpstreamCallPolicy,
    call_with_retry,
};
use tempfile::NamedTempFile;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::clean::clean_analysis;
use crate::emotion::EmotionAnalyzer;
use crate::mime::resolve_upload_mime;
use crate::ocr::NO_TEXT_FOUND;
use crate::summary::Summarizer;

/// A file received from a client.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: None,
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    fn mime_type(&self) -> String {
        resolve_upload_mime(self.content_type.as_deref(), self.filename.as_deref())
    }

    fn suffix(&self) -> String {
        self.filename
            .as_deref()
            .and_then(|f| std::path::Path::new(f).extension())
            .and_then(|e| e.to_str())
            .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|e| format!(".{e}"))
            .unwrap_or_default()
    }
}

pub struct TextPipeline {
    ocr: Arc<dyn OcrProvider>,
    analyzer: EmotionAnalyzer,
    summarizer: Summarizer,
    policy: UpstreamCallPolicy,
    upload_dir: PathBuf,
}

impl TextPipeline {
    pub fn new(
        ocr: Arc<dyn OcrProvider>,
        generator: Arc<dyn TextGenerator>,
        policy: UpstreamCallPolicy,
        upload_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            ocr,
            analyzer: EmotionAnalyzer::new(generator.clone(), policy.clone()),
            summarizer: Summarizer::new(generator, policy.clone()),
            policy,
            upload_dir: upload_dir.into(),
        }
    }

    /// OCR the upload and tag each sentence with an emotion.
    #[instrument(skip_all, fields(request_id = tracing::field::Empty, bytes = upload.bytes.len()))]
    pub async fn analyze_upload(&self, upload: UploadedImage) -> Result<TextAnalysis, PerceptorError> {
        let request_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("request_id", request_id.as_str());

        let text = self.extract_text(upload).await?;
        let analysis = self.analyzer.analyze(&request_id, &text).await?;
        info!(sentences = analysis.sentences.len(), "Emotion analysis complete");
        Ok(clean_analysis(analysis))
    }

    /// OCR the upload and summarize the text.
    #[instrument(skip_all, fields(bytes = upload.bytes.len()))]
    pub async fn summarize_upload(&self, upload: UploadedImage) -> Result<TextSummary, PerceptorError> {
        let text = self.extract_text(upload).await?;
        self.summarizer.summarize(&text).await
    }

    async fn extract_text(&self, upload: UploadedImage) -> Result<String, PerceptorError> {
        if upload.bytes.is_empty() {
            return Err(PerceptorError::InvalidInput("uploaded file is empty".to_string()));
        }
        let mime_type = upload.mime_type();
        let staged = self.stage(upload).await?;

        let bytes = tokio::fs::read(staged.path())
            .await
            .with_context(|| format!("reading staged upload {}", staged.path().display()))?;

        let text = call_with_retry(self.ocr.name(), &self.policy, || {
            self.ocr.extract_text(&bytes, &mime_type)
        })
        .await?;
        drop(staged);

        if text.trim().is_empty() {
            Ok(NO_TEXT_FOUND.to_string())
        } else {
            Ok(text)
        }
    }

    /// Persist the upload into the upload directory.
    async fn stage(&self, upload: UploadedImage) -> Result<NamedTempFile, PerceptorError> {
        let dir = self.upload_dir.clone();
        let suffix = upload.suffix();
        let staged = tokio::task::spawn_blocking(move || -> anyhow::Result<NamedTempFile> {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("creating upload dir {}", dir.display()))?;
            let mut file = tempfile::Builder::new()
                .prefix("upload-")
                .suffix(&suffix)
                .tempfile_in(&dir)
                .context("creating staged upload")?;
            file.write_all(&upload.bytes).context("writing staged upload")?;
            file.flush().context("flushing staged upload")?;
            Ok(file)
        })
        .await
        .context("staging task failed")??;
        Ok(staged)
    }
}
