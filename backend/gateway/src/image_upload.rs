//! `POST /process-image/` and `POST /summarize-image/`.
//!
//! Both take a multipart form with the image in a field named `file`.

use axum::{
    Json,
    extract::{Multipart, State},
};
use perceptor_core::{PerceptorError, TextAnalysis, TextSummary};
use perceptor_understanding::UploadedImage;
use tracing::{debug, instrument};

use crate::error::ApiResult;
use crate::server::GatewayState;

const FILE_FIELD: &str = "file";

#[instrument(skip_all)]
pub async fn process_image(
    State(state): State<GatewayState>,
    multipart: Multipart,
) -> ApiResult<Json<TextAnalysis>> {
    let upload = read_upload(multipart).await?;
    let analysis = state.pipeline.analyze_upload(upload).await?;
    Ok(Json(analysis))
}

#[instrument(skip_all)]
pub async fn summarize_image(
    State(state): State<GatewayState>,
    multipart: Multipart,
) -> ApiResult<Json<TextSummary>> {
    let upload = read_upload(multipart).await?;
    let summary = state.pipeline.summarize_upload(upload).await?;
    Ok(Json(summary))
}

/// Pull the `file` field out of the form; other fields are skipped.
async fn read_upload(mut multipart: Multipart) -> ApiResult<UploadedImage> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        debug!(?filename, ?content_type, bytes = bytes.len(), "Received upload");

        let mut upload = UploadedImage::new(bytes.to_vec());
        upload.filename = filename;
        upload.content_type = content_type;
        return Ok(upload);
    }
    Err(PerceptorError::InvalidInput(format!("missing multipart field `{FILE_FIELD}`")).into())
}
