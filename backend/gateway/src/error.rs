use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use perceptor_core::PerceptorError;
use tracing::{error, warn};

/// Error returned by HTTP handlers, rendered as a status plus plain-text detail.
#[derive(Debug)]
pub enum ApiError {
    Pipeline(PerceptorError),
    Multipart(MultipartError),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// HTTP status for a pipeline error.
pub fn status_for(err: &PerceptorError) -> StatusCode {
    match err {
        PerceptorError::Decode(_) | PerceptorError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        PerceptorError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        PerceptorError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        PerceptorError::ModelInference(_) | PerceptorError::Config(_) | PerceptorError::Other(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Pipeline(err) => {
                let status = status_for(&err);
                if status.is_server_error() {
                    error!(kind = err.kind().as_str(), error = %err, "Request failed");
                } else {
                    warn!(kind = err.kind().as_str(), error = %err, "Request rejected");
                }
                (status, err.to_string()).into_response()
            }
            ApiError::Multipart(err) => {
                warn!(error = %err, "Malformed multipart upload");
                (err.status(), err.body_text()).into_response()
            }
        }
    }
}

impl From<PerceptorError> for ApiError {
    fn from(err: PerceptorError) -> Self {
        Self::Pipeline(err)
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::Multipart(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_error_kinds_to_status() {
        assert_eq!(status_for(&PerceptorError::Decode("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&PerceptorError::InvalidInput("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(&PerceptorError::upstream_status("document_ai", 403, "denied")),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&PerceptorError::UpstreamTimeout {
                service: "gemini".into(),
                timeout_ms: 10
            }),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_for(&PerceptorError::ModelInference("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&PerceptorError::Other(anyhow::anyhow!("boom"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn response_carries_plain_text_detail() {
        let response = ApiError::from(PerceptorError::InvalidInput("no file".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
