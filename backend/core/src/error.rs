use serde::Serialize;
use thiserror::Error;

/// Top-level error type for the perceptor service.
#[derive(Debug, Error)]
pub enum PerceptorError {
    #[error("decode error: {0}")]
    Decode(String),

    #[error("upstream service error ({service}): {message}")]
    Upstream {
        service: String,
        message: String,
        status: Option<u16>,
    },

    #[error("upstream service ({service}) timed out after {timeout_ms}ms")]
    UpstreamTimeout { service: String, timeout_ms: u64 },

    #[error("model inference error: {0}")]
    ModelInference(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Stable, wire-safe name for each error variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DecodeError,
    UpstreamServiceError,
    UpstreamTimeout,
    ModelInferenceError,
    InvalidInput,
    ConfigError,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::DecodeError => "decode_error",
            ErrorKind::UpstreamServiceError => "upstream_service_error",
            ErrorKind::UpstreamTimeout => "upstream_timeout",
            ErrorKind::ModelInferenceError => "model_inference_error",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::ConfigError => "config_error",
            ErrorKind::Internal => "internal",
        }
    }
}

impl PerceptorError {
    pub fn upstream(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            service: service.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn upstream_status(
        service: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self::Upstream {
            service: service.into(),
            message: message.into(),
            status: Some(status),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PerceptorError::Decode(_) => ErrorKind::DecodeError,
            PerceptorError::Upstream { .. } => ErrorKind::UpstreamServiceError,
            PerceptorError::UpstreamTimeout { .. } => ErrorKind::UpstreamTimeout,
            PerceptorError::ModelInference(_) => ErrorKind::ModelInferenceError,
            PerceptorError::InvalidInput(_) => ErrorKind::InvalidInput,
            PerceptorError::Config(_) => ErrorKind::ConfigError,
            PerceptorError::Other(_) => ErrorKind::Internal,
        }
    }

    /// Whether retrying the same call could plausibly succeed.
    ///
    /// Timeouts, transport failures (no status), 429 and 5xx are transient.
    /// Auth and other 4xx responses are not.
    pub fn is_transient(&self) -> bool {
        match self {
            PerceptorError::UpstreamTimeout { .. } => true,
            PerceptorError::Upstream { status: None, .. } => true,
            PerceptorError::Upstream {
                status: Some(code), ..
            } => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}
