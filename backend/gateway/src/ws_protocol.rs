//! Wire shapes for the frame stream.
//!
//! Client → server: one encoded frame per message, either a text message
//! holding base64 (a `data:` URL prefix is tolerated) or a binary message
//! holding the raw image bytes.
//!
//! Server → client: one text message per frame, the JSON [`FrameResult`]
//! (`{}` when nothing was detected). On failure the server sends one
//! [`ErrorFrame`] and closes.
//!
//! [`FrameResult`]: perceptor_core::FrameResult

use perceptor_core::{ErrorKind, PerceptorError};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ErrorFrame {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&PerceptorError> for ErrorFrame {
    fn from(err: &PerceptorError) -> Self {
        Self {
            error: ErrorBody {
                kind: err.kind(),
                message: err.to_string(),
            },
        }
    }
}
