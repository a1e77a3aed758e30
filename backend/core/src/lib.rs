pub mod error;
pub mod retry;
pub mod traits;
pub mod types;

pub use error::{ErrorKind, PerceptorError};
pub use retry::{call_with_retry, RetryPolicy, UpstreamCallPolicy};
pub use traits::{GenerationRequest, GenerationResponse, OcrProvider, TextGenerator};
pub use types::{
    BoundingBox, DetectedObject, Detection, FrameResult, SentenceEmotion, TextAnalysis,
    TextSummary,
};

/// Crate-wide result alias.
pub type Result<T, E = PerceptorError> = std::result::Result<T, E>;
