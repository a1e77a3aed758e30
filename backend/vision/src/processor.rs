//! One frame in, one [`FrameResult`] out.
//!
//! Detection and depth run concurrently on the blocking pool. A semaphore
//! bounds how many frames are in inference at once across all sessions, and
//! each frame is given a deadline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use image::RgbImage;
use perceptor_core::{DetectedObject, Detection, FrameResult, PerceptorError};
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tracing::{debug, warn};

use crate::depth::{DepthEstimator, DepthMap};
use crate::detector::{ObjectDetector, select_best};
use crate::frame::{decode_frame, decode_image_bytes};

pub struct FrameProcessor {
    detector: Arc<dyn ObjectDetector>,
    depth: Arc<dyn DepthEstimator>,
    permits: Arc<Semaphore>,
    timeout: Duration,
    depth_scale: f32,
}

impl FrameProcessor {
    pub fn new(
        detector: Arc<dyn ObjectDetector>,
        depth: Arc<dyn DepthEstimator>,
        workers: usize,
        timeout: Duration,
        depth_scale: f32,
    ) -> Self {
        Self {
            detector,
            depth,
            permits: Arc::new(Semaphore::new(workers.max(1))),
            timeout,
            depth_scale,
        }
    }

    /// Process a base64 (or data-URL) frame.
    pub async fn process_payload(&self, payload: &str) -> Result<FrameResult, PerceptorError> {
        let frame = decode_frame(payload)?;
        self.process_frame(frame).await
    }

    /// Process raw encoded image bytes.
    pub async fn process_bytes(&self, bytes: &[u8]) -> Result<FrameResult, PerceptorError> {
        let frame = decode_image_bytes(bytes)?;
        self.process_frame(frame).await
    }

    pub async fn process_frame(&self, frame: RgbImage) -> Result<FrameResult, PerceptorError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PerceptorError::ModelInference("inference pool is closed".to_string()))?;
        // Shared by both jobs; the slot frees when the last one finishes.
        let permit = Arc::new(permit);

        let start = Instant::now();
        let (width, height) = frame.dimensions();
        let frame = Arc::new(frame);

        let detect_job = {
            let detector = self.detector.clone();
            let frame = frame.clone();
            let permit = permit.clone();
            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                detector.detect(&frame)
            })
        };
        let depth_job = {
            let estimator = self.depth.clone();
            let frame = frame.clone();
            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                estimator.estimate(&frame)
            })
        };

        let (detections, depth) =
            match tokio::time::timeout(self.timeout, async { tokio::join!(detect_job, depth_job) }).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(timeout_ms = self.timeout.as_millis() as u64, "Frame inference timed out");
                    return Err(PerceptorError::ModelInference(format!(
                        "inference exceeded {}ms",
                        self.timeout.as_millis()
                    )));
                }
            };
        let detections = detections.map_err(join_failed)??;
        let depth = depth.map_err(join_failed)??;

        let result = compose(&detections, &depth, width, height, self.depth_scale)?;
        debug!(
            candidates = detections.len(),
            detected = !result.is_empty(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Frame processed"
        );
        Ok(result)
    }
}

fn join_failed(err: JoinError) -> PerceptorError {
    PerceptorError::ModelInference(format!("inference task failed: {err}"))
}

/// Pick the best detection and read the normalized depth at its box center.
///
/// Detections whose box does not fit the frame are ignored. The depth map is
/// resized to the frame, min-max normalized to 0..=255, and the level at the
/// center is multiplied by `depth_scale`.
pub fn compose(
    detections: &[Detection],
    depth: &DepthMap,
    width: u32,
    height: u32,
    depth_scale: f32,
) -> Result<FrameResult, PerceptorError> {
    let valid: Vec<Detection> = detections
        .iter()
        .filter(|d| {
            let fits = d.bbox.fits_within(width, height);
            if !fits {
                warn!(class = %d.class_label, bbox = ?d.bbox, "Discarding detection outside frame");
            }
            fits
        })
        .cloned()
        .collect();

    let Some(best) = select_best(&valid) else {
        return Ok(FrameResult::empty());
    };

    let levels = depth.resize_bilinear(width, height).normalize();
    let (cx, cy) = best.bbox.center();
    let level = levels.at(cx, cy).ok_or_else(|| {
        PerceptorError::ModelInference(format!("box center ({cx}, {cy}) outside depth map"))
    })?;

    Ok(FrameResult::detected(DetectedObject {
        class_label: best.class_label.clone(),
        confidence: best.confidence,
        depth: level as f32 * depth_scale,
        bbox: best.bbox.as_array(),
    }))
}
