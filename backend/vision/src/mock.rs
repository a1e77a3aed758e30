//! Fixed-output detector and depth estimator for tests and offline runs.

use image::RgbImage;
use perceptor_core::{Detection, PerceptorError};

use crate::depth::{DepthEstimator, DepthMap};
use crate::detector::ObjectDetector;

/// Returns the same detections for every frame.
pub struct StaticDetector {
    detections: Vec<Detection>,
}

impl StaticDetector {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }
}

impl ObjectDetector for StaticDetector {
    fn name(&self) -> &str {
        "static"
    }

    fn detect(&self, _frame: &RgbImage) -> Result<Vec<Detection>, PerceptorError> {
        Ok(self.detections.clone())
    }
}

/// Returns the same depth map for every frame.
pub struct StaticDepth {
    map: DepthMap,
}

impl StaticDepth {
    pub fn new(map: DepthMap) -> Self {
        Self { map }
    }

    /// Horizontal ramp increasing from left to right.
    pub fn ramp(width: u32, height: u32) -> Self {
        let width = width.max(2);
        let height = height.max(1);
        let values = (0..height)
            .flat_map(|_| (0..width).map(move |x| x as f32))
            .collect();
        Self {
            map: DepthMap::new(width, height, values)
                .unwrap_or_else(|_| DepthMap::filled(width, height, 0.0)),
        }
    }
}

impl DepthEstimator for StaticDepth {
    fn name(&self) -> &str {
        "static"
    }

    fn estimate(&self, _frame: &RgbImage) -> Result<DepthMap, PerceptorError> {
        Ok(self.map.clone())
    }
}
