//! MiDaS-small relative depth on tract.

use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use image::{RgbImage, imageops::FilterType};
use perceptor_core::PerceptorError;
use tract_onnx::prelude::{tract_ndarray::Array4, *};
use tracing::{debug, info};

use crate::depth::{DepthEstimator, DepthMap};
use crate::model::{Plan, load_square_model};

const MEAN: f32 = 0.5;
const STD: f32 = 0.5;

pub struct TractMidasEstimator {
    model: Plan,
    input_size: u32,
}

impl TractMidasEstimator {
    pub fn load(model_path: &Path, input_size: u32) -> anyhow::Result<Self> {
        let start = Instant::now();
        let model = load_square_model(model_path, input_size)?;
        info!(
            model = %model_path.display(),
            input_size,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded depth model"
        );
        Ok(Self { model, input_size })
    }

    fn build_input(&self, frame: &RgbImage) -> Tensor {
        let size = self.input_size;
        let resized = image::imageops::resize(frame, size, size, FilterType::Triangle);
        let side = size as usize;
        let raw = resized.as_raw();
        Array4::from_shape_fn((1, 3, side, side), |(_, channel, y, x)| {
            (raw[(y * side + x) * 3 + channel] as f32 / 255.0 - MEAN) / STD
        })
        .into_tensor()
    }
}

impl DepthEstimator for TractMidasEstimator {
    fn name(&self) -> &str {
        "midas_small"
    }

    fn estimate(&self, frame: &RgbImage) -> Result<DepthMap, PerceptorError> {
        let input = self.build_input(frame);
        let outputs = self
            .model
            .run(tvec!(input.into_tvalue()))
            .context("depth inference failed")
            .map_err(|e| PerceptorError::ModelInference(format!("{e:#}")))?;
        let output = outputs
            .first()
            .ok_or_else(|| PerceptorError::ModelInference("depth model produced no outputs".into()))?
            .to_array_view::<f32>()
            .map_err(|e| PerceptorError::ModelInference(format!("depth output was not f32: {e}")))?;

        let (height, width) = depth_dims(output.shape())?;
        let values: Vec<f32> = output.iter().copied().collect();
        debug!(width, height, "Depth pass complete");
        DepthMap::new(width as u32, height as u32, values)
    }
}

/// Spatial size of a depth output shaped `[1, H, W]`, `[1, 1, H, W]` or `[H, W]`.
fn depth_dims(shape: &[usize]) -> Result<(usize, usize), PerceptorError> {
    match shape {
        [h, w] | [1, h, w] | [1, 1, h, w] => Ok((*h, *w)),
        other => Err(PerceptorError::ModelInference(format!(
            "unexpected depth output shape {other:?}"
        ))),
    }
}
