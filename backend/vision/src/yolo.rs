//! YOLOv8 detector on tract.
//!
//! The model takes a stretched `input_size`² RGB frame scaled to `[0, 1]` and
//! returns `[1, 4 + C, N]`: per candidate a center/size box in input pixels
//! followed by C class scores. Candidates are thresholded, assigned their
//! best class, reduced with per-class greedy NMS, and mapped back to frame
//! pixels.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use image::{RgbImage, imageops::FilterType};
use perceptor_core::{BoundingBox, Detection, PerceptorError};
use tract_onnx::prelude::{tract_ndarray::Array4, *};
use tracing::{debug, info};

use crate::detector::ObjectDetector;
use crate::model::{Plan, load_square_model};

pub const COCO_LABELS: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch", "potted plant",
    "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote", "keyboard", "cell phone",
    "microwave", "oven", "toaster", "sink", "refrigerator", "book", "clock", "vase", "scissors",
    "teddy bear", "hair drier", "toothbrush",
];

pub struct TractYoloDetector {
    model: Plan,
    labels: Vec<String>,
    input_size: u32,
    confidence_threshold: f32,
    iou_threshold: f32,
}

impl TractYoloDetector {
    pub fn load(
        model_path: &Path,
        labels: Vec<String>,
        input_size: u32,
        confidence_threshold: f32,
        iou_threshold: f32,
    ) -> anyhow::Result<Self> {
        let start = Instant::now();
        let model = load_square_model(model_path, input_size)?;
        info!(
            model = %model_path.display(),
            classes = labels.len(),
            input_size,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded detector model"
        );
        Ok(Self {
            model,
            labels,
            input_size,
            confidence_threshold,
            iou_threshold,
        })
    }

    fn build_input(&self, frame: &RgbImage) -> Tensor {
        let size = self.input_size;
        let resized = image::imageops::resize(frame, size, size, FilterType::Triangle);
        let side = size as usize;
        let raw = resized.as_raw();
        Array4::from_shape_fn((1, 3, side, side), |(_, channel, y, x)| {
            raw[(y * side + x) * 3 + channel] as f32 / 255.0
        })
        .into_tensor()
    }
}

impl ObjectDetector for TractYoloDetector {
    fn name(&self) -> &str {
        "yolov8"
    }

    fn detect(&self, frame: &RgbImage) -> Result<Vec<Detection>, PerceptorError> {
        let input = self.build_input(frame);
        let outputs = self
            .model
            .run(tvec!(input.into_tvalue()))
            .context("detector inference failed")
            .map_err(inference_error)?;
        let output = outputs
            .first()
            .ok_or_else(|| PerceptorError::ModelInference("detector produced no outputs".into()))?
            .to_array_view::<f32>()
            .context("detector output was not f32")
            .map_err(inference_error)?;

        let dims = output.shape().to_vec();
        let (rows, cols) = match dims.as_slice() {
            [1, rows, cols] => (*rows, *cols),
            [rows, cols] => (*rows, *cols),
            other => {
                return Err(PerceptorError::ModelInference(format!(
                    "unexpected detector output shape {other:?}"
                )));
            }
        };
        let data: Vec<f32> = output.iter().copied().collect();

        let detections = decode_yolov8(
            &data,
            rows,
            cols,
            frame.dimensions(),
            self.input_size,
            &self.labels,
            self.confidence_threshold,
            self.iou_threshold,
        )?;
        debug!(candidates = cols, kept = detections.len(), "Detector pass complete");
        Ok(detections)
    }
}

fn inference_error(err: anyhow::Error) -> PerceptorError {
    PerceptorError::ModelInference(format!("{err:#}"))
}

/// Decode a `[4 + C, N]` YOLOv8 head into frame-space detections.
///
/// A `[N, 4 + C]` layout is accepted too and detected by `rows > cols`.
#[allow(clippy::too_many_arguments)]
pub fn decode_yolov8(
    data: &[f32],
    rows: usize,
    cols: usize,
    frame_size: (u32, u32),
    input_size: u32,
    labels: &[String],
    confidence_threshold: f32,
    iou_threshold: f32,
) -> Result<Vec<Detection>, PerceptorError> {
    if data.len() != rows * cols {
        return Err(PerceptorError::ModelInference(format!(
            "detector output has {} values, expected {rows}x{cols}",
            data.len()
        )));
    }
    let transposed = rows > cols;
    let (features, candidates) = if transposed { (cols, rows) } else { (rows, cols) };
    if features < 5 {
        return Err(PerceptorError::ModelInference(format!(
            "detector output has {features} features per candidate, need at least 5"
        )));
    }
    let value = |feature: usize, candidate: usize| {
        if transposed {
            data[candidate * features + feature]
        } else {
            data[feature * candidates + candidate]
        }
    };

    let (frame_w, frame_h) = frame_size;
    let scale_x = frame_w as f32 / input_size as f32;
    let scale_y = frame_h as f32 / input_size as f32;

    let mut found = Vec::new();
    for i in 0..candidates {
        let (class_id, score) = (0..features - 4)
            .map(|c| (c, value(4 + c, i)))
            .fold((0usize, f32::NEG_INFINITY), |best, (c, s)| if s > best.1 { (c, s) } else { best });
        if score.is_nan() || score < confidence_threshold || score <= 0.0 {
            continue;
        }

        let (cx, cy, w, h) = (value(0, i), value(1, i), value(2, i), value(3, i));
        let x1 = ((cx - w / 2.0) * scale_x).clamp(0.0, frame_w as f32) as i32;
        let y1 = ((cy - h / 2.0) * scale_y).clamp(0.0, frame_h as f32) as i32;
        let x2 = ((cx + w / 2.0) * scale_x).clamp(0.0, frame_w as f32) as i32;
        let y2 = ((cy + h / 2.0) * scale_y).clamp(0.0, frame_h as f32) as i32;
        let bbox = BoundingBox::new(x1, y1, x2, y2);
        if !bbox.fits_within(frame_w, frame_h) {
            continue;
        }

        let label = labels
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{class_id}"));
        found.push(Detection::new(label, score, bbox));
    }

    Ok(apply_nms(found, iou_threshold))
}

/// Greedy per-class NMS. Output is sorted by confidence, descending.
fn apply_nms(mut detections: Vec<Detection>, threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut kept: Vec<Detection> = Vec::new();
    for det in detections {
        let suppressed = kept
            .iter()
            .any(|k| k.class_label == det.class_label && iou(&k.bbox, &det.bbox) > threshold);
        if !suppressed {
            kept.push(det);
        }
    }
    kept
}

fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let ix = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0) as f32;
    let iy = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0) as f32;
    let inter = ix * iy;
    if inter <= 0.0 {
        return 0.0;
    }
    let union = (a.width() * a.height() + b.width() * b.height()) as f32 - inter;
    if union <= 0.0 { 0.0 } else { inter / union }
}

/// Read one label per line, skipping blanks.
pub fn load_labels(path: &Path) -> anyhow::Result<Vec<String>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open labels file {}", path.display()))?;
    let mut labels = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.context("failed to read labels file")?;
        let line = line.trim();
        if !line.is_empty() {
            labels.push(line.to_string());
        }
    }
    Ok(labels)
}
