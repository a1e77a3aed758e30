use image::RgbImage;
use perceptor_core::{Detection, PerceptorError};

/// Object detector over a decoded RGB frame.
pub trait ObjectDetector: Send + Sync {
    fn name(&self) -> &str;

    /// All candidates for `frame`, boxes in frame pixel coordinates.
    fn detect(&self, frame: &RgbImage) -> Result<Vec<Detection>, PerceptorError>;
}

/// The most confident detection. Ties keep detector order (first wins);
/// NaN and non-positive confidences never win.
pub fn select_best(detections: &[Detection]) -> Option<&Detection> {
    let mut best: Option<&Detection> = None;
    for detection in detections {
        let current = best.map(|b| b.confidence).unwrap_or(0.0);
        if detection.confidence > current {
            best = Some(detection);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use perceptor_core::BoundingBox;

    fn det(label: &str, confidence: f32) -> Detection {
        Detection::new(label, confidence, BoundingBox::new(0, 0, 10, 10))
    }

    #[test]
    fn picks_highest_confidence() {
        let detections = vec![det("cup", 0.2), det("person", 0.9), det("dog", 0.5)];
        assert_eq!(select_best(&detections).unwrap().class_label, "person");
    }

    #[test]
    fn first_wins_on_tie() {
        let detections = vec![det("a", 0.7), det("b", 0.7)];
        assert_eq!(select_best(&detections).unwrap().class_label, "a");
    }

    #[test]
    fn ignores_nan_and_non_positive() {
        assert!(select_best(&[]).is_none());
        assert!(select_best(&[det("zero", 0.0), det("neg", -1.0), det("nan", f32::NAN)]).is_none());
        let detections = vec![det("nan", f32::NAN), det("ok", 0.1)];
        assert_eq!(select_best(&detections).unwrap().class_label, "ok");
    }
}
