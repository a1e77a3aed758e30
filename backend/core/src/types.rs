use serde::{Deserialize, Serialize};

/// Axis-aligned box in integer pixel coordinates of the source frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    /// Box center using floor division, as `((x1 + x2) // 2, (y1 + y2) // 2)`.
    pub fn center(&self) -> (i32, i32) {
        (
            (self.x1 + self.x2).div_euclid(2),
            (self.y1 + self.y2).div_euclid(2),
        )
    }

    /// True when `0 <= x1 < x2 <= width` and `0 <= y1 < y2 <= height`.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x1 >= 0
            && self.y1 >= 0
            && self.x1 < self.x2
            && self.y1 < self.y2
            && self.x2 as i64 <= width as i64
            && self.y2 as i64 <= height as i64
    }

    pub fn as_array(&self) -> [i32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

/// A single candidate returned by an object detector for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_label: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(class_label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            class_label: class_label.into(),
            confidence,
            bbox,
        }
    }
}

/// The selected detection plus its estimated depth, in wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    #[serde(rename = "class")]
    pub class_label: String,
    pub confidence: f32,
    pub depth: f32,
    #[serde(rename = "box")]
    pub bbox: [i32; 4],
}

/// Per-frame answer. Serializes to `{}` when nothing was detected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameResult {
    #[serde(flatten)]
    pub object: Option<DetectedObject>,
}

impl FrameResult {
    pub fn empty() -> Self {
        Self { object: None }
    }

    pub fn detected(object: DetectedObject) -> Self {
        Self {
            object: Some(object),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.object.is_none()
    }
}

/// One sentence with the emotion assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceEmotion {
    pub sentence: String,
    pub emotion: String,
}

/// Response body of the image-upload text/emotion pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextAnalysis {
    pub full_text: String,
    pub sentences: Vec<SentenceEmotion>,
}

/// Response body of the summarization endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSummary {
    pub full_text: String,
    pub summary: String,
    pub mood: String,
}
