//! Vision side of perceptor: turn one encoded frame into at most one
//! detected object with an estimated depth.

pub mod depth;
pub mod detector;
pub mod frame;
pub mod midas;
pub mod mock;
mod model;
pub mod processor;
pub mod yolo;

pub use depth::{DepthEstimator, DepthMap, NormalizedDepth};
pub use detector::{ObjectDetector, select_best};
pub use frame::{decode_frame, decode_image_bytes};
pub use midas::TractMidasEstimator;
pub use mock::{StaticDepth, StaticDetector};
pub use processor::{FrameProcessor, compose};
pub use yolo::{COCO_LABELS, TractYoloDetector, decode_yolov8, load_labels};
