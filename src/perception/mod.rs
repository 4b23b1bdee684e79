pub mod annotator;
pub mod pipeline;
pub mod registry;
pub mod traits;
pub mod types;
#[cfg(feature = "yolo")]
pub mod yolo_detector;

pub use pipeline::Perception;
pub use registry::ElementRegistry;
pub use traits::{Detector, OcrOptions, TextRecognizer};
pub use types::{BBox, Detection, Element, Point, TextRegion};
