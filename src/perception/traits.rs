use image::DynamicImage;

use crate::errors::CvPomResult;
use crate::perception::types::{Detection, TextRegion};

/// Options handed verbatim to the text recognizer. Keys are engine-defined.
pub type OcrOptions = serde_json::Map<String, serde_json::Value>;

/// Object-detection model producing labelled boxes in image pixel space.
///
/// Implementations report their own failures as `CvPomError::Detection`;
/// the core passes them through untouched.
pub trait Detector {
    fn detect(&mut self, image: &DynamicImage) -> CvPomResult<Vec<Detection>>;
}

/// OCR engine producing text regions in image pixel space.
pub trait TextRecognizer {
    fn recognize_text(
        &mut self,
        image: &DynamicImage,
        options: &OcrOptions,
    ) -> CvPomResult<Vec<TextRegion>>;
}

impl<F> Detector for F
where
    F: FnMut(&DynamicImage) -> CvPomResult<Vec<Detection>>,
{
    fn detect(&mut self, image: &DynamicImage) -> CvPomResult<Vec<Detection>> {
        self(image)
    }
}

impl<F> TextRecognizer for F
where
    F: FnMut(&DynamicImage, &OcrOptions) -> CvPomResult<Vec<TextRegion>>,
{
    fn recognize_text(
        &mut self,
        image: &DynamicImage,
        options: &OcrOptions,
    ) -> CvPomResult<Vec<TextRegion>> {
        self(image, options)
    }
}
