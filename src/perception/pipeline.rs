/// Perception pipeline — runs the injected detector and, when requested,
/// the text recognizer on one screenshot and merges both into a registry.
use image::DynamicImage;

use crate::config::{OcrConfig, RegistryConfig};
use crate::errors::CvPomResult;
use crate::perception::registry::ElementRegistry;
use crate::perception::traits::{Detector, TextRecognizer};

pub struct Perception {
    detector: Box<dyn Detector>,
    recognizer: Option<Box<dyn TextRecognizer>>,
    registry_config: RegistryConfig,
    ocr_config: OcrConfig,
}

impl Perception {
    pub fn new(detector: Box<dyn Detector>, registry_config: RegistryConfig) -> Self {
        Self {
            detector,
            recognizer: None,
            registry_config,
            ocr_config: OcrConfig::default(),
        }
    }

    pub fn with_text_recognizer(
        mut self,
        recognizer: Box<dyn TextRecognizer>,
        ocr_config: OcrConfig,
    ) -> Self {
        self.recognizer = Some(recognizer);
        self.ocr_config = ocr_config;
        self
    }

    pub fn registry_config(&self) -> &RegistryConfig {
        &self.registry_config
    }

    pub fn ocr_config(&self) -> &OcrConfig {
        &self.ocr_config
    }

    pub fn has_text_recognizer(&self) -> bool {
        self.recognizer.is_some()
    }

    /// Detect elements and, if `with_text` and a recognizer is installed,
    /// read text and merge it in.
    pub fn build_registry(
        &mut self,
        image: &DynamicImage,
        with_text: bool,
    ) -> CvPomResult<ElementRegistry> {
        let detections = self.detector.detect(image)?;
        tracing::debug!(count = detections.len(), "detections");

        let text_regions = match (&mut self.recognizer, with_text) {
            (Some(recognizer), true) => {
                let regions = recognizer.recognize_text(image, &self.ocr_config.options)?;
                tracing::debug!(count = regions.len(), "text regions");
                regions
            }
            (None, true) => {
                tracing::debug!("text requested but no recognizer installed");
                Vec::new()
            }
            (_, false) => Vec::new(),
        };

        Ok(ElementRegistry::build(
            detections,
            text_regions,
            &self.registry_config,
        ))
    }
}
