//! In-memory drivers and adapters used by unit tests.
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use image::DynamicImage;

use crate::driver::traits::{ClickSpec, Driver};
use crate::errors::{CvPomError, CvPomResult};
use crate::perception::traits::{Detector, OcrOptions, TextRecognizer};
use crate::perception::types::{BBox, Detection, Point, TextRegion};

#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    Click { at: Point, click: ClickSpec },
    Keys(String),
    Swipe { from: Point, to: Point, duration: Duration },
    Hover(Point),
    DragDrop { from: Point, to: Point, duration: Duration },
}

/// Records every primitive call and returns blank screenshots.
pub struct RecordingDriver {
    pub calls: Vec<DriverCall>,
    pub screenshots: usize,
    pub fail_input: bool,
    width: u32,
    height: u32,
}

impl RecordingDriver {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            calls: Vec::new(),
            screenshots: 0,
            fail_input: false,
            width,
            height,
        }
    }

    fn record(&mut self, call: DriverCall) -> CvPomResult<()> {
        if self.fail_input {
            return Err(CvPomError::DriverOperationFailed(format!(
                "scripted failure for {call:?}"
            )));
        }
        self.calls.push(call);
        Ok(())
    }
}

impl Driver for RecordingDriver {
    fn capture_screenshot(&mut self) -> CvPomResult<DynamicImage> {
        self.screenshots += 1;
        Ok(DynamicImage::new_rgb8(self.width, self.height))
    }

    fn click_at(&mut self, at: Point, click: &ClickSpec) -> CvPomResult<()> {
        self.record(DriverCall::Click { at, click: *click })
    }

    fn send_keys(&mut self, text: &str) -> CvPomResult<()> {
        self.record(DriverCall::Keys(text.to_string()))
    }

    fn swipe(&mut self, from: Point, to: Point, duration: Duration) -> CvPomResult<()> {
        self.record(DriverCall::Swipe { from, to, duration })
    }

    fn hover_at(&mut self, at: Point) -> CvPomResult<()> {
        self.record(DriverCall::Hover(at))
    }

    fn drag_drop(&mut self, from: Point, to: Point, duration: Duration) -> CvPomResult<()> {
        self.record(DriverCall::DragDrop { from, to, duration })
    }
}

/// Returns one scripted frame of detections per call; the last frame repeats.
pub struct ScriptedDetector {
    frames: Vec<Vec<Detection>>,
    calls: Rc<Cell<usize>>,
}

impl ScriptedDetector {
    pub fn new(frames: Vec<Vec<Detection>>) -> Self {
        Self {
            frames,
            calls: Rc::new(Cell::new(0)),
        }
    }

    /// Same detections on every call.
    pub fn fixed(detections: Vec<Detection>) -> Self {
        Self::new(vec![detections])
    }

    /// Shared counter of `detect` invocations.
    pub fn call_counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.calls)
    }
}

impl Detector for ScriptedDetector {
    fn detect(&mut self, _image: &DynamicImage) -> CvPomResult<Vec<Detection>> {
        let n = self.calls.get();
        self.calls.set(n + 1);
        let idx = n.min(self.frames.len().saturating_sub(1));
        Ok(self.frames.get(idx).cloned().unwrap_or_default())
    }
}

/// Returns the same text regions on every call and remembers the options it saw.
pub struct FixedText {
    regions: Vec<TextRegion>,
    calls: Rc<Cell<usize>>,
    pub last_options: Rc<std::cell::RefCell<Option<OcrOptions>>>,
}

impl FixedText {
    pub fn new(regions: Vec<TextRegion>) -> Self {
        Self {
            regions,
            calls: Rc::new(Cell::new(0)),
            last_options: Rc::new(std::cell::RefCell::new(None)),
        }
    }

    pub fn call_counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.calls)
    }
}

impl TextRecognizer for FixedText {
    fn recognize_text(
        &mut self,
        _image: &DynamicImage,
        options: &OcrOptions,
    ) -> CvPomResult<Vec<TextRegion>> {
        self.calls.set(self.calls.get() + 1);
        *self.last_options.borrow_mut() = Some(options.clone());
        Ok(self.regions.clone())
    }
}

pub fn detection(label: &str, b: [i32; 4]) -> Detection {
    Detection::new(label, 0.9, BBox::from(b))
}

pub fn text_region(text: &str, b: [i32; 4]) -> TextRegion {
    TextRegion::new(text, BBox::from(b))
}
