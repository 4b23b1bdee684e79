use std::time::Duration;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::errors::CvPomResult;
use crate::perception::types::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

/// Parameters of a click forwarded to the driver as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickSpec {
    /// Number of consecutive clicks; 2 is a double click.
    pub times: u32,
    /// Pause between consecutive clicks.
    pub interval: Duration,
    pub button: MouseButton,
}

impl Default for ClickSpec {
    fn default() -> Self {
        Self {
            times: 1,
            interval: Duration::ZERO,
            button: MouseButton::Left,
        }
    }
}

/// Platform binding supplying screenshots and raw input primitives.
///
/// All points are already in the driver's native coordinate space.
/// Failures should be reported as `CvPomError::DriverOperationFailed`;
/// the core never retries them.
pub trait Driver {
    fn capture_screenshot(&mut self) -> CvPomResult<DynamicImage>;

    fn click_at(&mut self, at: Point, click: &ClickSpec) -> CvPomResult<()>;

    fn send_keys(&mut self, text: &str) -> CvPomResult<()>;

    fn swipe(&mut self, from: Point, to: Point, duration: Duration) -> CvPomResult<()>;

    fn hover_at(&mut self, at: Point) -> CvPomResult<()>;

    fn drag_drop(&mut self, from: Point, to: Point, duration: Duration) -> CvPomResult<()>;
}

impl<D: Driver + ?Sized> Driver for Box<D> {
    fn capture_screenshot(&mut self) -> CvPomResult<DynamicImage> {
        (**self).capture_screenshot()
    }

    fn click_at(&mut self, at: Point, click: &ClickSpec) -> CvPomResult<()> {
        (**self).click_at(at, click)
    }

    fn send_keys(&mut self, text: &str) -> CvPomResult<()> {
        (**self).send_keys(text)
    }

    fn swipe(&mut self, from: Point, to: Point, duration: Duration) -> CvPomResult<()> {
        (**self).swipe(from, to, duration)
    }

    fn hover_at(&mut self, at: Point) -> CvPomResult<()> {
        (**self).hover_at(at)
    }

    fn drag_drop(&mut self, from: Point, to: Point, duration: Duration) -> CvPomResult<()> {
        (**self).drag_drop(from, to, duration)
    }
}
