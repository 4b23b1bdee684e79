/// Native desktop driver: primary monitor screenshots via xcap, mouse and
/// keyboard via enigo.
///
/// Swipes scroll the wheel under the pointer; only `drag_drop` holds a button.
use std::thread;
use std::time::Duration;

use enigo::{Axis, Button, Coordinate, Direction, Enigo, Keyboard, Mouse, Settings};
use image::DynamicImage;
use xcap::Monitor;

use crate::driver::traits::{ClickSpec, Driver, MouseButton};
use crate::errors::{CvPomError, CvPomResult};
use crate::perception::types::Point;

/// Intermediate pointer moves per drag gesture.
const GESTURE_STEPS: u32 = 20;

/// Pointer travel, in pixels, mapped to one wheel notch.
const SCROLL_NOTCH_PX: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScrollAxis {
    Vertical,
    Horizontal,
}

/// Wheel scroll equivalent to moving the pointer from `from` to `to`.
///
/// The dominant component picks the axis. Positive notches scroll down or
/// right, matching a pointer that moves down or right. `None` for a zero vector.
fn scroll_for(from: Point, to: Point) -> Option<(ScrollAxis, i32)> {
    let dx = to.x.saturating_sub(from.x);
    let dy = to.y.saturating_sub(from.y);
    let (axis, delta) = if dy.unsigned_abs() >= dx.unsigned_abs() {
        (ScrollAxis::Vertical, dy)
    } else {
        (ScrollAxis::Horizontal, dx)
    };
    if delta == 0 {
        return None;
    }
    let notches = (delta.unsigned_abs() as i32 / SCROLL_NOTCH_PX).max(1);
    Some((axis, notches * delta.signum()))
}

/// Evenly spaced pointer positions from `from` (exclusive) to `to` (inclusive).
fn gesture_path(from: Point, to: Point, steps: u32) -> Vec<Point> {
    let steps = steps.max(1);
    (1..=steps)
        .map(|i| {
            let t = i as f64 / steps as f64;
            Point::new(
                from.x + ((to.x as f64 - from.x as f64) * t).round() as i32,
                from.y + ((to.y as f64 - from.y as f64) * t).round() as i32,
            )
        })
        .collect()
}

pub struct DesktopDriver {
    enigo: Enigo,
    monitor_index: usize,
}

fn input_err(what: &str, e: impl std::fmt::Debug) -> CvPomError {
    CvPomError::DriverOperationFailed(format!("{what}: {e:?}"))
}

impl DesktopDriver {
    pub fn new() -> CvPomResult<Self> {
        Self::on_monitor(0)
    }

    /// Capture from the monitor at `monitor_index` in `Monitor::all()` order.
    pub fn on_monitor(monitor_index: usize) -> CvPomResult<Self> {
        let enigo = Enigo::new(&Settings::default()).map_err(|e| input_err("enigo init", e))?;
        Ok(Self {
            enigo,
            monitor_index,
        })
    }

    fn move_to(&mut self, at: Point) -> CvPomResult<()> {
        self.enigo
            .move_mouse(at.x, at.y, Coordinate::Abs)
            .map_err(|e| input_err("mouse move", e))
    }

    /// Press at `from`, glide to `to` over `duration`, release.
    fn gesture(&mut self, from: Point, to: Point, duration: Duration) -> CvPomResult<()> {
        self.move_to(from)?;
        self.enigo
            .button(Button::Left, Direction::Press)
            .map_err(|e| input_err("mouse press", e))?;

        let step_sleep = duration / GESTURE_STEPS;
        let moved = gesture_path(from, to, GESTURE_STEPS)
            .into_iter()
            .try_for_each(|p| {
                thread::sleep(step_sleep);
                self.move_to(p)
            });

        // Always release, even after a failed move.
        let released = self
            .enigo
            .button(Button::Left, Direction::Release)
            .map_err(|e| input_err("mouse release", e));
        moved.and(released)
    }
}

impl Driver for DesktopDriver {
    fn capture_screenshot(&mut self) -> CvPomResult<DynamicImage> {
        let monitors = Monitor::all().map_err(|e| input_err("list monitors", e))?;
        let monitor = monitors.get(self.monitor_index).ok_or_else(|| {
            CvPomError::DriverOperationFailed(format!(
                "monitor {} not found ({} available)",
                self.monitor_index,
                monitors.len()
            ))
        })?;
        let frame = monitor
            .capture_image()
            .map_err(|e| input_err("screen capture", e))?;
        Ok(DynamicImage::ImageRgba8(frame))
    }

    fn click_at(&mut self, at: Point, click: &ClickSpec) -> CvPomResult<()> {
        self.move_to(at)?;
        let button = match click.button {
            MouseButton::Left => Button::Left,
            MouseButton::Right => Button::Right,
            MouseButton::Middle => Button::Middle,
        };
        for i in 0..click.times {
            if i > 0 && !click.interval.is_zero() {
                thread::sleep(click.interval);
            }
            self.enigo
                .button(button, Direction::Click)
                .map_err(|e| input_err("click", e))?;
        }
        Ok(())
    }

    fn send_keys(&mut self, text: &str) -> CvPomResult<()> {
        self.enigo.text(text).map_err(|e| input_err("type", e))
    }

    /// Scroll at `from`, one notch at a time spread over `duration`.
    fn swipe(&mut self, from: Point, to: Point, duration: Duration) -> CvPomResult<()> {
        let Some((axis, notches)) = scroll_for(from, to) else {
            return Ok(());
        };
        self.move_to(from)?;
        let axis = match axis {
            ScrollAxis::Vertical => Axis::Vertical,
            ScrollAxis::Horizontal => Axis::Horizontal,
        };
        let count = notches.unsigned_abs();
        let pause = duration / count;
        for i in 0..count {
            if i > 0 {
                thread::sleep(pause);
            }
            self.enigo
                .scroll(notches.signum(), axis)
                .map_err(|e| input_err("scroll", e))?;
        }
        Ok(())
    }

    fn hover_at(&mut self, at: Point) -> CvPomResult<()> {
        self.move_to(at)
    }

    fn drag_drop(&mut self, from: Point, to: Point, duration: Duration) -> CvPomResult<()> {
        self.gesture(from, to, duration)
    }
}
