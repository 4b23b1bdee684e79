// Interaction dispatcher: resolved elements / coordinates → driver primitives.
use std::time::Duration;

use crate::config::InteractionConfig;
use crate::driver::traits::{ClickSpec, Driver};
use crate::errors::CvPomResult;
use crate::executor::coordinator::{scale_point, Destination, SwipeDirection, Target};
use crate::perception::types::{Element, Point};

/// Stateless translator from image-space targets to driver calls.
///
/// Every point is offset in image space first, then multiplied by `resize`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionDispatcher {
    resize: f64,
    swipe_magnitude: i32,
    default_duration: Duration,
}

impl InteractionDispatcher {
    pub fn new(resize: f64, swipe_magnitude: i32, default_duration: Duration) -> Self {
        Self {
            resize,
            swipe_magnitude,
            default_duration,
        }
    }

    pub fn from_config(config: &InteractionConfig) -> Self {
        Self::new(
            config.resize,
            config.swipe_magnitude,
            config.default_duration(),
        )
    }

    pub fn resize(&self) -> f64 {
        self.resize
    }

    pub fn swipe_magnitude(&self) -> i32 {
        self.swipe_magnitude
    }

    /// Image-space point → driver point.
    pub fn to_driver(&self, p: Point) -> Point {
        scale_point(p, self.resize)
    }

    /// Click `target` (+ `offset`). Returns the point handed to the driver.
    pub fn click<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        target: Target<'_>,
        offset: (i32, i32),
        click: &ClickSpec,
    ) -> CvPomResult<Point> {
        let image_point = target.point().offset(offset.0, offset.1);
        let at = self.to_driver(image_point);
        tracing::info!(
            label = target_label(&target),
            image_x = image_point.x,
            image_y = image_point.y,
            x = at.x,
            y = at.y,
            times = click.times,
            button = ?click.button,
            "action: click"
        );
        driver.click_at(at, click)?;
        Ok(at)
    }

    /// Focus `element` with a click at its center (+ `offset`), then type `text`.
    pub fn send_keys<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        element: &Element,
        text: &str,
        offset: (i32, i32),
    ) -> CvPomResult<Point> {
        let at = self.click(driver, Target::Element(element), offset, &ClickSpec::default())?;
        tracing::info!(
            label = %element.label,
            chars = text.chars().count(),
            "action: send_keys"
        );
        driver.send_keys(text)?;
        Ok(at)
    }

    pub fn hover<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        target: Target<'_>,
        offset: (i32, i32),
    ) -> CvPomResult<Point> {
        let image_point = target.point().offset(offset.0, offset.1);
        let at = self.to_driver(image_point);
        tracing::info!(label = target_label(&target), x = at.x, y = at.y, "action: hover");
        driver.hover_at(at)?;
        Ok(at)
    }

    /// Resolve start/end of a gesture in driver space.
    pub fn gesture_points(&self, from: Target<'_>, to: Destination<'_>) -> (Point, Point) {
        let start = from.point();
        let end = to.resolve(start, self.swipe_magnitude);
        (self.to_driver(start), self.to_driver(end))
    }

    /// Swipe between two literal image-space points.
    pub fn swipe_coords<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        from: Point,
        to: Point,
        duration: Option<Duration>,
    ) -> CvPomResult<(Point, Point)> {
        self.swipe(driver, Target::Coords(from), Destination::Coords(to), duration)
    }

    /// Swipe from `from` to a destination (coords, delta, direction or element).
    pub fn swipe<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        from: Target<'_>,
        to: Destination<'_>,
        duration: Option<Duration>,
    ) -> CvPomResult<(Point, Point)> {
        let (start, end) = self.gesture_points(from, to);
        let duration = duration.unwrap_or(self.default_duration);
        tracing::info!(
            label = target_label(&from),
            start = ?(start.x, start.y),
            end = ?(end.x, end.y),
            duration_ms = duration.as_millis() as u64,
            "action: swipe"
        );
        driver.swipe(start, end, duration)?;
        Ok((start, end))
    }

    /// Swipe across the screen in `direction`, starting at the screen center.
    pub fn swipe_screen<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        screen_size: (u32, u32),
        direction: SwipeDirection,
        duration: Option<Duration>,
    ) -> CvPomResult<(Point, Point)> {
        let center = Point::new(screen_size.0 as i32 / 2, screen_size.1 as i32 / 2);
        self.swipe(
            driver,
            Target::Coords(center),
            Destination::Direction(direction),
            duration,
        )
    }

    /// Drag from `from` and drop at the destination.
    ///
    /// Same point resolution as [`swipe`](Self::swipe), but goes through the
    /// driver's drag primitive.
    pub fn drag_drop<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        from: Target<'_>,
        to: Destination<'_>,
        duration: Option<Duration>,
    ) -> CvPomResult<(Point, Point)> {
        let (start, end) = self.gesture_points(from, to);
        let duration = duration.unwrap_or(self.default_duration);
        tracing::info!(
            label = target_label(&from),
            start = ?(start.x, start.y),
            end = ?(end.x, end.y),
            duration_ms = duration.as_millis() as u64,
            "action: drag_drop"
        );
        driver.drag_drop(start, end, duration)?;
        Ok((start, end))
    }
}

impl Default for InteractionDispatcher {
    fn default() -> Self {
        Self::from_config(&InteractionConfig::default())
    }
}

fn target_label<'a>(target: &Target<'a>) -> &'a str {
    match target {
        Target::Element(el) => el.label.as_str(),
        Target::Coords(_) => "<coords>",
    }
}
