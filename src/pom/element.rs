use std::time::Duration;

use crate::driver::traits::{ClickSpec, Driver, MouseButton};
use crate::errors::{CvPomError, CvPomResult};
use crate::executor::coordinator::{Destination, SwipeDirection, Target};
use crate::perception::types::{Element, Point};
use crate::pom::driver::CvPomDriver;
use crate::query::types::Query;
use crate::resolver::state::WaitMode;

/// Options for [`DriverElement::click`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickOptions {
    /// Image-space offset from the element center.
    pub offset: (i32, i32),
    pub times: u32,
    /// Pause between clicks; `None` uses `[interaction].click_interval_ms`.
    pub interval: Option<Duration>,
    pub button: MouseButton,
    /// Resolution timeout when the element is not resolved yet.
    pub timeout: Option<Duration>,
}

impl Default for ClickOptions {
    fn default() -> Self {
        Self {
            offset: (0, 0),
            times: 1,
            interval: None,
            button: MouseButton::Left,
            timeout: None,
        }
    }
}

impl ClickOptions {
    pub fn double() -> Self {
        Self {
            times: 2,
            ..Self::default()
        }
    }

    pub fn right() -> Self {
        Self {
            button: MouseButton::Right,
            ..Self::default()
        }
    }

    pub fn with_offset(mut self, dx: i32, dy: i32) -> Self {
        self.offset = (dx, dy);
        self
    }
}

/// Element handle bound to the query that produced it.
///
/// The handle may be unresolved when nothing matched at lookup time; every
/// interaction first waits for the query to match, then remembers the element.
/// Interactions borrow the driver, so handles can be kept around freely.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverElement {
    query: Query,
    element: Option<Element>,
}

impl DriverElement {
    pub fn new(query: Query, element: Option<Element>) -> Self {
        Self { query, element }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn element(&self) -> Option<&Element> {
        self.element.as_ref()
    }

    pub fn is_resolved(&self) -> bool {
        self.element.is_some()
    }

    /// Poll until the query matches. No-op when already resolved.
    pub fn wait_visible<D: Driver>(
        &mut self,
        drv: &mut CvPomDriver<D>,
        timeout: Option<Duration>,
    ) -> CvPomResult<&Element> {
        if self.element.is_none() {
            let resolution = drv.wait_until(&self.query, WaitMode::Present, timeout)?;
            self.element = resolution.into_first();
        }
        self.element
            .as_ref()
            .ok_or_else(|| CvPomError::ElementNotFound {
                query: self.query.to_string(),
                elapsed_ms: 0,
            })
    }

    /// Poll until the query no longer matches anything on screen.
    pub fn wait_not_visible<D: Driver>(
        &self,
        drv: &mut CvPomDriver<D>,
        timeout: Option<Duration>,
    ) -> CvPomResult<()> {
        drv.wait_until(&self.query, WaitMode::Absent, timeout)?;
        Ok(())
    }

    fn resolved<D: Driver>(
        &mut self,
        drv: &mut CvPomDriver<D>,
        timeout: Option<Duration>,
    ) -> CvPomResult<Element> {
        self.wait_visible(drv, timeout).cloned()
    }

    pub fn click<D: Driver>(
        &mut self,
        drv: &mut CvPomDriver<D>,
        options: &ClickOptions,
    ) -> CvPomResult<Point> {
        let el = self.resolved(drv, options.timeout)?;
        let spec = ClickSpec {
            times: options.times,
            interval: options
                .interval
                .unwrap_or_else(|| drv.default_click_interval()),
            button: options.button,
        };
        drv.dispatch_click(Target::Element(&el), options.offset, &spec)
    }

    /// Click to focus, then type `text`.
    pub fn send_keys<D: Driver>(
        &mut self,
        drv: &mut CvPomDriver<D>,
        text: &str,
        offset: (i32, i32),
    ) -> CvPomResult<Point> {
        let el = self.resolved(drv, None)?;
        drv.dispatch_send_keys(&el, text, offset)
    }

    pub fn hover<D: Driver>(
        &mut self,
        drv: &mut CvPomDriver<D>,
        offset: (i32, i32),
        timeout: Option<Duration>,
    ) -> CvPomResult<Point> {
        let el = self.resolved(drv, timeout)?;
        drv.dispatch_hover(Target::Element(&el), offset)
    }

    /// Swipe from the element center to coordinates, a delta, a direction or
    /// another element.
    pub fn swipe<D: Driver>(
        &mut self,
        drv: &mut CvPomDriver<D>,
        to: Destination<'_>,
        duration: Option<Duration>,
    ) -> CvPomResult<(Point, Point)> {
        let el = self.resolved(drv, None)?;
        drv.dispatch_swipe(Target::Element(&el), to, duration)
    }

    /// Swipe from this element onto `other`, resolving both first.
    pub fn swipe_to_element<D: Driver>(
        &mut self,
        drv: &mut CvPomDriver<D>,
        other: &mut DriverElement,
        duration: Option<Duration>,
    ) -> CvPomResult<(Point, Point)> {
        let from = self.resolved(drv, None)?;
        let to = other.resolved(drv, None)?;
        drv.dispatch_swipe(Target::Element(&from), Destination::Element(&to), duration)
    }

    /// Swipe the screen in `direction` until the query matches.
    ///
    /// Each round takes one snapshot; on a miss the screen is swiped from its
    /// center. After `limit` swipes (default `[interaction].swipe_to_limit`)
    /// one last regular wait decides the outcome.
    pub fn swipe_to<D: Driver>(
        &mut self,
        drv: &mut CvPomDriver<D>,
        direction: SwipeDirection,
        limit: Option<u32>,
    ) -> CvPomResult<&Element> {
        if self.element.is_none() {
            let limit = limit.unwrap_or(drv.config().interaction.swipe_to_limit);
            for swipes in 0..limit {
                let probe = drv.element(&self.query)?;
                if probe.is_resolved() {
                    tracing::debug!(query = %self.query, swipes, "swipe_to found element");
                    self.element = probe.element;
                    break;
                }
                drv.swipe_screen(direction, None)?;
            }
        }
        self.wait_visible(drv, None)
    }

    /// Drag this element and drop it at coordinates, a delta or another element.
    pub fn drag_drop<D: Driver>(
        &mut self,
        drv: &mut CvPomDriver<D>,
        to: Destination<'_>,
        duration: Option<Duration>,
    ) -> CvPomResult<(Point, Point)> {
        let el = self.resolved(drv, None)?;
        drv.dispatch_drag_drop(Target::Element(&el), to, duration)
    }

    /// Drag from `source` and drop onto this element. Deltas and directions
    /// are taken relative to this element's center.
    pub fn drag_drop_to<D: Driver>(
        &mut self,
        drv: &mut CvPomDriver<D>,
        source: Destination<'_>,
        duration: Option<Duration>,
    ) -> CvPomResult<(Point, Point)> {
        let el = self.resolved(drv, None)?;
        let start = source.resolve(el.center(), drv.dispatcher().swipe_magnitude());
        drv.dispatch_drag_drop(Target::Coords(start), Destination::Element(&el), duration)
    }
}
