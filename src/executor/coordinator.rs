/// Coordinate mapping between the captured image and the driver's native
/// input space, plus the start/end resolution shared by swipe and drag.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CvPomError;
use crate::perception::types::{Element, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwipeDirection {
    Up,
    Down,
    Left,
    Right,
}

impl SwipeDirection {
    /// Unit step along the direction in image space (y grows downwards).
    pub fn unit(&self) -> (i32, i32) {
        match self {
            SwipeDirection::Up => (0, -1),
            SwipeDirection::Down => (0, 1),
            SwipeDirection::Left => (-1, 0),
            SwipeDirection::Right => (1, 0),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SwipeDirection::Up => "up",
            SwipeDirection::Down => "down",
            SwipeDirection::Left => "left",
            SwipeDirection::Right => "right",
        }
    }
}

impl FromStr for SwipeDirection {
    type Err = CvPomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(SwipeDirection::Up),
            "down" => Ok(SwipeDirection::Down),
            "left" => Ok(SwipeDirection::Left),
            "right" => Ok(SwipeDirection::Right),
            other => Err(CvPomError::InvalidArgument(format!(
                "direction has to be one of: up, down, left, right. Was '{other}'"
            ))),
        }
    }
}

impl fmt::Display for SwipeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that can be pointed at: a resolved element's center or literal coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target<'a> {
    Element(&'a Element),
    Coords(Point),
}

impl Target<'_> {
    pub fn point(&self) -> Point {
        match self {
            Target::Element(el) => el.center(),
            Target::Coords(p) => *p,
        }
    }
}

impl<'a> From<&'a Element> for Target<'a> {
    fn from(el: &'a Element) -> Self {
        Target::Element(el)
    }
}

impl From<Point> for Target<'_> {
    fn from(p: Point) -> Self {
        Target::Coords(p)
    }
}

impl From<(i32, i32)> for Target<'_> {
    fn from(p: (i32, i32)) -> Self {
        Target::Coords(p.into())
    }
}

/// End point of a swipe or drag, relative to its start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Destination<'a> {
    /// Literal coordinates.
    Coords(Point),
    /// Offset from the start point.
    Delta(i32, i32),
    /// Configured magnitude along a direction.
    Direction(SwipeDirection),
    /// Center of another element.
    Element(&'a Element),
}

impl Destination<'_> {
    pub fn resolve(&self, start: Point, magnitude: i32) -> Point {
        match self {
            Destination::Coords(p) => *p,
            Destination::Delta(dx, dy) => start.offset(*dx, *dy),
            Destination::Direction(dir) => {
                let (ux, uy) = dir.unit();
                start.offset(ux * magnitude, uy * magnitude)
            }
            Destination::Element(el) => el.center(),
        }
    }
}

/// Map an image-space point into the driver's coordinate space.
pub fn scale_point(p: Point, resize: f64) -> Point {
    Point::new(
        (p.x as f64 * resize).round() as i32,
        (p.y as f64 * resize).round() as i32,
    )
}
