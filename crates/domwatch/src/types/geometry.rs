/*! Geometry types for viewport (client) coordinates. */

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A 2D point in viewport coordinates.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, TS)]
#[ts(export)]
pub struct Point {
  pub x: f64,
  pub y: f64,
}

impl Point {
  pub const fn new(x: f64, y: f64) -> Self {
    Self { x, y }
  }
}

/// Rendered layout size of an element (`offsetWidth` / `offsetHeight`).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, TS)]
#[ts(export)]
pub struct Size {
  pub width: f64,
  pub height: f64,
}

impl Size {
  pub const fn new(width: f64, height: f64) -> Self {
    Self { width, height }
  }

  /// Zero (or negative) layout width.
  pub fn has_no_width(&self) -> bool {
    self.width <= 0.0
  }

  /// Zero (or negative) layout height.
  pub fn has_no_height(&self) -> bool {
    self.height <= 0.0
  }
}

/// Bounding client rectangle. `x`/`y` are the left/top edges relative to the
/// viewport, so a negative `y` means the top edge is scrolled above it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, TS)]
#[ts(export)]
pub struct Rect {
  pub x: f64,
  pub y: f64,
  pub width: f64,
  pub height: f64,
}

impl Rect {
  pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
    Self {
      x,
      y,
      width,
      height,
    }
  }

  /// Top edge.
  pub const fn top(&self) -> f64 {
    self.y
  }

  /// Left edge.
  pub const fn left(&self) -> f64 {
    self.x
  }

  pub fn right(&self) -> f64 {
    self.x + self.width
  }

  pub fn bottom(&self) -> f64 {
    self.y + self.height
  }

  /// Visual center, the primary hit-test point.
  pub fn center(&self) -> Point {
    Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
  }

  /// Top-left corner, the fallback hit-test point.
  pub const fn top_left(&self) -> Point {
    Point::new(self.left(), self.top())
  }

  /// True when the top edge lies above the viewport.
  pub fn is_above_viewport(&self) -> bool {
    self.top() < 0.0
  }

  /// Check if a point is contained within this rectangle (edges inclusive).
  pub fn contains(&self, point: Point) -> bool {
    point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
  }
}
