//! Persisted geometry: node positions and the saved viewBox.

use serde::{Deserialize, Serialize};

/// A position in node-space (the SVG user coordinate system).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// The visible window into node-space, as written to the SVG `viewBox`
/// attribute, plus the zoom factor that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub zoom_factor: f64,
}

impl Default for ViewBox {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width: 1000.0,
            height: 800.0,
            zoom_factor: 1.0,
        }
    }
}

impl ViewBox {
    /// The `viewBox` attribute value: `"left top width height"`.
    pub fn to_attribute(&self) -> String {
        format!("{} {} {} {}", self.left, self.top, self.width, self.height)
    }

    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0.0 {
            0.0
        } else {
            self.width / self.height
        }
    }

    /// A saved viewBox is usable only with a positive, finite zoom factor
    /// and a non-degenerate size.
    pub fn is_usable(&self) -> bool {
        self.zoom_factor.is_finite()
            && self.zoom_factor > 0.0
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0
    }
}
