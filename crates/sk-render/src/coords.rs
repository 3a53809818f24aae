//! Coordinate engine: node-space ⇄ viewBox ⇄ screen-space.
//!
//! Node-space is where positions are persisted. The viewBox is the window
//! into node-space written to the SVG element. Screen-space is the canvas
//! element's bounding rect in page pixels. `zoom_factor` is node-space units
//! per screen pixel, so the viewBox is always `screen size × zoom_factor`.

use kurbo::{Rect, Vec2};
use sk_core::{Point, SketchConfig, ViewBox};

pub fn to_kurbo(p: Point) -> kurbo::Point {
    kurbo::Point::new(p.x, p.y)
}

pub fn from_kurbo(p: kurbo::Point) -> Point {
    Point::new(p.x, p.y)
}

/// The live mapping between screen and node-space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Canvas bounding rect, screen-space.
    pub screen: Rect,
    pub view_box: ViewBox,
}

/// A viewBox showing node-space from the origin at zoom 1.
pub fn default_view_box(screen: Rect) -> ViewBox {
    ViewBox {
        left: 0.0,
        top: 0.0,
        width: screen.width(),
        height: screen.height(),
        zoom_factor: 1.0,
    }
}

/// Adapt a saved viewBox to the current screen.
///
/// An unusable save (zero or non-finite zoom) yields the default viewBox.
/// When the screen's aspect ratio drifts from the saved one by more than
/// `tolerance`, width and height are recomputed from the screen and the
/// saved zoom; otherwise the saved box is kept as is.
pub fn restore_saved_view_box(saved: ViewBox, screen: Rect, tolerance: f64) -> ViewBox {
    if !saved.is_usable() || screen.width() <= 0.0 || screen.height() <= 0.0 {
        log::debug!("saved viewBox {saved:?} is unusable; using default");
        return default_view_box(screen);
    }
    let screen_ratio = screen.width() / screen.height();
    let saved_ratio = saved.aspect_ratio();
    let drift = (screen_ratio - saved_ratio).abs() / saved_ratio;
    if drift <= tolerance {
        return saved;
    }
    log::debug!("viewBox aspect drift {drift:.3} exceeds {tolerance}; recomputing size");
    ViewBox {
        width: screen.width() * saved.zoom_factor,
        height: screen.height() * saved.zoom_factor,
        ..saved
    }
}

impl Viewport {
    pub fn new(screen: Rect, view_box: ViewBox) -> Self {
        Self { screen, view_box }
    }

    /// A viewport restoring `saved` onto `screen`.
    pub fn restore(screen: Rect, saved: ViewBox, config: &SketchConfig) -> Self {
        Self::new(screen, restore_saved_view_box(saved, screen, config.aspect_tolerance))
    }

    fn scale(&self) -> Vec2 {
        let sx = if self.screen.width() > 0.0 {
            self.view_box.width / self.screen.width()
        } else {
            self.view_box.zoom_factor
        };
        let sy = if self.screen.height() > 0.0 {
            self.view_box.height / self.screen.height()
        } else {
            self.view_box.zoom_factor
        };
        Vec2::new(sx, sy)
    }

    /// Absolute screen point → node-space.
    pub fn screen_to_node(&self, p: kurbo::Point) -> Point {
        let s = self.scale();
        Point::new(
            self.view_box.left + (p.x - self.screen.x0) * s.x,
            self.view_box.top + (p.y - self.screen.y0) * s.y,
        )
    }

    /// Node-space point → absolute screen point.
    pub fn node_to_screen(&self, p: Point) -> kurbo::Point {
        let s = self.scale();
        kurbo::Point::new(
            self.screen.x0 + (p.x - self.view_box.left) / s.x,
            self.screen.y0 + (p.y - self.view_box.top) / s.y,
        )
    }

    /// A screen-space displacement in node-space units.
    pub fn screen_delta_to_node(&self, delta: Vec2) -> Vec2 {
        let s = self.scale();
        Vec2::new(delta.x * s.x, delta.y * s.y)
    }

    /// The visible node-space rectangle.
    pub fn visible(&self) -> Rect {
        let vb = &self.view_box;
        Rect::new(vb.left, vb.top, vb.left + vb.width, vb.top + vb.height)
    }

    /// Move the view so content follows a screen drag of `delta` pixels.
    pub fn pan_by_screen(&mut self, delta: Vec2) {
        let d = self.screen_delta_to_node(delta);
        self.view_box.left -= d.x;
        self.view_box.top -= d.y;
    }

    /// Multiply the zoom factor, keeping the node-space point under
    /// `anchor` (screen-space) fixed. Factors above 1 show more of the
    /// canvas.
    pub fn zoom_at(&mut self, factor: f64, anchor: kurbo::Point, config: &SketchConfig) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let fixed = self.screen_to_node(anchor);
        let zoom = config.clamp_zoom(self.view_box.zoom_factor * factor);
        self.view_box.zoom_factor = zoom;
        self.view_box.width = self.screen.width() * zoom;
        self.view_box.height = self.screen.height() * zoom;
        self.view_box.left = fixed.x - (anchor.x - self.screen.x0) * zoom;
        self.view_box.top = fixed.y - (anchor.y - self.screen.y0) * zoom;
    }

    /// One wheel notch: negative `delta_y` zooms in.
    pub fn wheel(&mut self, delta_y: f64, anchor: kurbo::Point, config: &SketchConfig) {
        let factor = if delta_y < 0.0 {
            1.0 / config.zoom_step
        } else {
            config.zoom_step
        };
        self.zoom_at(factor, anchor, config);
    }

    /// The canvas element changed size; keep left/top and zoom.
    pub fn resize(&mut self, screen: Rect) {
        self.screen = screen;
        self.view_box.width = screen.width() * self.view_box.zoom_factor;
        self.view_box.height = screen.height() * self.view_box.zoom_factor;
    }

    /// Center the view on a node-space point.
    pub fn center_on(&mut self, p: Point) {
        self.view_box.left = p.x - self.view_box.width / 2.0;
        self.view_box.top = p.y - self.view_box.height / 2.0;
    }

    /// Zoom and pan so `content` (node-space) fits with `padding` around it.
    pub fn fit(&mut self, content: Rect, padding: f64, config: &SketchConfig) {
        if self.screen.width() <= 0.0 || self.screen.height() <= 0.0 {
            return;
        }
        let content = content.inflate(padding, padding);
        let zoom = (content.width() / self.screen.width())
            .max(content.height() / self.screen.height());
        let zoom = config.clamp_zoom(if zoom > 0.0 { zoom } else { 1.0 });
        self.view_box.zoom_factor = zoom;
        self.view_box.width = self.screen.width() * zoom;
        self.view_box.height = self.screen.height() * zoom;
        self.center_on(from_kurbo(content.center()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn screen() -> Rect {
        Rect::new(10.0, 20.0, 810.0, 620.0)
    }

    #[test]
    fn zero_zoom_resets_to_default() {
        let saved = ViewBox {
            zoom_factor: 0.0,
            ..Default::default()
        };
        let vb = restore_saved_view_box(saved, screen(), 0.1);
        assert_eq!(vb, default_view_box(screen()));
        assert_eq!(vb.width, 800.0);
        assert_eq!(vb.zoom_factor, 1.0);
    }

    #[test]
    fn small_aspect_drift_keeps_saved_box() {
        let saved = ViewBox {
            left: 5.0,
            top: 5.0,
            width: 1600.0,
            height: 1250.0,
            zoom_factor: 2.0,
        };
        // 800x600 screen: ratio 1.333 vs saved 1.28, ~4% drift.
        assert_eq!(restore_saved_view_box(saved, screen(), 0.1), saved);
    }

    #[test]
    fn large_aspect_drift_recomputes_size() {
        let saved = ViewBox {
            left: 5.0,
            top: 7.0,
            width: 1000.0,
            height: 1000.0,
            zoom_factor: 2.0,
        };
        let vb = restore_saved_view_box(saved, screen(), 0.1);
        assert_eq!((vb.left, vb.top), (5.0, 7.0));
        assert_eq!((vb.width, vb.height), (1600.0, 1200.0));
    }

    #[test]
    fn screen_and_node_space_invert() {
        let mut vp = Viewport::new(screen(), default_view_box(screen()));
        vp.zoom_at(2.0, kurbo::Point::new(110.0, 120.0), &SketchConfig::default());
        let p = kurbo::Point::new(300.0, 400.0);
        let back = vp.node_to_screen(vp.screen_to_node(p));
        assert!((back - p).hypot() < EPS);
    }

    #[test]
    fn zoom_keeps_anchor_fixed() {
        let cfg = SketchConfig::default();
        let mut vp = Viewport::new(screen(), default_view_box(screen()));
        let anchor = kurbo::Point::new(410.0, 320.0);
        let before = vp.screen_to_node(anchor);
        vp.wheel(-1.0, anchor, &cfg);
        let after = vp.screen_to_node(anchor);
        assert!((before.x - after.x).abs() < EPS && (before.y - after.y).abs() < EPS);
        assert!(vp.view_box.zoom_factor < 1.0);
        assert!((vp.view_box.width - 800.0 / cfg.zoom_step).abs() < EPS);
    }

    #[test]
    fn pan_moves_view_against_drag() {
        let mut vp = Viewport::new(screen(), default_view_box(screen()));
        vp.view_box.zoom_factor = 2.0;
        vp.view_box.width = 1600.0;
        vp.view_box.height = 1200.0;
        vp.pan_by_screen(Vec2::new(10.0, -5.0));
        assert_eq!((vp.view_box.left, vp.view_box.top), (-20.0, 10.0));
    }
}
