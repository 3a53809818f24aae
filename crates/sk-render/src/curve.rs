//! Link geometry: the quadratic curve between two nodes, its label anchor,
//! arrowhead, and the anchor-drag solver.
//!
//! The control point sits on the perpendicular through the midpoint of the
//! longer axis, so along that axis the curve parameter is linear. Anchor
//! positions are therefore curve parameters and map 1:1 onto the fraction
//! of the longer axis.

use crate::coords::to_kurbo;
use kurbo::{ParamCurve, ParamCurveArclen, ParamCurveDeriv, ParamCurveExtrema, QuadBez, Rect, Vec2};
use sk_core::{Point, SketchConfig};

const ACCURACY: f64 = 1e-3;

/// The curve from `source` to `target` bent by `bender`.
///
/// `ratio` is the share of the longer axis one bender unit moves the
/// control point.
pub fn link_curve(source: Point, target: Point, bender: f64, ratio: f64) -> QuadBez {
    let p0 = to_kurbo(source);
    let p2 = to_kurbo(target);
    let mid = p0.midpoint(p2);
    let d = p2 - p0;
    let ctrl = if bender == 0.0 {
        mid
    } else if d.x.abs() >= d.y.abs() {
        mid + Vec2::new(0.0, bender * ratio * d.x.abs())
    } else {
        mid + Vec2::new(bender * ratio * d.y.abs(), 0.0)
    };
    QuadBez::new(p0, ctrl, p2)
}

/// Rendered geometry of one link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkGeometry {
    pub curve: QuadBez,
    /// Where the label sits.
    pub anchor: kurbo::Point,
}

impl LinkGeometry {
    pub fn new(source: Point, target: Point, bender: f64, anchor_pos: f64, config: &SketchConfig) -> Self {
        let curve = link_curve(source, target, bender, config.curvature_ratio);
        Self {
            curve,
            anchor: curve.eval(anchor_pos.clamp(0.0, 1.0)),
        }
    }

    pub fn length(&self) -> f64 {
        self.curve.arclen(ACCURACY)
    }

    /// The curve with `start` and `end` node-space units cut off its ends,
    /// so it stops at the node outlines.
    pub fn trimmed(&self, start: f64, end: f64) -> QuadBez {
        let len = self.length();
        if len <= start + end {
            return self.curve;
        }
        let t0 = self.curve.inv_arclen(start, ACCURACY);
        let t1 = self.curve.inv_arclen(len - end, ACCURACY);
        self.curve.subsegment(t0..t1)
    }

    /// Arrowhead triangle whose tip sits `inset` before the target.
    pub fn arrow_head(&self, inset: f64, size: f64) -> [kurbo::Point; 3] {
        let len = self.length();
        let t = if len > inset {
            self.curve.inv_arclen(len - inset, ACCURACY)
        } else {
            1.0
        };
        let tip = self.curve.eval(t);
        let tangent = self.curve.deriv().eval(t).to_vec2();
        let dir = if tangent.hypot() > 0.0 {
            tangent.normalize()
        } else {
            Vec2::new(1.0, 0.0)
        };
        let normal = dir.turn_90();
        let base = tip - dir * size;
        [tip, base + normal * (size / 2.0), base - normal * (size / 2.0)]
    }

    /// SVG path data.
    pub fn path_data(curve: &QuadBez) -> String {
        format!(
            "M{} {} Q{} {} {} {}",
            fmt_num(curve.p0.x),
            fmt_num(curve.p0.y),
            fmt_num(curve.p1.x),
            fmt_num(curve.p1.y),
            fmt_num(curve.p2.x),
            fmt_num(curve.p2.y)
        )
    }
}

/// Round to two decimals and drop trailing zeros.
pub(crate) fn fmt_num(v: f64) -> String {
    let rounded = (v * 100.0).round() / 100.0;
    if rounded == 0.0 {
        // Avoid "-0".
        return "0".to_string();
    }
    format!("{rounded}")
}

// ─── Anchor drag ─────────────────────────────────────────────────────────

/// Result of dragging a link's label anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorDrag {
    pub anchor_pos: f64,
    pub bender: f64,
    /// The end buffer as a fraction of the path, applied to `anchor_pos`.
    pub buffer: f64,
}

/// The box the mouse is confined to while dragging an anchor: everything
/// the curve can reach within the bender bounds.
///
/// A curve point at a fixed parameter moves linearly with the bender, so
/// every curve with `|bender| <= max_bender` lies between the two extreme
/// curves, and the union of their boxes is the box of all rendered paths.
pub fn anchor_drag_bounds(source: Point, target: Point, config: &SketchConfig) -> Rect {
    let ratio = config.curvature_ratio;
    link_curve(source, target, config.max_bender, ratio)
        .bounding_box()
        .union(link_curve(source, target, -config.max_bender, ratio).bounding_box())
}

/// Solve anchor position and bender from a mouse position in node-space.
///
/// The mouse is clamped to [`anchor_drag_bounds`]. The position along the
/// longer axis gives the anchor (inverted automatically when the target
/// lies before the source on that axis) and is kept `anchor_end_buffer`
/// screen pixels away from both ends; `zoom_factor` is the viewport's
/// node-space units per pixel. The transverse displacement from the
/// midpoint gives the bender.
pub fn drag_anchor(
    source: Point,
    target: Point,
    current_bender: f64,
    mouse: Point,
    zoom_factor: f64,
    config: &SketchConfig,
) -> AnchorDrag {
    let bounds = anchor_drag_bounds(source, target, config);
    let m = kurbo::Point::new(
        mouse.x.clamp(bounds.x0, bounds.x1),
        mouse.y.clamp(bounds.y0, bounds.y1),
    );
    let p0 = to_kurbo(source);
    let p2 = to_kurbo(target);
    let mid = p0.midpoint(p2);
    let d = p2 - p0;

    let (along, span, transverse) = if d.x.abs() >= d.y.abs() {
        (m.x - p0.x, d.x, m.y - mid.y)
    } else {
        (m.y - p0.y, d.y, m.x - mid.x)
    };
    let frac = if span != 0.0 { along / span } else { 0.5 };

    let length = link_curve(source, target, current_bender, config.curvature_ratio).arclen(ACCURACY);
    let buffer = if length > 0.0 {
        (config.anchor_end_buffer * zoom_factor / length).min(0.5)
    } else {
        0.5
    };
    let anchor_pos = frac.clamp(buffer, 1.0 - buffer);

    let bender = if span != 0.0 {
        config.clamp_bender(2.0 * transverse / (config.curvature_ratio * span.abs()))
    } else {
        0.0
    };
    log::trace!("anchor drag: pos {anchor_pos:.3} bender {bender:.3}");

    AnchorDrag {
        anchor_pos,
        bender,
        buffer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn cfg() -> SketchConfig {
        SketchConfig::default()
    }

    #[test]
    fn straight_link_has_midpoint_control() {
        let c = link_curve(Point::new(0.0, 0.0), Point::new(100.0, 40.0), 0.0, 0.1);
        assert_eq!(c.p1, kurbo::Point::new(50.0, 20.0));
    }

    #[test]
    fn bender_offsets_perpendicular_to_longer_axis() {
        let horizontal = link_curve(Point::new(0.0, 0.0), Point::new(200.0, 20.0), 2.0, 0.1);
        assert_eq!(horizontal.p1, kurbo::Point::new(100.0, 10.0 + 40.0));

        let vertical = link_curve(Point::new(0.0, 0.0), Point::new(20.0, -300.0), -1.0, 0.1);
        assert_eq!(vertical.p1, kurbo::Point::new(10.0 - 30.0, -150.0));
    }

    #[test]
    fn anchor_is_clamped_away_from_ends() {
        let (s, t) = (Point::new(0.0, 0.0), Point::new(200.0, 0.0));
        for mouse in [Point::new(-500.0, 0.0), Point::new(1.0, 3.0), Point::new(9000.0, -9000.0)] {
            let drag = drag_anchor(s, t, 0.0, mouse, 1.0, &cfg());
            assert!((drag.buffer - 0.1).abs() < EPS);
            assert!(drag.anchor_pos >= drag.buffer - EPS);
            assert!(drag.anchor_pos <= 1.0 - drag.buffer + EPS);
        }
    }

    #[test]
    fn end_buffer_is_a_screen_distance() {
        let (s, t) = (Point::new(0.0, 0.0), Point::new(200.0, 0.0));
        let near_source = Point::new(0.0, 0.0);
        // 20 px at 1:1 is 20 units; zoomed out to 2 units per px it is 40.
        assert!((drag_anchor(s, t, 0.0, near_source, 1.0, &cfg()).anchor_pos - 0.1).abs() < EPS);
        assert!((drag_anchor(s, t, 0.0, near_source, 2.0, &cfg()).anchor_pos - 0.2).abs() < EPS);
        assert!((drag_anchor(s, t, 0.0, near_source, 0.5, &cfg()).anchor_pos - 0.05).abs() < EPS);
    }

    #[test]
    fn drag_bounds_hold_every_allowed_curve() {
        let (s, t) = (Point::new(0.0, 0.0), Point::new(200.0, 60.0));
        let bounds = anchor_drag_bounds(s, t, &cfg()).inflate(EPS, EPS);
        for bender in [-10.0, -3.5, 0.0, 2.0, 10.0] {
            let curve = link_curve(s, t, bender, cfg().curvature_ratio);
            assert_eq!(bounds.union(curve.bounding_box()), bounds, "bender {bender}");
        }
    }

    #[test]
    fn anchor_inverts_when_target_precedes_source() {
        let drag = drag_anchor(
            Point::new(200.0, 0.0),
            Point::new(0.0, 0.0),
            0.0,
            Point::new(50.0, 0.0),
            1.0,
            &cfg(),
        );
        assert!((drag.anchor_pos - 0.75).abs() < EPS);
    }

    #[test]
    fn transverse_drag_sets_bender_and_apex_follows_mouse() {
        let (s, t) = (Point::new(0.0, 0.0), Point::new(200.0, 0.0));
        let drag = drag_anchor(s, t, 0.0, Point::new(100.0, 30.0), 1.0, &cfg());
        assert!((drag.bender - 3.0).abs() < EPS);

        let geom = LinkGeometry::new(s, t, drag.bender, 0.5, &cfg());
        assert!((geom.anchor.y - 30.0).abs() < EPS);
    }

    #[test]
    fn bender_is_bounded_and_zero_span_is_straight() {
        let (s, t) = (Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        let drag = drag_anchor(s, t, 0.0, Point::new(50.0, 10_000.0), 1.0, &cfg());
        assert!(drag.bender <= cfg().max_bender + EPS);

        let same = drag_anchor(s, s, 0.0, Point::new(3.0, 4.0), 1.0, &cfg());
        assert_eq!(same.bender, 0.0);
        assert_eq!(same.anchor_pos, 0.5);
    }

    #[test]
    fn path_data_is_compact() {
        let c = link_curve(Point::new(0.0, 0.0), Point::new(10.5, 0.0), 0.0, 0.1);
        assert_eq!(LinkGeometry::path_data(&c), "M0 0 Q5.25 0 10.5 0");
    }
}
