//! Tunables shared by the render and editor crates.

use crate::error::{Result, SketchError};
use serde::{Deserialize, Serialize};

// ─── Config ───────────────────────────────────────────────────────────────

/// Canvas behavior configuration.
///
/// Every field has a default, so a partial JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SketchConfig {
    /// How long a single click waits for a possible double click, in ms.
    /// Default: **250**.
    pub click_delay_ms: u64,

    /// Deferred single clicks a double click cancels. Default: **2**.
    pub double_click_skip: u32,

    /// Pixels kept clear at both ends of a link when dragging its anchor.
    /// Default: **20**.
    pub anchor_end_buffer: f64,

    /// Relative aspect-ratio drift tolerated when restoring a saved viewBox.
    /// Default: **0.10**.
    pub aspect_tolerance: f64,

    /// Share of a link's longer axis one bender unit offsets the control
    /// point by. Default: **0.10**.
    pub curvature_ratio: f64,

    /// Bender magnitude limit. Default: **10**.
    pub max_bender: f64,

    /// Factor applied per wheel notch. Default: **1.1**.
    pub zoom_step: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,

    /// Icon size when the type sets none, in node-space units. Default: **40**.
    pub node_size: f64,

    /// Width of expanded detail content when the type sets none.
    /// Default: **200**.
    pub detail_width: f64,

    /// Undo snapshots kept. Default: **100**.
    pub undo_depth: usize,

    /// Hit tolerance around a link anchor, in node-space units.
    pub anchor_hit_radius: f64,
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            click_delay_ms: 250,
            double_click_skip: 2,
            anchor_end_buffer: 20.0,
            aspect_tolerance: 0.10,
            curvature_ratio: 0.10,
            max_bender: 10.0,
            zoom_step: 1.1,
            min_zoom: 0.05,
            max_zoom: 20.0,
            node_size: 40.0,
            detail_width: 200.0,
            undo_depth: 100,
            anchor_hit_radius: 8.0,
        }
    }
}

impl SketchConfig {
    /// Parse and [validate](Self::validated) a config.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str::<Self>(json)?.validated()
    }

    /// Reject values the canvas cannot work with and repair the ones with
    /// an obvious reading: a negative `maxBender` means its magnitude, and
    /// swapped zoom bounds are put back in order.
    pub fn validated(mut self) -> Result<Self> {
        let numbers = [
            ("anchorEndBuffer", self.anchor_end_buffer),
            ("aspectTolerance", self.aspect_tolerance),
            ("curvatureRatio", self.curvature_ratio),
            ("maxBender", self.max_bender),
            ("zoomStep", self.zoom_step),
            ("minZoom", self.min_zoom),
            ("maxZoom", self.max_zoom),
            ("nodeSize", self.node_size),
            ("detailWidth", self.detail_width),
            ("anchorHitRadius", self.anchor_hit_radius),
        ];
        if let Some((name, value)) = numbers.iter().find(|(_, v)| !v.is_finite()) {
            return Err(SketchError::InvalidConfig(format!("`{name}` must be a finite number, got {value}")));
        }
        if let Some((name, value)) = numbers.iter().find(|(n, v)| *v < 0.0 && *n != "maxBender") {
            return Err(SketchError::InvalidConfig(format!("`{name}` must not be negative, got {value}")));
        }
        if self.zoom_step <= 0.0 || self.min_zoom <= 0.0 || self.max_zoom <= 0.0 {
            return Err(SketchError::InvalidConfig(
                "`zoomStep`, `minZoom` and `maxZoom` must be positive".into(),
            ));
        }

        if self.max_bender < 0.0 {
            log::warn!("maxBender {} is negative; using its magnitude", self.max_bender);
            self.max_bender = self.max_bender.abs();
        }
        if self.min_zoom > self.max_zoom {
            log::warn!("minZoom {} exceeds maxZoom {}; swapping", self.min_zoom, self.max_zoom);
            std::mem::swap(&mut self.min_zoom, &mut self.max_zoom);
        }
        Ok(self)
    }

    /// Never panics, even on a config that skipped validation.
    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.max(self.min_zoom).min(self.max_zoom)
    }

    pub fn clamp_bender(&self, bender: f64) -> f64 {
        let limit = self.max_bender.abs();
        bender.max(-limit).min(limit)
    }
}
