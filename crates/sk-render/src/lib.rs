pub mod coords;
pub mod curve;
pub mod detail;
pub mod elements;
pub mod hit;
pub mod svg;

pub use coords::{Viewport, default_view_box, restore_saved_view_box};
pub use curve::{AnchorDrag, LinkGeometry, drag_anchor, link_curve};
pub use elements::{Element, ElementRegistry};
pub use hit::{hit_anchor, hit_node, hit_rect};
pub use svg::{NodeView, render_project};

// Re-export kurbo so downstream crates share the same geometry types.
pub use kurbo;
