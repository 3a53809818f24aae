//! Hit testing in node-space: point → node, rectangle → nodes, point →
//! link anchor.

use crate::coords::to_kurbo;
use crate::curve::LinkGeometry;
use kurbo::{Rect, Size};
use sk_core::{Link, Node, Palette, Point, Project, SketchConfig, Uid};

/// Icon size of `node`: the type's setting, else the configured default.
pub fn node_size(node: &Node, palette: &Palette, config: &SketchConfig) -> f64 {
    palette
        .item(node.type_id())
        .and_then(|t| t.settings.node_size)
        .unwrap_or(config.node_size)
}

/// The node's icon box, centered on its position.
pub fn node_bounds(node: &Node, palette: &Palette, config: &SketchConfig) -> Rect {
    let size = node_size(node, palette, config);
    Rect::from_center_size(to_kurbo(node.pos()), Size::new(size, size))
}

/// Find the topmost visible node at `p`. Later nodes paint over earlier
/// ones, so the walk runs in reverse paint order.
pub fn hit_node(project: &Project, p: Point, config: &SketchConfig) -> Option<Uid> {
    let p = to_kurbo(p);
    let nodes: Vec<&Node> = project.nodes().collect();
    nodes
        .into_iter()
        .rev()
        .filter(|n| !n.is_hidden())
        .find(|n| node_bounds(n, project.palette(), config).contains(p))
        .map(Node::uid)
}

/// All visible nodes whose box intersects `rect`. Used for marquee
/// selection.
pub fn hit_rect(project: &Project, rect: Rect, config: &SketchConfig) -> Vec<Uid> {
    let r = rect.abs();
    project
        .nodes()
        .filter(|n| !n.is_hidden())
        .filter(|n| {
            let b = node_bounds(n, project.palette(), config);
            b.x0 < r.x1 && b.x1 > r.x0 && b.y0 < r.y1 && b.y1 > r.y0
        })
        .map(Node::uid)
        .collect()
}

/// Geometry of `link`, when both endpoints are present.
pub fn link_geometry(project: &Project, link: &Link, config: &SketchConfig) -> Option<LinkGeometry> {
    let source = project.node(link.source())?;
    let target = project.node(link.target())?;
    Some(LinkGeometry::new(
        source.pos(),
        target.pos(),
        link.bender(),
        link.anchor_pos(),
        config,
    ))
}

/// The link whose label anchor is nearest `p`, within the hit radius.
pub fn hit_anchor(project: &Project, p: Point, config: &SketchConfig) -> Option<Uid> {
    let p = to_kurbo(p);
    project
        .links()
        .filter(|l| !l.is_hidden())
        .filter_map(|l| {
            let geom = link_geometry(project, l, config)?;
            let dist = geom.anchor.distance(p);
            (dist <= config.anchor_hit_radius).then_some((dist, l.uid()))
        })
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, uid)| uid)
}

/// Union of all visible node boxes.
pub fn content_bounds(project: &Project, config: &SketchConfig) -> Option<Rect> {
    project
        .nodes()
        .filter(|n| !n.is_hidden())
        .map(|n| node_bounds(n, project.palette(), config))
        .reduce(|a, b| a.union(b))
}
