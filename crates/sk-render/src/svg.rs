//! SVG fragments for nodes and links, and whole-canvas documents.

use crate::curve::{LinkGeometry, fmt_num};
use crate::detail::detail_for;
use crate::hit::{link_geometry, node_size};
use serde::Serialize;
use sk_core::template::escape_html;
use sk_core::{Link, Node, Palette, Project, SketchConfig, ViewBox};

const ARROW_SIZE: f64 = 8.0;
const LABEL_GAP: f64 = 14.0;

/// What the behavior layer decided a node shows: label text, icon and
/// detail content.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NodeView {
    pub label: String,
    pub icon: String,
    pub detail: Option<String>,
}

impl NodeView {
    /// The view a node gets without any type-specific behavior.
    pub fn default_for(node: &Node, palette: &Palette) -> Self {
        let (node_type, _) = palette.resolve(node.type_id());
        Self {
            label: node.full_label(palette),
            icon: node_type.icon.clone(),
            detail: detail_for(node, node_type, node.expansion()),
        }
    }
}

fn node_classes(node: &Node) -> String {
    let mut classes = vec!["sk-node"];
    classes.push(match node.mode() {
        sk_core::NodeMode::Empty => "sk-empty",
        sk_core::NodeMode::Full => "sk-full",
        sk_core::NodeMode::Special => "sk-special",
    });
    if node.is_selected() {
        classes.push("sk-selected");
    }
    if !node.is_type_resolved() {
        classes.push("sk-unresolved");
    }
    classes.join(" ")
}

/// One node as an SVG `<g>`, positioned in node-space.
pub fn node_fragment(node: &Node, view: &NodeView, palette: &Palette, config: &SketchConfig) -> String {
    let size = node_size(node, palette, config);
    let half = size / 2.0;
    let (node_type, _) = palette.resolve(node.type_id());
    let pos = node.pos();

    let mut svg = format!(
        "<g class=\"{}\" data-uid=\"{}\" transform=\"translate({} {})\">",
        node_classes(node),
        node.uid(),
        fmt_num(pos.x),
        fmt_num(pos.y)
    );
    let dash = if node.is_empty() {
        " stroke-dasharray=\"4 2\""
    } else {
        ""
    };
    svg.push_str(&format!(
        "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" rx=\"{}\" fill=\"{}\"{dash}/>",
        fmt_num(-half),
        fmt_num(-half),
        fmt_num(size),
        fmt_num(size),
        fmt_num(size / 5.0),
        node_type.color().to_hex()
    ));
    if !view.icon.is_empty() {
        let inset = size * 0.15;
        svg.push_str(&format!(
            "<image href=\"{}\" x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\"><title>{}</title></image>",
            escape_html(&view.icon),
            fmt_num(-half + inset),
            fmt_num(-half + inset),
            fmt_num(size - 2.0 * inset),
            fmt_num(size - 2.0 * inset),
            escape_html(&node_type.icon_alt)
        ));
    }
    if !view.label.is_empty() {
        svg.push_str(&format!(
            "<text class=\"sk-label\" y=\"{}\" text-anchor=\"middle\">{}</text>",
            fmt_num(half + LABEL_GAP),
            escape_html(&view.label)
        ));
    }
    if let Some(detail) = view.detail.as_deref() {
        let width = node_type.settings.default_width.unwrap_or(config.detail_width);
        svg.push_str(&format!(
            "<foreignObject class=\"sk-detail\" x=\"{}\" y=\"{}\" width=\"{}\" height=\"1\" style=\"overflow:visible\">\
             <div xmlns=\"http://www.w3.org/1999/xhtml\">{detail}</div></foreignObject>",
            fmt_num(-width / 2.0),
            fmt_num(half + LABEL_GAP + 6.0),
            fmt_num(width)
        ));
    }
    svg.push_str("</g>");
    svg
}

fn points_attr(points: &[kurbo::Point]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", fmt_num(p.x), fmt_num(p.y)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// One link as an SVG `<g>`. `None` when an endpoint is missing.
pub fn link_fragment(link: &Link, project: &Project, config: &SketchConfig) -> Option<String> {
    let geom = link_geometry(project, link, config)?;
    let palette = project.palette();
    let source_half = project
        .node(link.source())
        .map_or(0.0, |n| node_size(n, palette, config) / 2.0);
    let target_half = project
        .node(link.target())
        .map_or(0.0, |n| node_size(n, palette, config) / 2.0);

    let mut classes = String::from("sk-link");
    if link.is_selected() {
        classes.push_str(" sk-selected");
    }
    if link.is_bidirectional() {
        classes.push_str(" sk-bidirectional");
    }
    let mut svg = format!("<g class=\"{classes}\" data-uid=\"{}\">", link.uid());
    let path = geom.trimmed(source_half, target_half);
    svg.push_str(&format!(
        "<path d=\"{}\" fill=\"none\"/>",
        LinkGeometry::path_data(&path)
    ));
    svg.push_str(&format!(
        "<polygon class=\"sk-arrow\" points=\"{}\"/>",
        points_attr(&geom.arrow_head(target_half, ARROW_SIZE))
    ));
    if link.is_bidirectional() {
        let reversed = LinkGeometry {
            curve: kurbo::QuadBez::new(geom.curve.p2, geom.curve.p1, geom.curve.p0),
            anchor: geom.anchor,
        };
        svg.push_str(&format!(
            "<polygon class=\"sk-arrow\" points=\"{}\"/>",
            points_attr(&reversed.arrow_head(source_half, ARROW_SIZE))
        ));
    }
    if !link.label().is_empty() {
        svg.push_str(&format!(
            "<text class=\"sk-link-label\" x=\"{}\" y=\"{}\" text-anchor=\"middle\">{}</text>",
            fmt_num(geom.anchor.x),
            fmt_num(geom.anchor.y),
            escape_html(link.label())
        ));
    }
    svg.push_str(&format!(
        "<circle class=\"sk-anchor\" cx=\"{}\" cy=\"{}\" r=\"4\"/>",
        fmt_num(geom.anchor.x),
        fmt_num(geom.anchor.y)
    ));
    svg.push_str("</g>");
    Some(svg)
}

/// Wrap link and node fragments into a canvas document. Links paint
/// beneath nodes.
pub fn document<'a>(
    view_box: &ViewBox,
    links: impl IntoIterator<Item = &'a str>,
    nodes: impl IntoIterator<Item = &'a str>,
) -> String {
    let mut svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" class=\"sk-canvas\" viewBox=\"{}\">",
        view_box.to_attribute()
    );
    svg.push_str("<g class=\"sk-links\">");
    for fragment in links {
        svg.push_str(fragment);
    }
    svg.push_str("</g><g class=\"sk-nodes\">");
    for fragment in nodes {
        svg.push_str(fragment);
    }
    svg.push_str("</g></svg>");
    svg
}

/// Render the whole project with default node views. Hidden entities are
/// left out.
pub fn render_project(project: &Project, config: &SketchConfig) -> String {
    let palette = project.palette();
    let links: Vec<String> = project
        .links()
        .filter(|l| !l.is_hidden())
        .filter_map(|l| link_fragment(l, project, config))
        .collect();
    let nodes: Vec<String> = project
        .nodes()
        .filter(|n| !n.is_hidden())
        .map(|n| node_fragment(n, &NodeView::default_for(n, palette), palette, config))
        .collect();
    log::trace!("rendered {} nodes, {} links", nodes.len(), links.len());
    document(
        &project.view_box(),
        links.iter().map(String::as_str),
        nodes.iter().map(String::as_str),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sk_core::{NodeType, Point, TypeId};

    fn project() -> Project {
        let mut palette = Palette::new("default");
        let mut thing = NodeType::new(TypeId::intern("thing"), "General");
        thing.icon = "icons/thing.svg".into();
        thing.node_color = Some("#336699".into());
        palette.add_item(thing).unwrap();
        Project::new("P", palette)
    }

    #[test]
    fn node_fragment_escapes_label_and_positions() {
        let mut p = project();
        let a = p.create_full_node(TypeId::intern("thing"), Point::new(12.0, 8.5), "A & B");
        let node = p.node(a).unwrap();
        let svg = node_fragment(node, &NodeView::default_for(node, p.palette()), p.palette(), &SketchConfig::default());
        assert!(svg.starts_with("<g class=\"sk-node sk-full\" data-uid=\"1\" transform=\"translate(12 8.5)\">"));
        assert!(svg.contains("fill=\"#336699\""));
        assert!(svg.contains("href=\"icons/thing.svg\""));
        assert!(svg.contains(">A &amp; B</text>"));
        assert!(!svg.contains("foreignObject"));
    }

    #[test]
    fn hidden_entities_are_not_rendered() {
        let mut p = project();
        let a = p.create_empty_node(TypeId::intern("thing"), Point::new(0.0, 0.0));
        let b = p.create_empty_node(TypeId::intern("thing"), Point::new(100.0, 0.0));
        let l = p.add_full_link(Some(a), b).unwrap();
        let cfg = SketchConfig::default();
        assert!(render_project(&p, &cfg).contains("data-uid=\"3\""));

        p.edit_link(l, |link| link.set_hidden(true));
        p.edit_node(b, |n| n.set_hidden(true));
        let svg = render_project(&p, &cfg);
        assert!(!svg.contains("data-uid=\"3\""));
        assert!(!svg.contains("data-uid=\"2\""));
        assert!(svg.contains("viewBox=\"0 0 1000 800\""));
    }

    #[test]
    fn link_path_stops_at_node_outlines() {
        let mut p = project();
        let a = p.create_empty_node(TypeId::intern("thing"), Point::new(0.0, 0.0));
        let b = p.create_empty_node(TypeId::intern("thing"), Point::new(100.0, 0.0));
        let l = p.add_full_link(Some(a), b).unwrap();
        p.edit_link(l, |link| link.set_label("knows"));
        let svg = link_fragment(p.link(l).unwrap(), &p, &SketchConfig::default()).unwrap();
        assert!(svg.contains("d=\"M20 0 Q50 0 80 0\""), "{svg}");
        assert!(svg.contains(">knows</text>"));
    }
}
