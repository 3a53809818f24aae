//! Nodes: a [`Data`] record placed on the canvas with a palette type.
//!
//! Display mode (empty / full / special) and expansion (collapsed / table /
//! custom) are independent axes. Adjacency lives in the owning
//! [`Project`](crate::project::Project); a node only knows its own state.

use crate::data::{Data, DataChange, PropertyType};
use crate::diagnostics::{Diagnostic, Subject};
use crate::geometry::Point;
use crate::id::{TypeId, Uid};
use crate::palette::Palette;
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Whether a node has content yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeMode {
    /// Placed but not populated; waiting for a drop or paste.
    #[default]
    Empty,
    Full,
    /// Decorative or control node.
    Special,
}

/// How a node's detail content is shown on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expansion {
    #[default]
    Collapsed,
    Table,
    Custom,
}

impl Expansion {
    /// collapsed → table → custom → collapsed.
    pub fn next(self) -> Self {
        match self {
            Self::Collapsed => Self::Table,
            Self::Table => Self::Custom,
            Self::Custom => Self::Collapsed,
        }
    }
}

/// A completed node mutation with the value it replaced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum NodeChange {
    Data(DataChange),
    Position { previous: Point },
    Mode { previous: NodeMode },
    Expansion { previous: Expansion },
    Type { previous_id: TypeId, previous_name: String },
    Selected { previous: bool },
    Hidden { previous: bool },
    ShowType { previous: bool },
}

impl NodeChange {
    /// The diagnostic a soft-failed property write produced, if any.
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Self::Data(DataChange::Property { diagnostic, .. }) => diagnostic.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    uid: Uid,
    /// The type this node renders with.
    type_id: TypeId,
    /// The type this node asked for; differs from `type_id` after a fallback.
    type_name: String,
    type_resolved: bool,
    pos: Point,
    mode: NodeMode,
    expanded: Expansion,
    selected: bool,
    hidden: bool,
    show_type: bool,
    created: i64,
    user: String,
    data: Data,
    pub(crate) index: NodeIndex,
}

impl Node {
    /// Bind a new node to `requested`, falling back to the palette default.
    pub(crate) fn new(
        uid: Uid,
        requested: &str,
        palette: &Palette,
        mode: NodeMode,
        pos: Point,
        created: i64,
        user: &str,
    ) -> Self {
        let (node_type, resolved) = palette.resolve(TypeId::intern(requested));
        let mut data = Data::default();
        data.bind(Subject::Node(uid));
        Self {
            uid,
            type_id: node_type.id,
            type_name: requested.to_string(),
            type_resolved: resolved,
            pos,
            mode,
            expanded: Expansion::Collapsed,
            selected: false,
            hidden: false,
            show_type: node_type.settings.show_type,
            created,
            user: user.to_string(),
            data,
            index: NodeIndex::end(),
        }
    }

    pub(crate) fn restore(
        mut self,
        expanded: Expansion,
        selected: bool,
        hidden: bool,
        show_type: bool,
        mut data: Data,
    ) -> Self {
        data.bind(Subject::Node(self.uid));
        self.expanded = expanded;
        self.selected = selected;
        self.hidden = hidden;
        self.show_type = show_type;
        self.data = data;
        self
    }

    // ─── Identity & type ─────────────────────────────────────────────────

    pub fn uid(&self) -> Uid {
        self.uid
    }

    pub fn created(&self) -> i64 {
        self.created
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The type name this node was created or switched with, even when the
    /// palette lacks it.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn is_type_resolved(&self) -> bool {
        self.type_resolved
    }

    /// Switch to `id`; a type missing from `palette` binds the default type
    /// and keeps `id` as the requested name.
    pub fn switch_type(&mut self, palette: &Palette, id: TypeId) -> NodeChange {
        let (node_type, resolved) = palette.resolve(id);
        let change = NodeChange::Type {
            previous_id: self.type_id,
            previous_name: std::mem::replace(&mut self.type_name, id.as_str().to_string()),
        };
        self.type_id = node_type.id;
        self.type_resolved = resolved;
        change
    }

    /// Drop the specific type in favour of the palette default.
    pub fn remove_type(&mut self, palette: &Palette) -> NodeChange {
        let default = palette.default_type().id;
        self.switch_type(palette, default)
    }

    /// Re-resolve the requested type against a (possibly different) palette.
    pub(crate) fn rebind(&mut self, palette: &Palette) {
        let (node_type, resolved) = palette.resolve(TypeId::intern(&self.type_name));
        self.type_id = node_type.id;
        self.type_resolved = resolved;
    }

    // ─── Mode & expansion ────────────────────────────────────────────────

    pub fn mode(&self) -> NodeMode {
        self.mode
    }

    pub fn is_empty(&self) -> bool {
        self.mode == NodeMode::Empty
    }

    pub fn is_full(&self) -> bool {
        self.mode == NodeMode::Full
    }

    pub fn is_special(&self) -> bool {
        self.mode == NodeMode::Special
    }

    pub fn set_mode(&mut self, mode: NodeMode) -> Option<NodeChange> {
        (self.mode != mode).then(|| NodeChange::Mode {
            previous: std::mem::replace(&mut self.mode, mode),
        })
    }

    pub fn expansion(&self) -> Expansion {
        self.expanded
    }

    pub fn is_collapsed(&self) -> bool {
        self.expanded == Expansion::Collapsed
    }

    pub fn is_expanded_as_table(&self) -> bool {
        self.expanded == Expansion::Table
    }

    pub fn is_expanded_as_custom(&self) -> bool {
        self.expanded == Expansion::Custom
    }

    fn set_expansion(&mut self, expanded: Expansion) -> Option<NodeChange> {
        (self.expanded != expanded).then(|| NodeChange::Expansion {
            previous: std::mem::replace(&mut self.expanded, expanded),
        })
    }

    pub fn expand_as_table(&mut self) -> Option<NodeChange> {
        self.set_expansion(Expansion::Table)
    }

    pub fn expand_as_custom(&mut self) -> Option<NodeChange> {
        self.set_expansion(Expansion::Custom)
    }

    pub fn collapse(&mut self) -> Option<NodeChange> {
        self.set_expansion(Expansion::Collapsed)
    }

    /// Advance the three-state expansion cycle.
    pub fn expand_or_collapse(&mut self) -> NodeChange {
        let previous = self.expanded;
        self.expanded = previous.next();
        NodeChange::Expansion { previous }
    }

    // ─── Position ────────────────────────────────────────────────────────

    pub fn pos(&self) -> Point {
        self.pos
    }

    pub fn set_pos(&mut self, pos: Point) -> NodeChange {
        NodeChange::Position {
            previous: std::mem::replace(&mut self.pos, pos),
        }
    }

    pub fn move_by(&mut self, dx: f64, dy: f64) -> NodeChange {
        self.set_pos(self.pos.offset(dx, dy))
    }

    // ─── Label & properties ──────────────────────────────────────────────

    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn label(&self) -> &str {
        self.data.label()
    }

    pub fn set_label(&mut self, label: &str) -> Option<NodeChange> {
        self.data.set_label(label).map(NodeChange::Data)
    }

    /// The label as shown on canvas: the type name is appended when the
    /// node shows its type or its type did not resolve.
    pub fn full_label(&self, palette: &Palette) -> String {
        if !self.type_resolved {
            return format!("{} ({})", self.label(), self.type_name);
        }
        if self.show_type {
            let type_label = palette
                .item(self.type_id)
                .map_or(self.type_name.as_str(), |t| t.display_label());
            return format!("{} ({type_label})", self.label());
        }
        self.label().to_string()
    }

    pub fn shows_type(&self) -> bool {
        self.show_type
    }

    pub fn set_show_type(&mut self, show: bool) -> Option<NodeChange> {
        (self.show_type != show).then(|| NodeChange::ShowType {
            previous: std::mem::replace(&mut self.show_type, show),
        })
    }

    pub fn set_property_named(&mut self, name: &str, value: Value, kind: PropertyType) -> NodeChange {
        NodeChange::Data(self.data.set_property_named(name, value, kind))
    }

    pub fn set_normal_property(&mut self, name: &str, value: &str) -> NodeChange {
        NodeChange::Data(self.data.set_normal_property(name, value))
    }

    pub fn set_text_property(&mut self, name: &str, value: &str) -> NodeChange {
        NodeChange::Data(self.data.set_text_property(name, value))
    }

    pub fn set_json_property(&mut self, name: &str, value: Value) -> NodeChange {
        NodeChange::Data(self.data.set_json_property(name, value))
    }

    pub fn remove_property_named(&mut self, name: &str) -> Option<NodeChange> {
        self.data.remove_property_named(name).map(NodeChange::Data)
    }

    pub fn get_property_named(&self, name: &str) -> Option<&Value> {
        self.data.get_property_named(name)
    }

    pub fn get_type_for_property_named(&self, name: &str) -> Option<&PropertyType> {
        self.data.get_type_for_property_named(name)
    }

    pub fn has_property_named(&self, name: &str) -> bool {
        self.data.has_property_named(name)
    }

    // ─── Selection & visibility ──────────────────────────────────────────

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn set_selected(&mut self, selected: bool) -> Option<NodeChange> {
        (self.selected != selected).then(|| NodeChange::Selected {
            previous: std::mem::replace(&mut self.selected, selected),
        })
    }

    pub fn toggle_selected(&mut self) -> NodeChange {
        let previous = self.selected;
        self.selected = !previous;
        NodeChange::Selected { previous }
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn set_hidden(&mut self, hidden: bool) -> Option<NodeChange> {
        (self.hidden != hidden).then(|| NodeChange::Hidden {
            previous: std::mem::replace(&mut self.hidden, hidden),
        })
    }

    pub fn toggle_hidden(&mut self) -> NodeChange {
        let previous = self.hidden;
        self.hidden = !previous;
        NodeChange::Hidden { previous }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.data.diagnostics()
    }

    pub(crate) fn record(&mut self, diagnostic: Diagnostic) {
        self.data.record(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::NodeType;
    use pretty_assertions::assert_eq;

    fn palette() -> Palette {
        let mut p = Palette::new("default");
        p.add_item(NodeType::new(TypeId::intern("thing"), "General"))
            .unwrap();
        p
    }

    fn node(requested: &str) -> Node {
        Node::new(Uid(1), requested, &palette(), NodeMode::Empty, Point::default(), 0, "tester")
    }

    #[test]
    fn three_cycles_return_to_collapsed() {
        let mut n = node("thing");
        assert!(n.is_collapsed());
        n.expand_or_collapse();
        assert!(n.is_expanded_as_table());
        n.expand_or_collapse();
        assert!(n.is_expanded_as_custom());
        n.expand_or_collapse();
        assert!(n.is_collapsed());
    }

    #[test]
    fn mode_and_expansion_are_independent() {
        let mut n = node("thing");
        n.set_mode(NodeMode::Full);
        assert!(n.is_full());
        assert!(n.is_collapsed());
        n.expand_as_custom();
        n.set_mode(NodeMode::Empty);
        assert!(n.is_expanded_as_custom());
        assert!(n.collapse().is_some());
        assert!(n.collapse().is_none());
    }

    #[test]
    fn missing_type_keeps_requested_name() {
        let mut n = node("gadget");
        n.set_label("Widget");
        assert!(!n.is_type_resolved());
        assert_eq!(n.type_id().as_str(), "thing");
        assert_eq!(n.type_name(), "gadget");
        assert_eq!(n.full_label(&palette()), "Widget (gadget)");
    }

    #[test]
    fn show_type_appends_type_label() {
        let mut n = node("thing");
        n.set_label("Box");
        assert_eq!(n.full_label(&palette()), "Box");
        n.set_show_type(true);
        assert_eq!(n.full_label(&palette()), "Box (thing)");
    }

    #[test]
    fn switch_and_remove_type() {
        let mut p = palette();
        p.add_item(NodeType::new(TypeId::intern("person"), "People"))
            .unwrap();
        let mut n = Node::new(Uid(2), "thing", &p, NodeMode::Full, Point::default(), 0, "u");

        let change = n.switch_type(&p, TypeId::intern("person"));
        assert_eq!(
            change,
            NodeChange::Type {
                previous_id: TypeId::intern("thing"),
                previous_name: "thing".into()
            }
        );
        assert_eq!(n.type_id().as_str(), "person");

        n.remove_type(&p);
        assert_eq!(n.type_id(), p.default_type().id);
        assert!(n.is_type_resolved());
    }

    #[test]
    fn json_mismatch_surfaces_in_change() {
        let mut n = node("thing");
        let change = n.set_property_named("cfg", Value::String("not-json".into()), PropertyType::Json);
        let diag = change.diagnostic().expect("recorded");
        assert_eq!(diag.subject, Subject::Node(Uid(1)));
        assert_eq!(n.diagnostics().len(), 1);
        assert_eq!(n.get_property_named("cfg"), Some(&Value::String("not-json".into())));
    }
}
