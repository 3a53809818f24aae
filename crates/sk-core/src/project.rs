//! The project: one palette, the nodes and links placed with it, and the
//! per-project bookkeeping (viewBox, uid counter, extras).
//!
//! The project exclusively owns its nodes and links. Adjacency is kept in a
//! `StableDiGraph` whose node weights are node uids and whose edge weights
//! are link uids; a node's link lists are answered from there and are never
//! ownership. Every mutation goes through a project method so the change
//! events fire in order: entity-level first, then project-level.

use crate::diagnostics::{self, Diagnostic, Subject};
use crate::edit::{LinkEditor, NodeEditor};
use crate::error::{Result, SketchError};
use crate::event::{ChangeEvent, EventBus, ProjectChange, SubscriptionId};
use crate::geometry::{Point, ViewBox};
use crate::id::{TypeId, Uid};
use crate::link::{Link, LinkChange, PartialLink};
use crate::node::{Node, NodeChange, NodeMode};
use crate::palette::Palette;
use petgraph::Direction;
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::EdgeRef;
use serde_json::Value;
use std::collections::BTreeMap;

/// Milliseconds since the Unix epoch, as stored in `created` fields.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Debug)]
pub struct Project {
    pub(crate) name: String,
    pub(crate) owner: Option<String>,
    pub(crate) read_only: bool,
    pub(crate) server_ts: i64,
    pub(crate) palette: Palette,
    /// Kept apart from `palette` so a project still opens when its palette
    /// was renamed or is missing.
    pub(crate) palette_name: String,
    pub(crate) nodes: BTreeMap<Uid, Node>,
    pub(crate) links: BTreeMap<Uid, Link>,
    pub(crate) graph: StableDiGraph<Uid, Uid>,
    pub(crate) uid_counter: u64,
    pub(crate) view_box: ViewBox,
    pub(crate) extras: serde_json::Map<String, Value>,
    pub(crate) user: String,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) events: EventBus,
}

impl Project {
    pub fn new(name: &str, palette: Palette) -> Self {
        Self {
            name: name.to_string(),
            owner: None,
            read_only: false,
            server_ts: 0,
            palette_name: palette.name().to_string(),
            palette,
            nodes: BTreeMap::new(),
            links: BTreeMap::new(),
            graph: StableDiGraph::new(),
            uid_counter: 1,
            view_box: ViewBox::default(),
            extras: serde_json::Map::new(),
            user: String::new(),
            diagnostics: Vec::new(),
            events: EventBus::default(),
        }
    }

    /// Set the user stamped on newly created nodes and links.
    pub fn with_user(mut self, user: &str) -> Self {
        self.user = user.to_string();
        self
    }

    // ─── Metadata ────────────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: &str) {
        let previous = std::mem::replace(&mut self.name, name.to_string());
        self.emit(ChangeEvent::Project(ProjectChange::Renamed { previous }));
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// A read-only project is a snapshot of another user's share.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn server_ts(&self) -> i64 {
        self.server_ts
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Load-time findings. Per-entity findings live on the entities.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    // ─── Events ──────────────────────────────────────────────────────────

    pub fn subscribe(&mut self, listener: impl FnMut(&ChangeEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    fn emit(&mut self, event: ChangeEvent) {
        self.events.emit(&event);
    }

    fn emit_pair(&mut self, entity: ChangeEvent, project: ProjectChange) {
        self.emit(entity);
        self.emit(ChangeEvent::Project(project));
    }

    // ─── Uids ────────────────────────────────────────────────────────────

    /// Allocate a fresh uid. Uids are never reused, even after deletion or
    /// an abandoned partial link.
    pub fn next_uid(&mut self) -> Uid {
        let uid = Uid(self.uid_counter);
        self.uid_counter += 1;
        uid
    }

    /// The next uid that will be handed out.
    pub fn uid_counter(&self) -> u64 {
        self.uid_counter
    }

    // ─── Palette ─────────────────────────────────────────────────────────

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Name of the palette this project was saved with.
    pub fn palette_name(&self) -> &str {
        &self.palette_name
    }

    /// Swap in another palette and rebind every node's type against it.
    pub fn set_palette(&mut self, palette: Palette) {
        let previous = std::mem::replace(&mut self.palette_name, palette.name().to_string());
        self.palette = palette;

        let mut rebound = Vec::new();
        for node in self.nodes.values_mut() {
            let previous_id = node.type_id();
            node.rebind(&self.palette);
            if node.type_id() != previous_id {
                rebound.push((
                    node.uid(),
                    NodeChange::Type {
                        previous_id,
                        previous_name: node.type_name().to_string(),
                    },
                ));
            }
        }
        for (uid, change) in rebound {
            self.emit(ChangeEvent::NodeChanged { uid, change });
        }
        self.emit(ChangeEvent::Project(ProjectChange::Palette { previous }));
    }

    /// Edit the palette in place (e.g. from the palette editor pane).
    pub fn edit_palette<R>(&mut self, edit: impl FnOnce(&mut Palette) -> R) -> R {
        let out = edit(&mut self.palette);
        for node in self.nodes.values_mut() {
            node.rebind(&self.palette);
        }
        let previous = self.palette_name.clone();
        self.emit(ChangeEvent::Project(ProjectChange::Palette { previous }));
        out
    }

    // ─── Lookups ─────────────────────────────────────────────────────────

    pub fn node(&self, uid: Uid) -> Option<&Node> {
        self.nodes.get(&uid)
    }

    pub fn link(&self, uid: Uid) -> Option<&Link> {
        self.links.get(&uid)
    }

    /// Nodes in uid order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Links in uid order.
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Nodes, optionally only those whose bound or requested type is
    /// `type_name`.
    pub fn list_nodes(&self, type_name: Option<&str>) -> Vec<&Node> {
        self.nodes
            .values()
            .filter(|n| {
                type_name.is_none_or(|t| n.type_name() == t || n.type_id().as_str() == t)
            })
            .collect()
    }

    /// Links, optionally only those whose source node has type `type_name`.
    pub fn list_links(&self, type_name: Option<&str>) -> Vec<&Link> {
        self.links
            .values()
            .filter(|l| {
                type_name.is_none_or(|t| {
                    self.node(l.source())
                        .is_some_and(|n| n.type_name() == t || n.type_id().as_str() == t)
                })
            })
            .collect()
    }

    pub fn selected_nodes(&self) -> Vec<Uid> {
        self.nodes
            .values()
            .filter(|n| n.is_selected())
            .map(Node::uid)
            .collect()
    }

    pub fn selected_links(&self) -> Vec<Uid> {
        self.links
            .values()
            .filter(|l| l.is_selected())
            .map(Link::uid)
            .collect()
    }

    // ─── Node lifecycle ──────────────────────────────────────────────────

    /// Place a new node of `node_type`. A type missing from the palette
    /// binds the default type; full nodes are seeded with the type's schema
    /// properties.
    pub fn add_node(&mut self, node_type: TypeId, mode: NodeMode, pos: Point) -> Uid {
        self.spawn_node(node_type, mode, pos, "")
    }

    /// Build, insert and announce a node. The label is in place before
    /// [`ChangeEvent::NodeCreated`] goes out.
    fn spawn_node(&mut self, node_type: TypeId, mode: NodeMode, pos: Point, label: &str) -> Uid {
        let uid = self.next_uid();
        let mut node = Node::new(
            uid,
            node_type.as_str(),
            &self.palette,
            mode,
            pos,
            now_millis(),
            &self.user,
        );
        if mode == NodeMode::Full {
            for (name, prop) in self.palette.schema_properties(node.type_id()) {
                node.set_property_named(&name, prop.value, prop.kind);
            }
        }
        node.set_label(label);
        self.insert_node(node);
        self.emit_pair(
            ChangeEvent::NodeCreated { uid },
            ProjectChange::NodeAdded(uid),
        );
        uid
    }

    pub(crate) fn insert_node(&mut self, mut node: Node) {
        let uid = node.uid();
        node.index = self.graph.add_node(uid);
        if let Some(old) = self.nodes.insert(uid, node) {
            self.graph.remove_node(old.index);
            self.diagnostics.push(Diagnostic::error(
                Subject::Node(uid),
                diagnostics::ADJACENCY_OVERWRITE,
                "a second node with this uid replaced the first",
            ));
        }
    }

    pub fn create_empty_node(&mut self, node_type: TypeId, pos: Point) -> Uid {
        self.add_node(node_type, NodeMode::Empty, pos)
    }

    pub fn create_full_node(&mut self, node_type: TypeId, pos: Point, label: &str) -> Uid {
        self.spawn_node(node_type, NodeMode::Full, pos, label)
    }

    pub fn create_special_node(&mut self, node_type: TypeId, pos: Point) -> Uid {
        self.add_node(node_type, NodeMode::Special, pos)
    }

    /// Delete a node and, first, every link touching it.
    pub fn delete_node(&mut self, uid: Uid) -> Result<Node> {
        let index = self.nodes.get(&uid).ok_or(SketchError::UnknownNode(uid))?.index;

        let mut touching: Vec<Uid> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .chain(self.graph.edges_directed(index, Direction::Incoming))
            .map(|e| *e.weight())
            .collect();
        // Unindexed links (dangling from a damaged file) are found by scan.
        touching.extend(
            self.links
                .values()
                .filter(|l| l.touches(uid) && !self.is_link_indexed(l.uid()))
                .map(Link::uid),
        );
        touching.sort();
        touching.dedup();
        for link in touching {
            self.delete_link(link)?;
        }

        self.graph.remove_node(index);
        let node = self.nodes.remove(&uid).ok_or(SketchError::UnknownNode(uid))?;
        self.emit_pair(
            ChangeEvent::NodeDeleted { uid },
            ProjectChange::NodeDeleted(uid),
        );
        Ok(node)
    }

    /// Apply a mutation to one node and emit every change it made.
    ///
    /// Returns the last change; `None` when nothing changed, in which case
    /// nothing is emitted.
    pub fn edit_node<R>(&mut self, uid: Uid, edit: impl FnOnce(&mut NodeEditor<'_>) -> R) -> Option<NodeChange> {
        let mut editor = NodeEditor::new(self.nodes.get_mut(&uid)?);
        edit(&mut editor);
        let changes = editor.into_changes();
        let last = changes.last().cloned();
        for change in changes {
            self.emit_pair(
                ChangeEvent::NodeChanged { uid, change },
                ProjectChange::NodeUpdated(uid),
            );
        }
        last
    }

    /// Switch a node's type against this project's palette.
    pub fn switch_node_type(&mut self, uid: Uid, node_type: TypeId) -> Option<NodeChange> {
        let palette = &self.palette;
        let change = self.nodes.get_mut(&uid)?.switch_type(palette, node_type);
        self.emit_pair(
            ChangeEvent::NodeChanged {
                uid,
                change: change.clone(),
            },
            ProjectChange::NodeUpdated(uid),
        );
        Some(change)
    }

    /// Fall a node back to the palette's default type.
    pub fn remove_node_type(&mut self, uid: Uid) -> Option<NodeChange> {
        let default = self.palette.default_type().id;
        self.switch_node_type(uid, default)
    }

    // ─── Link lifecycle ──────────────────────────────────────────────────

    /// Link two known nodes directly.
    pub fn add_full_link(&mut self, source: Option<Uid>, target: Uid) -> Result<Uid> {
        let partial = self.start_partial_link(source)?;
        self.finish_partial_link(partial, target)
    }

    /// Begin drawing a link from `source`. The partial link is not part of
    /// the project until [`Project::finish_partial_link`].
    pub fn start_partial_link(&mut self, source: Option<Uid>) -> Result<PartialLink> {
        let source = source.ok_or(SketchError::LinkWithoutSource)?;
        if !self.nodes.contains_key(&source) {
            return Err(SketchError::UnknownNode(source));
        }
        let uid = self.next_uid();
        PartialLink::new(uid, Some(source), now_millis(), &self.user)
    }

    /// Bind the target of a partial link and add it to the project.
    pub fn finish_partial_link(&mut self, partial: PartialLink, target: Uid) -> Result<Uid> {
        for end in [partial.source(), target] {
            if !self.nodes.contains_key(&end) {
                return Err(SketchError::UnknownNode(end));
            }
        }
        let source = partial.source();
        let link = partial.complete(target);
        let uid = link.uid();
        self.insert_link(link);
        self.emit_pair(
            ChangeEvent::LinkCreated {
                uid,
                source,
                target,
            },
            ProjectChange::LinkAdded(uid),
        );
        Ok(uid)
    }

    /// Store a link and index it between its endpoints. A link whose
    /// endpoints do not resolve is kept, unindexed, with a diagnostic.
    pub(crate) fn insert_link(&mut self, mut link: Link) {
        let uid = link.uid();
        let endpoints = (
            self.nodes.get(&link.source()).map(|n| n.index),
            self.nodes.get(&link.target()).map(|n| n.index),
        );
        match endpoints {
            (Some(from), Some(to)) => link.edge = self.graph.add_edge(from, to, uid),
            (from, _) => {
                let missing = if from.is_none() { link.source() } else { link.target() };
                let diag = Diagnostic::error(
                    Subject::Link(uid),
                    diagnostics::UNRESOLVED_ENDPOINT,
                    format!("endpoint node {missing} is not in the project"),
                );
                link.record(diag.clone());
                self.diagnostics.push(diag);
            }
        }
        if let Some(old) = self.links.insert(uid, link) {
            if self.graph.edge_weight(old.edge) == Some(&uid) {
                self.graph.remove_edge(old.edge);
            }
            self.diagnostics.push(Diagnostic::error(
                Subject::Link(uid),
                diagnostics::ADJACENCY_OVERWRITE,
                "a second link with this uid replaced the first",
            ));
        }
    }

    /// Remove a link, detaching it from both endpoints.
    pub fn delete_link(&mut self, uid: Uid) -> Result<Link> {
        let link = self.links.remove(&uid).ok_or(SketchError::UnknownLink(uid))?;
        if self.graph.edge_weight(link.edge) == Some(&uid) {
            self.graph.remove_edge(link.edge);
        }
        self.emit_pair(
            ChangeEvent::LinkDeleted {
                uid,
                source: link.source(),
                target: link.target(),
            },
            ProjectChange::LinkDeleted(uid),
        );
        Ok(link)
    }

    /// Apply a mutation to one link and emit every change it made.
    pub fn edit_link<R>(&mut self, uid: Uid, edit: impl FnOnce(&mut LinkEditor<'_>) -> R) -> Option<LinkChange> {
        let mut editor = LinkEditor::new(self.links.get_mut(&uid)?);
        edit(&mut editor);
        let changes = editor.into_changes();
        let last = changes.last().cloned();
        for change in changes {
            self.emit_pair(
                ChangeEvent::LinkChanged { uid, change },
                ProjectChange::LinkUpdated(uid),
            );
        }
        last
    }

    /// Whether the link is present in its endpoints' adjacency.
    pub fn is_link_indexed(&self, uid: Uid) -> bool {
        self.links
            .get(&uid)
            .is_some_and(|l| self.graph.edge_weight(l.edge) == Some(&uid))
    }

    // ─── Adjacency ───────────────────────────────────────────────────────

    fn adjacent(&self, uid: Uid, direction: Direction) -> Vec<&Link> {
        let Some(node) = self.nodes.get(&uid) else {
            return Vec::new();
        };
        let mut out: Vec<&Link> = self
            .graph
            .edges_directed(node.index, direction)
            .filter_map(|e| self.links.get(e.weight()))
            .collect();
        out.sort_by_key(|l| l.uid());
        out
    }

    /// Directed links leaving `uid`; bidirectional links are excluded.
    pub fn list_outgoing_links(&self, uid: Uid) -> Vec<&Link> {
        let mut links = self.adjacent(uid, Direction::Outgoing);
        links.retain(|l| !l.is_bidirectional());
        links
    }

    /// Directed links arriving at `uid`; bidirectional links are excluded.
    pub fn list_incoming_links(&self, uid: Uid) -> Vec<&Link> {
        let mut links = self.adjacent(uid, Direction::Incoming);
        links.retain(|l| !l.is_bidirectional());
        links
    }

    /// Every link touching `uid`, bidirectional ones included.
    pub fn list_all_links(&self, uid: Uid) -> Vec<&Link> {
        let mut links = self.adjacent(uid, Direction::Outgoing);
        links.extend(self.adjacent(uid, Direction::Incoming));
        links.sort_by_key(|l| l.uid());
        links.dedup_by_key(|l| l.uid());
        links
    }

    /// Whether any link joins `a` and `b`, in either direction.
    pub fn is_linked_to(&self, a: Uid, b: Uid) -> bool {
        self.list_all_links(a)
            .iter()
            .any(|l| l.other_node(a) == Some(b))
    }

    // ─── Selection helpers ───────────────────────────────────────────────

    /// Deselect every node and link.
    pub fn clear_selection(&mut self) {
        for uid in self.selected_nodes() {
            self.edit_node(uid, |n| n.set_selected(false));
        }
        for uid in self.selected_links() {
            self.edit_link(uid, |l| l.set_selected(false));
        }
    }

    // ─── ViewBox ─────────────────────────────────────────────────────────

    pub fn view_box(&self) -> ViewBox {
        self.view_box
    }

    pub fn set_view_box(&mut self, view_box: ViewBox) {
        if view_box == self.view_box {
            return;
        }
        let previous = std::mem::replace(&mut self.view_box, view_box);
        self.emit(ChangeEvent::Project(ProjectChange::ViewBox { previous }));
    }

    // ─── Extras ──────────────────────────────────────────────────────────

    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extras.get(key)
    }

    pub fn extras(&self) -> &serde_json::Map<String, Value> {
        &self.extras
    }

    pub fn set_extra(&mut self, key: &str, value: Value) {
        let previous = self.extras.insert(key.to_string(), value);
        self.emit(ChangeEvent::Project(ProjectChange::Extras {
            key: key.to_string(),
            previous,
        }));
    }

    pub fn remove_extra(&mut self, key: &str) -> Option<Value> {
        let previous = self.extras.remove(key)?;
        self.emit(ChangeEvent::Project(ProjectChange::Extras {
            key: key.to_string(),
            previous: Some(previous.clone()),
        }));
        Some(previous)
    }

    /// Append to the list stored under `key`, creating it when missing.
    /// A non-list value already there becomes the list's first element.
    pub fn append_extra(&mut self, key: &str, value: Value) {
        let previous = self.extras.get(key).cloned();
        let list = match previous.clone() {
            Some(Value::Array(mut items)) => {
                items.push(value);
                items
            }
            Some(other) => vec![other, value],
            None => vec![value],
        };
        self.extras.insert(key.to_string(), Value::Array(list));
        self.emit(ChangeEvent::Project(ProjectChange::Extras {
            key: key.to_string(),
            previous,
        }));
    }

    /// The list stored under `key`; empty when missing or not a list.
    pub fn extra_list(&self, key: &str) -> &[Value] {
        match self.extras.get(key) {
            Some(Value::Array(items)) => items,
            _ => &[],
        }
    }

    /// Re-derive structural diagnostics; see [`diagnostics::check_project`].
    pub fn check(&self) -> Vec<Diagnostic> {
        diagnostics::check_project(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::NodeType;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn thing() -> TypeId {
        TypeId::intern("thing")
    }

    fn project() -> Project {
        let mut palette = Palette::new("default");
        palette.add_item(NodeType::new(thing(), "General")).unwrap();
        Project::new("P1", palette).with_user("tester")
    }

    #[test]
    fn uids_are_strictly_increasing() {
        let mut p = project();
        let a = p.create_empty_node(thing(), Point::new(0.0, 0.0));
        let partial = p.start_partial_link(Some(a)).unwrap();
        drop(partial);
        let b = p.create_empty_node(thing(), Point::new(0.0, 0.0));
        assert!(b > a);
        assert_eq!(b.get(), a.get() + 2);
        p.delete_node(b).unwrap();
        let c = p.create_empty_node(thing(), Point::new(0.0, 0.0));
        assert!(c > b);
    }

    #[test]
    fn link_lists_split_by_direction() {
        let mut p = project();
        let a = p.create_empty_node(thing(), Point::new(0.0, 0.0));
        let b = p.create_empty_node(thing(), Point::new(100.0, 100.0));
        let l = p.add_full_link(Some(a), b).unwrap();

        let uids = |links: Vec<&Link>| links.iter().map(|l| l.uid()).collect::<Vec<_>>();
        assert_eq!(uids(p.list_outgoing_links(a)), vec![l]);
        assert_eq!(uids(p.list_incoming_links(b)), vec![l]);
        assert!(p.list_incoming_links(a).is_empty());
        assert!(p.is_linked_to(b, a));

        p.edit_link(l, |link| link.set_bidirectional(true));
        assert!(p.list_outgoing_links(a).is_empty());
        assert!(p.list_incoming_links(b).is_empty());
        assert_eq!(uids(p.list_all_links(a)), vec![l]);
        assert_eq!(uids(p.list_all_links(b)), vec![l]);
    }

    #[test]
    fn deleting_a_node_cascades_to_links() {
        let mut p = project();
        let a = p.create_empty_node(thing(), Point::new(0.0, 0.0));
        let b = p.create_empty_node(thing(), Point::new(100.0, 100.0));
        let c = p.create_empty_node(thing(), Point::new(50.0, 0.0));
        p.add_full_link(Some(a), b).unwrap();
        p.add_full_link(Some(c), a).unwrap();
        let bc = p.add_full_link(Some(b), c).unwrap();

        p.delete_node(a).unwrap();
        assert_eq!(p.link_count(), 1);
        assert!(p.links().all(|l| !l.touches(a)));
        assert_eq!(p.list_all_links(b).len(), 1);
        assert_eq!(p.list_all_links(b)[0].uid(), bc);
        assert!(p.check().is_empty());
    }

    #[test]
    fn link_construction_validates_endpoints() {
        let mut p = project();
        let a = p.create_empty_node(thing(), Point::default());
        assert!(matches!(
            p.add_full_link(None, a),
            Err(SketchError::LinkWithoutSource)
        ));
        assert!(matches!(
            p.add_full_link(Some(a), Uid(999)),
            Err(SketchError::UnknownNode(Uid(999)))
        ));
        assert_eq!(p.link_count(), 0);
    }

    #[test]
    fn events_fire_entity_then_project() {
        let mut p = project();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        p.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        let a = p.create_empty_node(thing(), Point::default());
        p.edit_node(a, |n| n.set_label("Alpha"));
        p.edit_node(a, |n| n.set_label("")); // no-op, no events

        let seen = seen.borrow();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0], ChangeEvent::NodeCreated { uid: a });
        assert_eq!(seen[1], ChangeEvent::Project(ProjectChange::NodeAdded(a)));
        assert!(matches!(
            &seen[2],
            ChangeEvent::NodeChanged { change: NodeChange::Data(_), .. }
        ));
        assert_eq!(seen[3], ChangeEvent::Project(ProjectChange::NodeUpdated(a)));
    }

    #[test]
    fn full_node_is_labelled_when_announced() {
        let mut p = project();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        p.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        let uid = p.create_full_node(thing(), Point::default(), "Ada");
        assert_eq!(p.node(uid).unwrap().label(), "Ada");
        assert_eq!(
            *seen.borrow(),
            vec![
                ChangeEvent::NodeCreated { uid },
                ChangeEvent::Project(ProjectChange::NodeAdded(uid)),
            ]
        );
    }

    #[test]
    fn every_change_in_one_edit_is_announced() {
        let mut p = project();
        let a = p.create_empty_node(thing(), Point::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        p.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        let last = p.edit_node(a, |n| {
            n.set_label("Alpha");
            n.move_by(5.0, 0.0);
            n.set_hidden(true)
        });
        assert!(matches!(last, Some(NodeChange::Hidden { .. })), "{last:?}");

        let changes: Vec<_> = seen
            .borrow()
            .iter()
            .filter_map(|e| match e {
                ChangeEvent::NodeChanged { change, .. } => Some(change.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(changes.len(), 3);
        assert!(matches!(changes[0], NodeChange::Data(_)));
        assert!(matches!(changes[1], NodeChange::Position { .. }));
        assert_eq!(seen.borrow().len(), 6);
    }

    #[test]
    fn full_nodes_are_seeded_from_schema() {
        let mut p = project();
        p.edit_palette(|palette| {
            palette.update_item(thing(), |t| {
                let mut schema = crate::schema::TypeSchema::default();
                schema.properties.insert(
                    "status".into(),
                    crate::data::Property::new(json!("new"), crate::data::PropertyType::Normal),
                );
                t.schema = Some(schema);
            })
        })
        .unwrap();

        let full = p.create_full_node(thing(), Point::default(), "Task");
        let empty = p.create_empty_node(thing(), Point::default());
        assert_eq!(p.node(full).unwrap().get_property_named("status"), Some(&json!("new")));
        assert_eq!(p.node(full).unwrap().label(), "Task");
        assert!(!p.node(empty).unwrap().has_property_named("status"));
    }

    #[test]
    fn set_palette_rebinds_and_keeps_requested_type() {
        let mut p = project();
        let a = p.create_empty_node(thing(), Point::default());

        let mut other = Palette::new("other");
        other
            .add_item(NodeType::new(TypeId::intern("note"), "General"))
            .unwrap();
        p.set_palette(other);
        let node = p.node(a).unwrap();
        assert_eq!(p.palette_name(), "other");
        assert!(!node.is_type_resolved());
        assert_eq!(node.type_id().as_str(), "note");
        assert_eq!(node.type_name(), "thing");

        p.set_palette(project().palette().clone());
        assert!(p.node(a).unwrap().is_type_resolved());
        assert_eq!(p.list_nodes(Some("thing")).len(), 1);
    }

    #[test]
    fn extras_append_builds_lists() {
        let mut p = project();
        p.append_extra("history", json!("one"));
        p.append_extra("history", json!("two"));
        assert_eq!(p.extra_list("history"), &[json!("one"), json!("two")]);

        p.set_extra("mode", json!("dark"));
        p.append_extra("mode", json!("light"));
        assert_eq!(p.extra("mode"), Some(&json!(["dark", "light"])));
        assert_eq!(p.remove_extra("mode"), Some(json!(["dark", "light"])));
        assert!(p.extra_list("missing").is_empty());
    }

    #[test]
    fn clear_selection_deselects_everything() {
        let mut p = project();
        let a = p.create_empty_node(thing(), Point::default());
        let b = p.create_empty_node(thing(), Point::default());
        let l = p.add_full_link(Some(a), b).unwrap();
        p.edit_node(a, |n| n.set_selected(true));
        p.edit_link(l, |l| l.set_selected(true));
        assert_eq!(p.selected_nodes(), vec![a]);

        p.clear_selection();
        assert!(p.selected_nodes().is_empty());
        assert!(p.selected_links().is_empty());
    }
}
