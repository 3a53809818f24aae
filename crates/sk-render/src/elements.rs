//! Live element registry: one rendered record per node and link, kept in
//! step with the project through change events.
//!
//! Change events only mark records dirty; [`ElementRegistry::refresh`]
//! re-renders what is dirty against the current project state.

use crate::svg::{NodeView, document, link_fragment, node_fragment};
use sk_core::{ChangeEvent, NodeChange, Project, ProjectChange, SketchConfig, Uid};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    /// Rendered SVG fragment; empty while hidden.
    pub svg: String,
    pub dirty: bool,
}

#[derive(Debug, Default)]
pub struct ElementRegistry {
    nodes: BTreeMap<Uid, Element>,
    links: BTreeMap<Uid, Element>,
    /// Views assigned by the behavior layer. Nodes without one render with
    /// [`NodeView::default_for`].
    views: BTreeMap<Uid, NodeView>,
    /// Nodes that moved since the last refresh; their links follow.
    moved: BTreeSet<Uid>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every node and link of `project` as dirty.
    pub fn rebuild(&mut self, project: &Project) {
        self.nodes = project.nodes().map(|n| (n.uid(), dirty())).collect();
        self.links = project.links().map(|l| (l.uid(), dirty())).collect();
        self.views.retain(|uid, _| project.node(*uid).is_some());
        self.moved.clear();
    }

    pub fn node(&self, uid: Uid) -> Option<&Element> {
        self.nodes.get(&uid)
    }

    pub fn link(&self, uid: Uid) -> Option<&Element> {
        self.links.get(&uid)
    }

    pub fn view(&self, uid: Uid) -> Option<&NodeView> {
        self.views.get(&uid)
    }

    /// Replace a node's label, icon and detail.
    pub fn set_view(&mut self, uid: Uid, view: NodeView) {
        self.views.insert(uid, view);
        self.mark_node(uid);
    }

    pub fn is_dirty(&self) -> bool {
        self.nodes.values().chain(self.links.values()).any(|e| e.dirty) || !self.moved.is_empty()
    }

    fn mark_node(&mut self, uid: Uid) {
        self.nodes.entry(uid).or_default().dirty = true;
    }

    fn mark_link(&mut self, uid: Uid) {
        self.links.entry(uid).or_default().dirty = true;
    }

    /// React to one change event.
    pub fn apply(&mut self, event: &ChangeEvent) {
        match event {
            ChangeEvent::NodeCreated { uid } => self.mark_node(*uid),
            ChangeEvent::NodeChanged { uid, change } => {
                self.mark_node(*uid);
                if matches!(change, NodeChange::Position { .. } | NodeChange::Hidden { .. }) {
                    self.moved.insert(*uid);
                }
            }
            ChangeEvent::NodeDeleted { uid } => {
                self.nodes.remove(uid);
                self.views.remove(uid);
                self.moved.remove(uid);
            }
            ChangeEvent::LinkCreated { uid, .. } | ChangeEvent::LinkChanged { uid, .. } => {
                self.mark_link(*uid)
            }
            ChangeEvent::LinkDeleted { uid, .. } => {
                self.links.remove(uid);
            }
            ChangeEvent::Project(ProjectChange::Palette { .. }) => {
                for e in self.nodes.values_mut().chain(self.links.values_mut()) {
                    e.dirty = true;
                }
            }
            ChangeEvent::Project(_) => {}
        }
    }

    /// Re-render dirty records. Returns how many were rendered.
    pub fn refresh(&mut self, project: &Project, config: &SketchConfig) -> usize {
        for uid in std::mem::take(&mut self.moved) {
            for link in project.list_all_links(uid) {
                self.mark_link(link.uid());
            }
        }

        let palette = project.palette();
        let mut rendered = 0;
        for (uid, element) in self.nodes.iter_mut().filter(|(_, e)| e.dirty) {
            element.dirty = false;
            let Some(node) = project.node(*uid) else {
                element.svg.clear();
                continue;
            };
            element.svg = if node.is_hidden() {
                String::new()
            } else {
                let default_view;
                let view = match self.views.get(uid) {
                    Some(v) => v,
                    None => {
                        default_view = NodeView::default_for(node, palette);
                        &default_view
                    }
                };
                node_fragment(node, view, palette, config)
            };
            rendered += 1;
        }
        for (uid, element) in self.links.iter_mut().filter(|(_, e)| e.dirty) {
            element.dirty = false;
            element.svg = project
                .link(*uid)
                .filter(|l| !l.is_hidden())
                .and_then(|l| link_fragment(l, project, config))
                .unwrap_or_default();
            rendered += 1;
        }
        log::trace!("element registry: re-rendered {rendered}");
        rendered
    }

    /// The full canvas from the current records.
    pub fn document(&self, project: &Project) -> String {
        document(
            &project.view_box(),
            self.links.values().map(|e| e.svg.as_str()),
            self.nodes.values().map(|e| e.svg.as_str()),
        )
    }
}

fn dirty() -> Element {
    Element {
        svg: String::new(),
        dirty: true,
    }
}
