//! Canvas interaction controller.
//!
//! Owns the open project together with everything an editing session
//! needs around it: viewport, behaviors, element registry, session state,
//! click debouncing, undo history and toasts. Input arrives as
//! [`InputEvent`]s in screen-space; every handler returns whether the
//! canvas needs repainting.
//!
//! ## Pointer gestures
//!
//! | Pointer down on | Select tool | Link tool |
//! |-----------------|-------------|-----------|
//! | **Link anchor** | Drag anchor | Drag anchor |
//! | **Node** | Select, drag selection | Start drawing a link |
//! | **Background** | Pan (Shift: marquee) | Pan (Shift: marquee) |

use crate::clicks::{Click, ClickDebouncer};
use crate::commands::CommandStack;
use crate::hooks::{Dispatcher, Hook, TypeBehavior};
use crate::input::{InputEvent, Modifiers, Payload};
use crate::session::{DragState, Session};
use crate::shortcuts::ShortcutAction;
use crate::toast::{Toast, Toasts};
use sk_core::{
    ChangeEvent, HandleLevel, NodeChange, NodeEditor, NodeMode, Point, Project, ProjectChange, PropertyType,
    SketchConfig, SubscriptionId, TypeId, Uid,
};
use sk_render::coords::{from_kurbo, to_kurbo};
use sk_render::hit::content_bounds;
use sk_render::kurbo::{self, BezPath, Rect, Vec2};
use sk_render::{ElementRegistry, NodeView, Viewport, drag_anchor, hit_anchor, hit_node, hit_rect};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

/// Hook-driven edits can cascade; the pump gives up after this many rounds.
const MAX_PUMP_ROUNDS: usize = 8;
const FIT_PADDING: f64 = 40.0;

/// How pointer-down on a node is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Select,
    Link,
}

impl ToolKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Link => "link",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "select" => Some(Self::Select),
            "link" => Some(Self::Link),
            _ => None,
        }
    }
}

/// Result of a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyOutcome {
    pub action: Option<ShortcutAction>,
    pub changed: bool,
}

type EventQueue = Rc<RefCell<Vec<ChangeEvent>>>;

pub struct CanvasController {
    project: Project,
    config: SketchConfig,
    viewport: Viewport,
    dispatcher: Dispatcher,
    elements: ElementRegistry,
    session: Session,
    clicks: ClickDebouncer,
    commands: CommandStack,
    toasts: Toasts,
    events: EventQueue,
    subscription: SubscriptionId,
    tool: ToolKind,
    /// The last gesture moved; the click the browser sends after it is
    /// not a click.
    suppress_click: bool,
    /// The read-only notice was shown for the open project.
    read_only_noted: bool,
    /// Nodes whose view was just set by a hook; the next pump leaves them.
    fresh: BTreeSet<Uid>,
}

fn subscribe(project: &mut Project) -> (EventQueue, SubscriptionId) {
    let events: EventQueue = Rc::default();
    let sink = events.clone();
    let id = project.subscribe(move |e| sink.borrow_mut().push(e.clone()));
    (events, id)
}

/// Endpoint positions and bender of a link.
fn link_ends(project: &Project, link: Uid) -> Option<(Point, Point, f64)> {
    let link = project.link(link)?;
    let source = project.node(link.source())?.pos();
    let target = project.node(link.target())?.pos();
    Some((source, target, link.bender()))
}

/// Node changes that can alter label, icon or detail.
fn needs_refresh(change: &NodeChange) -> bool {
    matches!(
        change,
        NodeChange::Data(_)
            | NodeChange::Mode { .. }
            | NodeChange::Expansion { .. }
            | NodeChange::Type { .. }
            | NodeChange::ShowType { .. }
    )
}

impl CanvasController {
    pub fn new(mut project: Project, screen: Rect, config: SketchConfig) -> Self {
        let (events, subscription) = subscribe(&mut project);
        let viewport = Viewport::restore(screen, project.view_box(), &config);
        let session = Session::new(project.user());
        let mut controller = Self {
            clicks: ClickDebouncer::from_config(&config),
            commands: CommandStack::new(config.undo_depth),
            project,
            config,
            viewport,
            dispatcher: Dispatcher::new(),
            elements: ElementRegistry::new(),
            session,
            toasts: Toasts::default(),
            events,
            subscription,
            tool: ToolKind::Select,
            suppress_click: false,
            read_only_noted: false,
            fresh: BTreeSet::new(),
        };
        controller.attach();
        controller
    }

    /// Replace the open project. History and gesture state are dropped.
    pub fn load(&mut self, mut project: Project) {
        self.project.unsubscribe(self.subscription);
        let (events, subscription) = subscribe(&mut project);
        self.events = events;
        self.subscription = subscription;
        self.viewport = Viewport::restore(self.viewport.screen, project.view_box(), &self.config);
        self.session = Session::new(project.user());
        self.project = project;
        self.commands.clear();
        self.clicks.cancel();
        self.read_only_noted = false;
        self.attach();
    }

    /// Register every element and run the add-existing hook for each node.
    fn attach(&mut self) {
        self.elements.rebuild(&self.project);
        for (uid, view) in self.dispatcher.attach_all(&mut self.project) {
            self.show(uid, view);
        }
        self.pump();
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn config(&self) -> &SketchConfig {
        &self.config
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn elements(&self) -> &ElementRegistry {
        &self.elements
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    pub fn set_tool(&mut self, tool: ToolKind) {
        self.tool = tool;
    }

    pub fn take_toasts(&mut self) -> Vec<Toast> {
        self.toasts.drain()
    }

    pub fn can_undo(&self) -> bool {
        self.commands.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.commands.can_redo()
    }

    /// Register a behavior for a type and refresh the nodes using it.
    pub fn register_behavior(&mut self, id: TypeId, behavior: impl TypeBehavior + 'static) {
        self.dispatcher.register(id, behavior);
        let uids: Vec<Uid> = self
            .project
            .nodes()
            .filter(|n| n.type_id() == id)
            .map(|n| n.uid())
            .collect();
        for uid in uids {
            self.refresh_node(uid);
        }
        self.pump();
    }

    // ─── Event plumbing ──────────────────────────────────────────────────

    fn show(&mut self, uid: Uid, view: NodeView) {
        self.elements.set_view(uid, view);
        self.fresh.insert(uid);
    }

    fn refresh_node(&mut self, uid: Uid) {
        if let Some(view) = self
            .dispatcher
            .dispatch(Hook::Refresh, &mut self.project, uid, None, None)
        {
            self.elements.set_view(uid, view);
        }
    }

    /// Feed queued change events to the element registry and refresh nodes
    /// whose content changed.
    fn pump(&mut self) {
        for _ in 0..MAX_PUMP_ROUNDS {
            let events = std::mem::take(&mut *self.events.borrow_mut());
            if events.is_empty() {
                self.fresh.clear();
                return;
            }
            let mut stale = BTreeSet::new();
            for event in &events {
                self.elements.apply(event);
                match event {
                    ChangeEvent::NodeChanged { uid, change } if needs_refresh(change) => {
                        stale.insert(*uid);
                    }
                    ChangeEvent::Project(ProjectChange::Palette { .. }) => {
                        stale.extend(self.project.nodes().map(|n| n.uid()));
                    }
                    _ => {}
                }
            }
            for uid in std::mem::take(&mut self.fresh) {
                stale.remove(&uid);
            }
            for uid in stale {
                self.refresh_node(uid);
            }
        }
        log::debug!("change events still queued after {MAX_PUMP_ROUNDS} rounds");
        self.fresh.clear();
    }

    /// False on a read-only project. The user is told once per project.
    fn editable(&mut self) -> bool {
        if !self.project.is_read_only() {
            return true;
        }
        if !std::mem::replace(&mut self.read_only_noted, true) {
            self.toasts.warn(format!("\"{}\" is read-only", self.project.name()));
        }
        false
    }

    /// End the drag in progress, if any. A node or anchor drag closes its
    /// undo batch, so a press that never got its release cannot leave
    /// history stuck in batch mode.
    fn finish_drag(&mut self) -> Option<DragState> {
        let drag = self.session.end_drag()?;
        if matches!(drag, DragState::Node { .. } | DragState::Anchor { .. }) {
            self.commands.end_batch(&self.project);
        }
        Some(drag)
    }

    // ─── Input ───────────────────────────────────────────────────────────

    /// Handle one input event. Returns true if the canvas needs repainting.
    pub fn handle(&mut self, event: &InputEvent) -> bool {
        match event {
            InputEvent::PointerDown { x, y, modifiers } => {
                self.pointer_down(kurbo::Point::new(*x, *y), *modifiers)
            }
            InputEvent::PointerMove { x, y, .. } => self.pointer_move(kurbo::Point::new(*x, *y)),
            InputEvent::PointerUp { x, y, modifiers } => {
                self.pointer_up(kurbo::Point::new(*x, *y), *modifiers)
            }
            InputEvent::Wheel { x, y, delta_y } => self.wheel(kurbo::Point::new(*x, *y), *delta_y),
            InputEvent::Drop { x, y, payload } => {
                self.drop_payload(kurbo::Point::new(*x, *y), payload, Some(event))
            }
            InputEvent::Paste { payload } => self.paste(payload, Some(event)),
            InputEvent::Key { key, modifiers } => self.key(key, *modifiers).changed,
        }
    }

    fn pointer_down(&mut self, p: kurbo::Point, modifiers: Modifiers) -> bool {
        let at = self.viewport.screen_to_node(p);
        self.suppress_click = false;
        if let Some(stale) = self.finish_drag() {
            log::debug!("pointer-up for {stale:?} never arrived");
        }

        if self.tool == ToolKind::Link
            && let Some(source) = hit_node(&self.project, at, &self.config)
        {
            if self.editable() {
                match self.project.start_partial_link(Some(source)) {
                    Ok(partial) => self.session.start_link(partial, at),
                    Err(e) => self.toasts.warn(format!("Cannot start a link: {e}")),
                }
            }
            return true;
        }

        if !self.project.is_read_only()
            && let Some(link) = hit_anchor(&self.project, at, &self.config)
        {
            if !modifiers.shift {
                self.project.clear_selection();
            }
            self.project.edit_link(link, |l| l.set_selected(true));
            self.commands.begin_batch(&self.project, "move link anchor");
            self.session.begin_drag(DragState::Anchor { link });
            self.pump();
            return true;
        }

        if let Some(uid) = hit_node(&self.project, at, &self.config) {
            let selected = self.project.node(uid).is_some_and(|n| n.is_selected());
            if modifiers.shift {
                self.project.edit_node(uid, |n| n.toggle_selected());
            } else if !selected {
                self.project.clear_selection();
                self.project.edit_node(uid, |n| n.set_selected(true));
            }
            if !self.project.is_read_only() {
                self.commands.begin_batch(&self.project, "move nodes");
                self.session.begin_drag(DragState::Node {
                    grabbed: uid,
                    last: p,
                    moved: false,
                });
            }
        } else if modifiers.shift {
            self.session.begin_drag(DragState::Marquee {
                start: p,
                current: p,
            });
        } else {
            self.project.clear_selection();
            self.session.begin_drag(DragState::Pan {
                last: p,
                moved: false,
            });
        }
        self.pump();
        true
    }

    fn pointer_move(&mut self, p: kurbo::Point) -> bool {
        let at = self.viewport.screen_to_node(p);
        if self.session.is_drawing_link() {
            let target = hit_node(&self.project, at, &self.config);
            self.session.update_link(at, target);
            return true;
        }

        match self.session.drag_mut() {
            Some(DragState::Node { last, moved, .. }) => {
                let delta = p - *last;
                *last = p;
                if delta == Vec2::ZERO {
                    return false;
                }
                *moved = true;
                let d = self.viewport.screen_delta_to_node(delta);
                for uid in self.project.selected_nodes() {
                    self.commands.execute(&mut self.project, "move node", |pr| {
                        pr.edit_node(uid, |n| n.move_by(d.x, d.y))
                    });
                }
                log::trace!("drag by {d:?}");
            }
            Some(DragState::Pan { last, moved }) => {
                let delta = p - *last;
                *last = p;
                if delta == Vec2::ZERO {
                    return false;
                }
                *moved = true;
                self.viewport.pan_by_screen(delta);
            }
            Some(DragState::Anchor { link }) => {
                let link = *link;
                let Some((source, target, bender)) = link_ends(&self.project, link) else {
                    return false;
                };
                let drag = drag_anchor(
                    source,
                    target,
                    bender,
                    at,
                    self.viewport.view_box.zoom_factor,
                    &self.config,
                );
                self.commands.execute(&mut self.project, "move link anchor", |pr| {
                    pr.edit_link(link, |l| l.set_anchor_pos(drag.anchor_pos));
                    pr.edit_link(link, |l| l.set_bender(drag.bender));
                });
            }
            Some(DragState::Marquee { current, .. }) => *current = p,
            None => return false,
        }
        self.pump();
        true
    }

    fn pointer_up(&mut self, p: kurbo::Point, modifiers: Modifiers) -> bool {
        let at = self.viewport.screen_to_node(p);

        if let Some(draw) = self.session.take_link() {
            self.suppress_click = true;
            let source = draw.partial.source();
            let target = hit_node(&self.project, at, &self.config).filter(|t| *t != source);
            match target {
                Some(target) => {
                    let result = self.commands.execute(&mut self.project, "add link", |pr| {
                        pr.finish_partial_link(draw.partial, target)
                    });
                    match result {
                        Ok(uid) => log::debug!("link {uid}: {source} -> {target}"),
                        Err(e) => self.toasts.warn(format!("Cannot add link: {e}")),
                    }
                }
                None => self.toasts.info("Link dropped outside a node; discarded"),
            }
            self.pump();
            return true;
        }

        let Some(drag) = self.finish_drag() else {
            return false;
        };
        self.suppress_click = drag.has_moved();
        match drag {
            DragState::Node { .. } | DragState::Anchor { .. } => {}
            DragState::Pan { moved, .. } => {
                if moved {
                    self.project.set_view_box(self.viewport.view_box);
                }
            }
            DragState::Marquee { start, current } => {
                let a = to_kurbo(self.viewport.screen_to_node(start));
                let b = to_kurbo(self.viewport.screen_to_node(current));
                if !modifiers.shift {
                    self.project.clear_selection();
                }
                for uid in hit_rect(&self.project, Rect::from_points(a, b), &self.config) {
                    self.project.edit_node(uid, |n| n.set_selected(true));
                }
            }
        }
        self.pump();
        true
    }

    fn wheel(&mut self, p: kurbo::Point, delta_y: f64) -> bool {
        self.viewport.wheel(delta_y, p, &self.config);
        self.project.set_view_box(self.viewport.view_box);
        self.pump();
        true
    }

    /// The canvas element changed size.
    pub fn resize(&mut self, screen: Rect) {
        self.viewport.resize(screen);
        self.project.set_view_box(self.viewport.view_box);
        self.pump();
    }

    // ─── Clicks ──────────────────────────────────────────────────────────

    /// A DOM click. Acted on from [`CanvasController::tick`] once it is
    /// clear no double click follows.
    pub fn click(&mut self, now_ms: f64, x: f64, y: f64) {
        if std::mem::take(&mut self.suppress_click) {
            return;
        }
        self.clicks.click(now_ms, kurbo::Point::new(x, y));
    }

    pub fn double_click(&mut self, x: f64, y: f64) -> bool {
        let click = self.clicks.double_click(kurbo::Point::new(x, y));
        self.perform_click(click)
    }

    /// Fire single clicks whose delay has passed.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        let mut changed = false;
        for click in self.clicks.poll(now_ms) {
            changed |= self.perform_click(click);
        }
        changed
    }

    fn perform_click(&mut self, click: Click) -> bool {
        let (p, double) = match click {
            Click::Single(p) => (p, false),
            Click::Double(p) => (p, true),
        };
        let at = self.viewport.screen_to_node(p);
        let hit = hit_node(&self.project, at, &self.config);
        if !self.editable() {
            return false;
        }
        let dispatcher = &self.dispatcher;
        match (hit, double) {
            (Some(uid), false) => {
                let view = self.commands.execute(&mut self.project, "toggle detail", |pr| {
                    dispatcher.toggle_expansion(pr, uid)
                });
                if let Some(view) = view {
                    self.show(uid, view);
                }
            }
            (Some(uid), true) => {
                let view = self.commands.execute(&mut self.project, "show custom detail", |pr| {
                    pr.edit_node(uid, |n| n.expand_as_custom());
                    dispatcher.dispatch(Hook::Refresh, pr, uid, None, None)
                });
                if let Some(view) = view {
                    self.show(uid, view);
                }
            }
            (None, true) => {
                let node_type = self
                    .session
                    .current_type()
                    .unwrap_or_else(|| self.project.palette().default_type().id);
                self.create_node(node_type, NodeMode::Empty, at, None);
            }
            (None, false) => return false,
        }
        self.pump();
        true
    }

    // ─── Drop & paste ────────────────────────────────────────────────────

    fn create_node(
        &mut self,
        node_type: TypeId,
        mode: NodeMode,
        at: Point,
        payload: Option<&Payload>,
    ) -> Uid {
        let dispatcher = &self.dispatcher;
        let (uid, view) = self.commands.execute(&mut self.project, "add node", |pr| {
            dispatcher.add_node(pr, node_type, mode, at, payload)
        });
        if let Some(view) = view {
            self.show(uid, view);
        }
        uid
    }

    /// Create a node of `node_type` at a screen position.
    pub fn create_node_at(&mut self, node_type: TypeId, mode: NodeMode, x: f64, y: f64) -> Option<Uid> {
        if !self.editable() {
            return None;
        }
        let at = self.viewport.screen_to_node(kurbo::Point::new(x, y));
        let uid = self.create_node(node_type, mode, at, None);
        self.pump();
        Some(uid)
    }

    /// Route a payload: populate `target` if it is an empty node whose type
    /// claims the payload, else create a full node of the best-claiming
    /// type at `at`, else tell the user.
    fn route_payload(
        &mut self,
        target: Option<Uid>,
        at: Point,
        payload: &Payload,
        event: Option<&InputEvent>,
    ) -> bool {
        if !self.editable() {
            return false;
        }
        if payload.is_empty() {
            self.toasts.info("Nothing to add: the content is empty");
            return false;
        }

        let palette = self.project.palette();
        let claimed = target
            .and_then(|uid| self.project.node(uid))
            .filter(|n| n.is_empty())
            .filter(|n| {
                let node_type = palette.resolve(n.type_id()).0;
                self.dispatcher.can_handle(node_type, Some(payload), event) > HandleLevel::None
            })
            .map(|n| n.uid());

        if let Some(uid) = claimed {
            let dispatcher = &self.dispatcher;
            let view = self.commands.execute(&mut self.project, "populate node", |pr| {
                dispatcher.populate(pr, uid, payload, event)
            });
            if let Some(view) = view {
                self.show(uid, view);
            }
        } else if let Some(node_type) = self.dispatcher.best_type(palette, payload) {
            let uid = self.create_node(node_type, NodeMode::Full, at, Some(payload));
            self.project.clear_selection();
            self.project.edit_node(uid, |n| n.set_selected(true));
        } else {
            self.toasts
                .warn("No palette type can handle this content; nothing was added");
            return false;
        }
        self.pump();
        true
    }

    fn drop_payload(&mut self, p: kurbo::Point, payload: &Payload, event: Option<&InputEvent>) -> bool {
        let at = self.viewport.screen_to_node(p);
        let target = hit_node(&self.project, at, &self.config);
        self.route_payload(target, at, payload, event)
    }

    /// Paste goes to the single selected node, else to a new node in the
    /// middle of the view.
    fn paste(&mut self, payload: &Payload, event: Option<&InputEvent>) -> bool {
        let selected = self.project.selected_nodes();
        let target = match selected.as_slice() {
            [one] => Some(*one),
            _ => None,
        };
        let at = from_kurbo(self.viewport.visible().center());
        self.route_payload(target, at, payload, event)
    }

    // ─── Editing API ─────────────────────────────────────────────────────

    pub fn set_label(&mut self, uid: Uid, label: &str) -> bool {
        if !self.editable() {
            return false;
        }
        let changed = self
            .commands
            .execute(&mut self.project, "rename node", |pr| {
                pr.edit_node(uid, |n| n.set_label(label))
            })
            .is_some();
        self.pump();
        changed
    }

    pub fn set_property(&mut self, uid: Uid, name: &str, value: serde_json::Value, kind: PropertyType) -> bool {
        if !self.editable() {
            return false;
        }
        let change = self.commands.execute(&mut self.project, "set property", |pr| {
            pr.edit_node(uid, |n| n.set_property_named(name, value, kind))
        });
        if let Some(diagnostic) = change.as_ref().and_then(NodeChange::diagnostic) {
            log::debug!("property {name} stored with {diagnostic:?}");
        }
        self.pump();
        change.is_some()
    }

    pub fn switch_node_type(&mut self, uid: Uid, node_type: TypeId) -> bool {
        if !self.editable() {
            return false;
        }
        let changed = self
            .commands
            .execute(&mut self.project, "switch type", |pr| pr.switch_node_type(uid, node_type))
            .is_some();
        self.pump();
        changed
    }

    pub fn undo(&mut self) -> bool {
        self.finish_drag();
        let undone = self.commands.undo(&mut self.project);
        self.after_history(undone)
    }

    pub fn redo(&mut self) -> bool {
        self.finish_drag();
        let redone = self.commands.redo(&mut self.project);
        self.after_history(redone)
    }

    fn after_history(&mut self, description: Option<String>) -> bool {
        let Some(description) = description else {
            return false;
        };
        log::debug!("history: {description}");
        self.session.clear();
        self.events.borrow_mut().clear();
        self.attach();
        true
    }

    fn delete_selected(&mut self) -> bool {
        let links = self.project.selected_links();
        let nodes = self.project.selected_nodes();
        if links.is_empty() && nodes.is_empty() {
            return false;
        }
        self.commands.execute(&mut self.project, "delete", |pr| {
            for uid in links {
                if let Err(e) = pr.delete_link(uid) {
                    log::debug!("delete link {uid}: {e}");
                }
            }
            for uid in nodes {
                if let Err(e) = pr.delete_node(uid) {
                    log::debug!("delete node {uid}: {e}");
                }
            }
        });
        true
    }

    fn edit_selected_nodes(&mut self, description: &str, edit: impl Fn(&mut NodeEditor<'_>) -> Option<NodeChange>) -> bool {
        let nodes = self.project.selected_nodes();
        if nodes.is_empty() {
            return false;
        }
        self.commands.execute(&mut self.project, description, |pr| {
            for uid in nodes {
                pr.edit_node(uid, &edit);
            }
        });
        true
    }

    // ─── Keyboard ────────────────────────────────────────────────────────

    pub fn key(&mut self, key: &str, modifiers: Modifiers) -> KeyOutcome {
        let action = ShortcutAction::for_key(key, modifiers);
        let changed = action.is_some_and(|a| self.dispatch_action(a));
        KeyOutcome { action, changed }
    }

    /// Run a shortcut action. Returns true if the canvas changed.
    pub fn dispatch_action(&mut self, action: ShortcutAction) -> bool {
        if action.edits_project() && !self.editable() {
            return false;
        }

        let changed = match action {
            ShortcutAction::ToolSelect => {
                self.set_tool(ToolKind::Select);
                false
            }
            ShortcutAction::ToolLink => {
                self.set_tool(ToolKind::Link);
                false
            }
            ShortcutAction::Undo => return self.undo(),
            ShortcutAction::Redo => return self.redo(),
            ShortcutAction::Delete => self.delete_selected(),
            ShortcutAction::SelectAll => {
                let uids: Vec<Uid> = self.project.nodes().map(|n| n.uid()).collect();
                for uid in uids {
                    self.project.edit_node(uid, |n| n.set_selected(true));
                }
                true
            }
            ShortcutAction::SwitchToEmpty => {
                self.edit_selected_nodes("clear node", |n| {
                    if n.is_full() {
                        n.set_mode(NodeMode::Empty)
                    } else {
                        None
                    }
                })
            }
            ShortcutAction::ToggleExpansion => {
                let nodes = self.project.selected_nodes();
                let dispatcher = &self.dispatcher;
                let views = self.commands.execute(&mut self.project, "toggle detail", |pr| {
                    nodes
                        .iter()
                        .filter_map(|uid| dispatcher.toggle_expansion(pr, *uid).map(|v| (*uid, v)))
                        .collect::<Vec<_>>()
                });
                let changed = !views.is_empty();
                for (uid, view) in views {
                    self.show(uid, view);
                }
                changed
            }
            ShortcutAction::ToggleHidden => {
                let links = self.project.selected_links();
                let links_changed = !links.is_empty();
                let nodes_changed = self.edit_selected_nodes("toggle hidden", |n| Some(n.toggle_hidden()));
                if links_changed {
                    self.commands.execute(&mut self.project, "toggle hidden", |pr| {
                        for uid in links {
                            pr.edit_link(uid, |l| {
                                let hidden = l.is_hidden();
                                l.set_hidden(!hidden)
                            });
                        }
                    });
                }
                nodes_changed || links_changed
            }
            ShortcutAction::ToggleShowType => self.edit_selected_nodes("toggle type label", |n| {
                let shows = n.shows_type();
                n.set_show_type(!shows)
            }),
            ShortcutAction::ToggleBidirectional => {
                let links = self.project.selected_links();
                if links.is_empty() {
                    false
                } else {
                    self.commands.execute(&mut self.project, "toggle direction", |pr| {
                        for uid in links {
                            pr.edit_link(uid, |l| {
                                let both = l.is_bidirectional();
                                l.set_bidirectional(!both)
                            });
                        }
                    });
                    true
                }
            }
            ShortcutAction::ZoomIn | ShortcutAction::ZoomOut => {
                let factor = if action == ShortcutAction::ZoomIn {
                    1.0 / self.config.zoom_step
                } else {
                    self.config.zoom_step
                };
                let center = self.viewport.screen.center();
                self.viewport.zoom_at(factor, center, &self.config);
                self.project.set_view_box(self.viewport.view_box);
                true
            }
            ShortcutAction::ZoomToFit => match content_bounds(&self.project, &self.config) {
                Some(bounds) => {
                    self.viewport.fit(bounds, FIT_PADDING, &self.config);
                    self.project.set_view_box(self.viewport.view_box);
                    true
                }
                None => false,
            },
            ShortcutAction::Deselect => {
                if self.session.take_link().is_some() {
                    log::debug!("link drawing abandoned");
                }
                self.finish_drag();
                self.project.clear_selection();
                true
            }
            ShortcutAction::ToggleDebug => {
                let debug = !self.session.is_debug();
                self.session.set_debug(debug);
                log::info!("debug overlay {}", if debug { "on" } else { "off" });
                true
            }
        };
        self.pump();
        changed
    }

    // ─── Rendering ───────────────────────────────────────────────────────

    /// Re-render dirty elements and return the canvas SVG, including the
    /// link being drawn and the marquee.
    pub fn render(&mut self) -> String {
        self.pump();
        self.elements.refresh(&self.project, &self.config);
        let mut svg = self.elements.document(&self.project);
        let overlay = self.overlay();
        if !overlay.is_empty()
            && let Some(end) = svg.rfind("</svg>")
        {
            svg.insert_str(end, &overlay);
        }
        svg
    }

    fn overlay(&self) -> String {
        let mut out = String::new();
        if let Some(draw) = self.session.link()
            && let Some(source) = self.project.node(draw.partial.source())
        {
            let end = draw
                .target
                .and_then(|t| self.project.node(t))
                .map_or(draw.pointer, |n| n.pos());
            let mut path = BezPath::new();
            path.move_to(to_kurbo(source.pos()));
            path.line_to(to_kurbo(end));
            out.push_str(&format!(
                "<path class=\"sk-link-draft\" d=\"{}\" fill=\"none\"/>",
                path.to_svg()
            ));
        }
        if let Some(DragState::Marquee { start, current }) = self.session.drag() {
            let a = to_kurbo(self.viewport.screen_to_node(*start));
            let b = to_kurbo(self.viewport.screen_to_node(*current));
            let r = Rect::from_points(a, b);
            out.push_str(&format!(
                "<rect class=\"sk-marquee\" x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\"/>",
                r.x0,
                r.y0,
                r.width(),
                r.height()
            ));
        }
        out
    }

    /// The project as persisted JSON.
    pub fn export_json(&self) -> sk_core::Result<String> {
        self.project.to_json()
    }
}
