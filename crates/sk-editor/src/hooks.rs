//! Type behaviors and hook dispatch.
//!
//! Each palette type may register a [`TypeBehavior`]; types without one
//! use [`DefaultBehavior`]. Every trait method has a default, so a
//! behavior overrides only the hooks it cares about.
//!
//! The [`Dispatcher`] runs one lifecycle hook against a node, then always
//! recomputes the node's label text and icon so both follow the node's
//! data whichever behavior ran.

use crate::input::{InputEvent, Payload};
use sk_core::{
    Expansion, HandleLevel, Node, NodeChange, NodeEditor, NodeMode, NodeType, Palette, Point, Project,
    PropertyType, TypeId, Uid,
};
use sk_render::NodeView;
use sk_render::detail::{detail_for, is_url_like};
use std::collections::HashMap;
use std::fmt;

/// Longest label taken from a payload, in characters.
const PAYLOAD_LABEL_MAX: usize = 80;

/// The extensibility points a behavior can answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookName {
    CanHandle,
    LabelText,
    Icon,
    AddEmpty,
    AddFull,
    AddSpecial,
    AddExisting,
    SwitchToPopulated,
    Refresh,
}

impl HookName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CanHandle => "canHandle",
            Self::LabelText => "labelText",
            Self::Icon => "icon",
            Self::AddEmpty => "addEmpty",
            Self::AddFull => "addFull",
            Self::AddSpecial => "addSpecial",
            Self::AddExisting => "addExisting",
            Self::SwitchToPopulated => "switchToPopulated",
            Self::Refresh => "refresh",
        }
    }
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Contexts ────────────────────────────────────────────────────────────

/// Context for hooks asked about a type rather than a node.
#[derive(Debug, Clone, Copy)]
pub struct TypeContext<'a> {
    pub name: HookName,
    pub node_type: &'a NodeType,
    pub payload: Option<&'a Payload>,
    pub event: Option<&'a InputEvent>,
}

/// Context for hooks run against one node. Edits made through
/// [`NodeContext::edit`] emit change events like any other edit.
pub struct NodeContext<'a> {
    pub name: HookName,
    pub uid: Uid,
    pub payload: Option<&'a Payload>,
    pub event: Option<&'a InputEvent>,
    project: &'a mut Project,
}

impl<'a> NodeContext<'a> {
    pub fn new(name: HookName, project: &'a mut Project, uid: Uid) -> Self {
        Self {
            name,
            uid,
            payload: None,
            event: None,
            project,
        }
    }

    pub fn with_payload(mut self, payload: Option<&'a Payload>) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_event(mut self, event: Option<&'a InputEvent>) -> Self {
        self.event = event;
        self
    }

    pub fn node(&self) -> Option<&Node> {
        self.project.node(self.uid)
    }

    pub fn palette(&self) -> &Palette {
        self.project.palette()
    }

    /// The type the node is bound to.
    pub fn node_type(&self) -> &NodeType {
        let palette = self.project.palette();
        match self.node() {
            Some(node) => palette.resolve(node.type_id()).0,
            None => palette.default_type(),
        }
    }

    pub fn project(&self) -> &Project {
        &*self.project
    }

    pub fn edit<R>(&mut self, edit: impl FnOnce(&mut NodeEditor<'_>) -> R) -> Option<NodeChange> {
        self.project.edit_node(self.uid, edit)
    }
}

// ─── Behavior ────────────────────────────────────────────────────────────

/// Type-specific behavior. Lifecycle hooks return the node's detail
/// content (`None` for nothing to show).
pub trait TypeBehavior {
    /// How strongly this type claims a payload.
    fn can_handle(&self, ctx: &TypeContext<'_>) -> HandleLevel {
        default_can_handle(ctx.node_type, ctx.payload)
    }

    fn label_text(&self, ctx: &NodeContext<'_>) -> String {
        ctx.node()
            .map(|n| n.full_label(ctx.palette()))
            .unwrap_or_default()
    }

    fn icon(&self, ctx: &NodeContext<'_>) -> String {
        ctx.node_type().icon.clone()
    }

    fn add_empty(&self, ctx: &mut NodeContext<'_>) -> Option<String> {
        default_detail(ctx)
    }

    fn add_full(&self, ctx: &mut NodeContext<'_>) -> Option<String> {
        if let Some(payload) = ctx.payload {
            apply_payload(ctx, payload);
        }
        default_detail(ctx)
    }

    fn add_special(&self, ctx: &mut NodeContext<'_>) -> Option<String> {
        default_detail(ctx)
    }

    /// A node loaded with its project rather than created in this session.
    fn add_existing(&self, ctx: &mut NodeContext<'_>) -> Option<String> {
        default_detail(ctx)
    }

    /// An empty node received a payload.
    fn switch_to_populated(&self, ctx: &mut NodeContext<'_>) -> Option<String> {
        if let Some(payload) = ctx.payload {
            apply_payload(ctx, payload);
        }
        ctx.edit(|n| n.set_mode(NodeMode::Full));
        default_detail(ctx)
    }

    fn refresh(&self, ctx: &mut NodeContext<'_>) -> Option<String> {
        default_detail(ctx)
    }
}

/// Behavior for types that register nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBehavior;

impl TypeBehavior for DefaultBehavior {}

/// Score a payload against the type's drop rules, trying each variant and
/// keeping the best. Without a payload the type's default level applies.
pub fn default_can_handle(node_type: &NodeType, payload: Option<&Payload>) -> HandleLevel {
    let rules = &node_type.settings.can_handle;
    payload
        .map(|p| p.variants())
        .filter(|v| !v.is_empty())
        .and_then(|variants| variants.iter().map(|v| rules.score(v)).max())
        .unwrap_or(rules.default_level)
}

/// The type's layout, or a property table, for the node's expansion.
pub fn default_detail(ctx: &NodeContext<'_>) -> Option<String> {
    let node = ctx.node()?;
    detail_for(node, ctx.node_type(), node.expansion())
}

/// Fill a node from a payload: the first line becomes the label, a URL is
/// kept as a `url` property and longer text as a `text` property.
pub fn apply_payload(ctx: &mut NodeContext<'_>, payload: &Payload) {
    let text = payload.plain.trim();
    if text.is_empty() {
        return;
    }
    let first_line = text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or(text);
    let label: String = first_line.chars().take(PAYLOAD_LABEL_MAX).collect();
    ctx.edit(|n| n.set_label(&label));
    if is_url_like(text) {
        ctx.edit(|n| n.set_property_named("url", text.into(), PropertyType::Url));
    } else if text != first_line {
        ctx.edit(|n| n.set_text_property("text", text));
    }
}

// ─── Dispatcher ──────────────────────────────────────────────────────────

/// Lifecycle hooks the dispatcher runs against a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    AddEmpty,
    AddFull,
    AddSpecial,
    AddExisting,
    SwitchToPopulated,
    Refresh,
}

impl From<Hook> for HookName {
    fn from(hook: Hook) -> Self {
        match hook {
            Hook::AddEmpty => HookName::AddEmpty,
            Hook::AddFull => HookName::AddFull,
            Hook::AddSpecial => HookName::AddSpecial,
            Hook::AddExisting => HookName::AddExisting,
            Hook::SwitchToPopulated => HookName::SwitchToPopulated,
            Hook::Refresh => HookName::Refresh,
        }
    }
}

impl Hook {
    /// The add hook for a node created in `mode`.
    pub fn add_for(mode: NodeMode) -> Self {
        match mode {
            NodeMode::Empty => Self::AddEmpty,
            NodeMode::Full => Self::AddFull,
            NodeMode::Special => Self::AddSpecial,
        }
    }
}

/// Routes hooks to registered behaviors, falling back to the default.
#[derive(Default)]
pub struct Dispatcher {
    behaviors: HashMap<TypeId, Box<dyn TypeBehavior>>,
    fallback: DefaultBehavior,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&str> = self.behaviors.keys().map(TypeId::as_str).collect();
        types.sort_unstable();
        f.debug_struct("Dispatcher").field("behaviors", &types).finish()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `behavior` for a type, replacing any earlier one.
    pub fn register(&mut self, id: TypeId, behavior: impl TypeBehavior + 'static) {
        if self.behaviors.insert(id, Box::new(behavior)).is_some() {
            log::debug!("behavior for {id} replaced");
        }
    }

    pub fn unregister(&mut self, id: TypeId) -> bool {
        self.behaviors.remove(&id).is_some()
    }

    pub fn has_behavior(&self, id: TypeId) -> bool {
        self.behaviors.contains_key(&id)
    }

    pub fn behavior(&self, id: TypeId) -> &dyn TypeBehavior {
        match self.behaviors.get(&id) {
            Some(b) => b.as_ref(),
            None => &self.fallback,
        }
    }

    pub fn can_handle(
        &self,
        node_type: &NodeType,
        payload: Option<&Payload>,
        event: Option<&InputEvent>,
    ) -> HandleLevel {
        self.behavior(node_type.id).can_handle(&TypeContext {
            name: HookName::CanHandle,
            node_type,
            payload,
            event,
        })
    }

    /// The palette type that claims `payload` most strongly. Ties go to
    /// the earlier type in palette order; `None` when nothing claims it.
    pub fn best_type(&self, palette: &Palette, payload: &Payload) -> Option<TypeId> {
        let mut best: Option<(HandleLevel, TypeId)> = None;
        for t in palette.items() {
            let level = self.can_handle(t, Some(payload), None);
            if level > best.map_or(HandleLevel::None, |(l, _)| l) {
                best = Some((level, t.id));
            }
        }
        best.map(|(_, id)| id)
    }

    /// Run `hook` for the node `uid` and return its view.
    ///
    /// An expanded node whose hook produced no detail is collapsed. Label
    /// text and icon are recomputed afterwards in every case. `None` when
    /// the node does not exist.
    pub fn dispatch(
        &self,
        hook: Hook,
        project: &mut Project,
        uid: Uid,
        payload: Option<&Payload>,
        event: Option<&InputEvent>,
    ) -> Option<NodeView> {
        let type_id = project.node(uid)?.type_id();
        let behavior = self.behavior(type_id);
        let mut ctx = NodeContext::new(hook.into(), project, uid)
            .with_payload(payload)
            .with_event(event);
        log::trace!("dispatch {} for node {uid} ({type_id})", ctx.name);

        let detail = match hook {
            Hook::AddEmpty => behavior.add_empty(&mut ctx),
            Hook::AddFull => behavior.add_full(&mut ctx),
            Hook::AddSpecial => behavior.add_special(&mut ctx),
            Hook::AddExisting => behavior.add_existing(&mut ctx),
            Hook::SwitchToPopulated => behavior.switch_to_populated(&mut ctx),
            Hook::Refresh => behavior.refresh(&mut ctx),
        };
        let detail = match (detail, ctx.node().map(Node::is_collapsed)) {
            (_, Some(true)) => None,
            (None, Some(false)) => {
                log::debug!("node {uid} has no detail to show; collapsing");
                ctx.edit(|n| n.collapse());
                None
            }
            (detail, _) => detail,
        };

        ctx.name = HookName::LabelText;
        let label = behavior.label_text(&ctx);
        ctx.name = HookName::Icon;
        let icon = behavior.icon(&ctx);
        Some(NodeView {
            label,
            icon,
            detail,
        })
    }

    /// Create a node and run its add hook.
    pub fn add_node(
        &self,
        project: &mut Project,
        node_type: TypeId,
        mode: NodeMode,
        pos: Point,
        payload: Option<&Payload>,
    ) -> (Uid, Option<NodeView>) {
        let uid = project.add_node(node_type, mode, pos);
        let view = self.dispatch(Hook::add_for(mode), project, uid, payload, None);
        (uid, view)
    }

    /// Turn an empty node into a full one from a payload. Refuses when the
    /// node is not empty.
    pub fn populate(
        &self,
        project: &mut Project,
        uid: Uid,
        payload: &Payload,
        event: Option<&InputEvent>,
    ) -> Option<NodeView> {
        if !project.node(uid)?.is_empty() {
            return None;
        }
        self.dispatch(Hook::SwitchToPopulated, project, uid, Some(payload), event)
    }

    /// Advance the node's expansion and refresh it. A state with nothing
    /// to show is passed over, so a node with a layout but no properties
    /// goes straight from collapsed to custom.
    pub fn toggle_expansion(&self, project: &mut Project, uid: Uid) -> Option<NodeView> {
        let mut state = project.node(uid)?.expansion();
        loop {
            state = state.next();
            project.edit_node(uid, |n| match state {
                Expansion::Collapsed => n.collapse(),
                Expansion::Table => n.expand_as_table(),
                Expansion::Custom => n.expand_as_custom(),
            });
            let view = self.dispatch(Hook::Refresh, project, uid, None, None)?;
            if state == Expansion::Collapsed || !project.node(uid)?.is_collapsed() {
                return Some(view);
            }
            log::debug!("node {uid} shows nothing as {state:?}; skipping");
        }
    }

    /// Run the add-existing hook for every node, e.g. after loading.
    pub fn attach_all(&self, project: &mut Project) -> Vec<(Uid, NodeView)> {
        let uids: Vec<Uid> = project.nodes().map(Node::uid).collect();
        uids.into_iter()
            .filter_map(|uid| {
                self.dispatch(Hook::AddExisting, project, uid, None, None)
                    .map(|view| (uid, view))
            })
            .collect()
    }
}
