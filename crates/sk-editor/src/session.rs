//! Per-session editing state: who is editing, the gesture in progress and
//! the link being drawn.
//!
//! One `Session` lives as long as the editor has a project open. Gesture
//! state is cleared when the gesture ends, whether it completed or not.

use sk_core::{PartialLink, Point, TypeId, Uid};
use sk_render::kurbo;

/// The pointer gesture currently in progress.
#[derive(Debug, Clone, PartialEq)]
pub enum DragState {
    /// Moving the selected nodes; `grabbed` is the node under the pointer.
    Node {
        grabbed: Uid,
        last: kurbo::Point,
        moved: bool,
    },
    /// Panning the view.
    Pan { last: kurbo::Point, moved: bool },
    /// Dragging a link's label anchor.
    Anchor { link: Uid },
    /// Rubber-band selection, screen-space corners.
    Marquee {
        start: kurbo::Point,
        current: kurbo::Point,
    },
}

impl DragState {
    pub fn has_moved(&self) -> bool {
        match self {
            Self::Node { moved, .. } | Self::Pan { moved, .. } => *moved,
            Self::Anchor { .. } => true,
            Self::Marquee { start, current } => start != current,
        }
    }
}

/// A link being drawn from a node towards the pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkDraw {
    pub partial: PartialLink,
    /// Pointer position in node-space.
    pub pointer: Point,
    /// The node currently hovered as a target.
    pub target: Option<Uid>,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    user: String,
    debug: bool,
    current_type: Option<TypeId>,
    drag: Option<DragState>,
    link: Option<LinkDraw>,
}

impl Session {
    pub fn new(user: &str) -> Self {
        Self {
            user: user.to_string(),
            ..Self::default()
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// The palette type new nodes are created with.
    pub fn current_type(&self) -> Option<TypeId> {
        self.current_type
    }

    pub fn set_current_type(&mut self, id: Option<TypeId>) {
        self.current_type = id;
    }

    // ─── Drag ────────────────────────────────────────────────────────────

    pub fn drag(&self) -> Option<&DragState> {
        self.drag.as_ref()
    }

    pub fn drag_mut(&mut self) -> Option<&mut DragState> {
        self.drag.as_mut()
    }

    pub fn begin_drag(&mut self, drag: DragState) {
        if let Some(previous) = self.drag.replace(drag) {
            log::debug!("drag {previous:?} replaced before it ended");
        }
    }

    pub fn end_drag(&mut self) -> Option<DragState> {
        self.drag.take()
    }

    // ─── Link drawing ────────────────────────────────────────────────────

    pub fn link(&self) -> Option<&LinkDraw> {
        self.link.as_ref()
    }

    pub fn is_drawing_link(&self) -> bool {
        self.link.is_some()
    }

    pub fn start_link(&mut self, partial: PartialLink, pointer: Point) {
        self.link = Some(LinkDraw {
            partial,
            pointer,
            target: None,
        });
    }

    /// Track the pointer and hovered target. Ignored when no link is being
    /// drawn.
    pub fn update_link(&mut self, pointer: Point, target: Option<Uid>) {
        if let Some(draw) = &mut self.link {
            draw.pointer = pointer;
            draw.target = target.filter(|t| *t != draw.partial.source());
        }
    }

    /// Take the link in progress; the session no longer holds it.
    pub fn take_link(&mut self) -> Option<LinkDraw> {
        self.link.take()
    }

    /// Drop all gesture state.
    pub fn clear(&mut self) {
        self.drag = None;
        self.link = None;
    }
}
