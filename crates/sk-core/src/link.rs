//! Links between two nodes, and the partial link that exists while the user
//! is still dragging out a new connection.

use crate::data::{Data, DataChange, PropertyType};
use crate::diagnostics::{Diagnostic, Subject};
use crate::error::{Result, SketchError};
use crate::id::Uid;
use petgraph::graph::EdgeIndex;
use serde::Serialize;
use serde_json::Value;

/// Label anchor position for a fresh link: halfway along the curve.
pub const DEFAULT_ANCHOR_POS: f64 = 0.5;

/// A completed link mutation with the value it replaced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LinkChange {
    Data(DataChange),
    AnchorPos { previous: f64 },
    Bender { previous: f64 },
    Bidirectional { previous: bool },
    Selected { previous: bool },
    Hidden { previous: bool },
}

impl LinkChange {
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Self::Data(DataChange::Property { diagnostic, .. }) => diagnostic.as_ref(),
            _ => None,
        }
    }
}

// ─── Partial link ────────────────────────────────────────────────────────

/// A link whose source is bound but whose target is not chosen yet.
///
/// Never stored in a project; it lives in the editing session until it is
/// finished or abandoned.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialLink {
    pub(crate) uid: Uid,
    pub(crate) source: Uid,
    pub(crate) bidirectional: bool,
    pub(crate) created: i64,
    pub(crate) user: String,
}

impl PartialLink {
    /// Start a link from `source`. A link without a source is invalid.
    pub(crate) fn new(uid: Uid, source: Option<Uid>, created: i64, user: &str) -> Result<Self> {
        let source = source.ok_or(SketchError::LinkWithoutSource)?;
        Ok(Self {
            uid,
            source,
            bidirectional: false,
            created,
            user: user.to_string(),
        })
    }

    pub fn uid(&self) -> Uid {
        self.uid
    }

    pub fn source(&self) -> Uid {
        self.source
    }

    pub fn set_bidirectional(&mut self, bidirectional: bool) {
        self.bidirectional = bidirectional;
    }

    /// Bind the target, producing a full link.
    pub(crate) fn complete(self, target: Uid) -> Link {
        let mut link = Link::new(self.uid, self.source, target, self.created, &self.user);
        link.bidirectional = self.bidirectional;
        link
    }
}

// ─── Link ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Link {
    uid: Uid,
    source: Uid,
    target: Uid,
    bidirectional: bool,
    anchor_pos: f64,
    bender: f64,
    selected: bool,
    hidden: bool,
    created: i64,
    user: String,
    data: Data,
    pub(crate) edge: EdgeIndex,
}

impl Link {
    pub(crate) fn new(uid: Uid, source: Uid, target: Uid, created: i64, user: &str) -> Self {
        let mut data = Data::default();
        data.bind(Subject::Link(uid));
        Self {
            uid,
            source,
            target,
            bidirectional: false,
            anchor_pos: DEFAULT_ANCHOR_POS,
            bender: 0.0,
            selected: false,
            hidden: false,
            created,
            user: user.to_string(),
            data,
            edge: EdgeIndex::end(),
        }
    }

    pub(crate) fn restore(
        mut self,
        bidirectional: bool,
        anchor_pos: f64,
        bender: f64,
        selected: bool,
        hidden: bool,
        mut data: Data,
    ) -> Self {
        data.bind(Subject::Link(self.uid));
        self.bidirectional = bidirectional;
        self.anchor_pos = clamp_anchor(anchor_pos);
        self.bender = if bender.is_finite() { bender } else { 0.0 };
        self.selected = selected;
        self.hidden = hidden;
        self.data = data;
        self
    }

    pub fn uid(&self) -> Uid {
        self.uid
    }

    pub fn created(&self) -> i64 {
        self.created
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn source(&self) -> Uid {
        self.source
    }

    pub fn target(&self) -> Uid {
        self.target
    }

    pub fn touches(&self, node: Uid) -> bool {
        self.source == node || self.target == node
    }

    /// The endpoint opposite `node`, or `None` if `node` is not an endpoint.
    pub fn other_node(&self, node: Uid) -> Option<Uid> {
        if node == self.source {
            Some(self.target)
        } else if node == self.target {
            Some(self.source)
        } else {
            None
        }
    }

    // ─── Geometry parameters ─────────────────────────────────────────────

    /// Position of the label anchor along the curve, in `[0, 1]`.
    pub fn anchor_pos(&self) -> f64 {
        self.anchor_pos
    }

    pub fn set_anchor_pos(&mut self, anchor_pos: f64) -> LinkChange {
        LinkChange::AnchorPos {
            previous: std::mem::replace(&mut self.anchor_pos, clamp_anchor(anchor_pos)),
        }
    }

    /// Signed curvature; zero draws a straight line.
    pub fn bender(&self) -> f64 {
        self.bender
    }

    pub fn set_bender(&mut self, bender: f64) -> LinkChange {
        let bender = if bender.is_finite() { bender } else { 0.0 };
        LinkChange::Bender {
            previous: std::mem::replace(&mut self.bender, bender),
        }
    }

    pub fn is_bidirectional(&self) -> bool {
        self.bidirectional
    }

    pub fn set_bidirectional(&mut self, bidirectional: bool) -> Option<LinkChange> {
        (self.bidirectional != bidirectional).then(|| LinkChange::Bidirectional {
            previous: std::mem::replace(&mut self.bidirectional, bidirectional),
        })
    }

    // ─── Label & properties ──────────────────────────────────────────────

    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn label(&self) -> &str {
        self.data.label()
    }

    pub fn set_label(&mut self, label: &str) -> Option<LinkChange> {
        self.data.set_label(label).map(LinkChange::Data)
    }

    pub fn set_property_named(&mut self, name: &str, value: Value, kind: PropertyType) -> LinkChange {
        LinkChange::Data(self.data.set_property_named(name, value, kind))
    }

    pub fn remove_property_named(&mut self, name: &str) -> Option<LinkChange> {
        self.data.remove_property_named(name).map(LinkChange::Data)
    }

    pub fn get_property_named(&self, name: &str) -> Option<&Value> {
        self.data.get_property_named(name)
    }

    // ─── Selection & visibility ──────────────────────────────────────────

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn set_selected(&mut self, selected: bool) -> Option<LinkChange> {
        (self.selected != selected).then(|| LinkChange::Selected {
            previous: std::mem::replace(&mut self.selected, selected),
        })
    }

    pub fn toggle_selected(&mut self) -> LinkChange {
        let previous = self.selected;
        self.selected = !previous;
        LinkChange::Selected { previous }
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn set_hidden(&mut self, hidden: bool) -> Option<LinkChange> {
        (self.hidden != hidden).then(|| LinkChange::Hidden {
            previous: std::mem::replace(&mut self.hidden, hidden),
        })
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.data.diagnostics()
    }

    pub(crate) fn record(&mut self, diagnostic: Diagnostic) {
        self.data.record(diagnostic);
    }
}

fn clamp_anchor(pos: f64) -> f64 {
    if pos.is_finite() {
        pos.clamp(0.0, 1.0)
    } else {
        DEFAULT_ANCHOR_POS
    }
}
