//! Edit handles passed to [`Project::edit_node`](crate::Project::edit_node)
//! and [`Project::edit_link`](crate::Project::edit_link).
//!
//! A handle reads through to the entity and exposes only the mutators that
//! produce a change record. Every change made through it is kept, so the
//! project announces all of them and not only the one the closure returns.

use crate::data::PropertyType;
use crate::geometry::Point;
use crate::link::{Link, LinkChange};
use crate::node::{Node, NodeChange, NodeMode};
use serde_json::Value;
use std::ops::Deref;

macro_rules! recorded {
    ($( $(#[$doc:meta])* fn $name:ident(&mut self $(, $arg:ident: $ty:ty)*) -> $ret:ty; )*) => {
        $(
            $(#[$doc])*
            pub fn $name(&mut self $(, $arg: $ty)*) -> $ret {
                let change = self.inner.$name($($arg),*);
                self.keep(Option::from(&change));
                change
            }
        )*
    };
}

/// Mutable access to one node inside an edit closure.
pub struct NodeEditor<'a> {
    inner: &'a mut Node,
    changes: Vec<NodeChange>,
}

impl<'a> NodeEditor<'a> {
    pub(crate) fn new(inner: &'a mut Node) -> Self {
        Self {
            inner,
            changes: Vec::new(),
        }
    }

    pub(crate) fn into_changes(self) -> Vec<NodeChange> {
        self.changes
    }

    fn keep(&mut self, change: Option<&NodeChange>) {
        self.changes.extend(change.cloned());
    }

    recorded! {
        fn set_mode(&mut self, mode: NodeMode) -> Option<NodeChange>;
        fn expand_as_table(&mut self) -> Option<NodeChange>;
        fn expand_as_custom(&mut self) -> Option<NodeChange>;
        fn collapse(&mut self) -> Option<NodeChange>;
        /// Step collapsed → table → custom → collapsed.
        fn expand_or_collapse(&mut self) -> NodeChange;
        fn set_pos(&mut self, pos: Point) -> NodeChange;
        fn move_by(&mut self, dx: f64, dy: f64) -> NodeChange;
        fn set_label(&mut self, label: &str) -> Option<NodeChange>;
        fn set_show_type(&mut self, show: bool) -> Option<NodeChange>;
        fn set_property_named(&mut self, name: &str, value: Value, kind: PropertyType) -> NodeChange;
        fn set_normal_property(&mut self, name: &str, value: &str) -> NodeChange;
        fn set_text_property(&mut self, name: &str, value: &str) -> NodeChange;
        fn set_json_property(&mut self, name: &str, value: Value) -> NodeChange;
        fn remove_property_named(&mut self, name: &str) -> Option<NodeChange>;
        fn set_selected(&mut self, selected: bool) -> Option<NodeChange>;
        fn toggle_selected(&mut self) -> NodeChange;
        fn set_hidden(&mut self, hidden: bool) -> Option<NodeChange>;
        fn toggle_hidden(&mut self) -> NodeChange;
    }
}

impl Deref for NodeEditor<'_> {
    type Target = Node;

    fn deref(&self) -> &Node {
        self.inner
    }
}

/// Mutable access to one link inside an edit closure.
pub struct LinkEditor<'a> {
    inner: &'a mut Link,
    changes: Vec<LinkChange>,
}

impl<'a> LinkEditor<'a> {
    pub(crate) fn new(inner: &'a mut Link) -> Self {
        Self {
            inner,
            changes: Vec::new(),
        }
    }

    pub(crate) fn into_changes(self) -> Vec<LinkChange> {
        self.changes
    }

    fn keep(&mut self, change: Option<&LinkChange>) {
        self.changes.extend(change.cloned());
    }

    recorded! {
        fn set_anchor_pos(&mut self, anchor_pos: f64) -> LinkChange;
        fn set_bender(&mut self, bender: f64) -> LinkChange;
        fn set_bidirectional(&mut self, bidirectional: bool) -> Option<LinkChange>;
        fn set_label(&mut self, label: &str) -> Option<LinkChange>;
        fn set_property_named(&mut self, name: &str, value: Value, kind: PropertyType) -> LinkChange;
        fn remove_property_named(&mut self, name: &str) -> Option<LinkChange>;
        fn set_selected(&mut self, selected: bool) -> Option<LinkChange>;
        fn toggle_selected(&mut self) -> LinkChange;
        fn set_hidden(&mut self, hidden: bool) -> Option<LinkChange>;
    }
}

impl Deref for LinkEditor<'_> {
    type Target = Link;

    fn deref(&self) -> &Link {
        self.inner
    }
}
