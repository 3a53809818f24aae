//! Change events and the bus that fans them out to subscribed panes.
//!
//! Every project mutation emits the entity-level event first and the
//! project-level event second, so a subscriber can react at either
//! granularity. Listeners run synchronously, in subscription order.

use crate::geometry::ViewBox;
use crate::id::Uid;
use crate::link::LinkChange;
use crate::node::NodeChange;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// What happened to the project as a whole.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ProjectChange {
    NodeAdded(Uid),
    NodeUpdated(Uid),
    NodeDeleted(Uid),
    LinkAdded(Uid),
    LinkUpdated(Uid),
    LinkDeleted(Uid),
    Palette { previous: String },
    ViewBox { previous: ViewBox },
    Extras { key: String, previous: Option<Value> },
    Renamed { previous: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ChangeEvent {
    NodeCreated { uid: Uid },
    NodeChanged { uid: Uid, change: NodeChange },
    NodeDeleted { uid: Uid },
    LinkCreated { uid: Uid, source: Uid, target: Uid },
    LinkChanged { uid: Uid, change: LinkChange },
    LinkDeleted { uid: Uid, source: Uid, target: Uid },
    Project(ProjectChange),
}

impl ChangeEvent {
    pub fn is_project_level(&self) -> bool {
        matches!(self, Self::Project(_))
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&ChangeEvent)>;

#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl EventBus {
    pub fn subscribe(&mut self, listener: impl FnMut(&ChangeEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, event: &ChangeEvent) {
        log::trace!("emit {event:?}");
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn listeners_receive_events_until_unsubscribed() {
        let mut bus = EventBus::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let id = bus.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        bus.emit(&ChangeEvent::NodeCreated { uid: Uid(1) });
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit(&ChangeEvent::NodeCreated { uid: Uid(2) });

        assert_eq!(*seen.borrow(), vec![ChangeEvent::NodeCreated { uid: Uid(1) }]);
        assert_eq!(bus.listener_count(), 0);
    }
}
