use core::{
    cell::{Cell, RefCell},
    fmt,
};
use std::rc::{Rc, Weak};

use log::*;

use crate::session::{SessionEvent, SessionId};

type Handler = Box<dyn FnMut(&SessionEvent)>;

/// delivers session events to subscribers, in order, on the thread that owns the bus.
///
/// the bus is a cheap handle, clones share the same subscribers. a handler may subscribe or
/// unsubscribe while an event is being delivered: subscribers added during delivery only see
/// later events, and ones removed during delivery see nothing more.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Rc<RefCell<Registry>>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<Rc<Entry>>,
}

struct Entry {
    id: u64,
    // `None` receives events from every session
    session: Option<SessionId>,
    live: Cell<bool>,
    handler: RefCell<Handler>,
}

/// keeps a subscriber registered. dropping it unsubscribes.
#[must_use = "dropping a subscription unsubscribes it immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<RefCell<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// subscribes to the events of one session
    pub fn subscribe(
        &self,
        session: SessionId,
        handler: impl FnMut(&SessionEvent) + 'static,
    ) -> Subscription {
        self.add(Some(session), Box::new(handler))
    }

    /// subscribes to the events of every session
    pub fn subscribe_all(&self, handler: impl FnMut(&SessionEvent) + 'static) -> Subscription {
        self.add(None, Box::new(handler))
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.borrow().entries.len()
    }

    /// delivers an event to everyone subscribed when delivery starts
    pub fn publish(&self, event: &SessionEvent) {
        let snapshot = self
            .registry
            .borrow()
            .entries
            .iter()
            .filter(|entry| entry.session.is_none_or(|s| s == event.session))
            .cloned()
            .collect::<Vec<_>>();

        for entry in snapshot {
            if !entry.live.get() {
                continue;
            }
            match entry.handler.try_borrow_mut() {
                Ok(mut handler) => handler(event),
                // the handler is the one publishing
                Err(_) => warn!(
                    "subscriber {} re-entered the bus, not delivering {:?}",
                    entry.id, event.kind
                ),
            }
        }
    }

    fn add(&self, session: Option<SessionId>, handler: Handler) -> Subscription {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.push(Rc::new(Entry {
            id,
            session,
            live: Cell::new(true),
            handler: RefCell::new(handler),
        }));
        trace!("subscriber {} added for {:?}", id, session);

        Subscription {
            id,
            registry: Rc::downgrade(&self.registry),
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl Subscription {
    pub fn unsubscribe(self) {
        // the work happens in drop
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let removed = {
            let mut registry = registry.borrow_mut();
            let idx = registry.entries.iter().position(|entry| entry.id == self.id);
            idx.map(|idx| registry.entries.remove(idx))
        };
        // the handler may own subscriptions of its own, so it's dropped after the registry is
        // released
        if let Some(entry) = removed {
            entry.live.set(false);
            trace!("subscriber {} removed", self.id);
        }
    }
}
