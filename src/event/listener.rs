use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::eval::Value;

/// Listener key that receives every event.
pub const WILDCARD: &str = "*";

/// An emitted event and its payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Event {
    pub name: String,
    pub data: Value,
}

impl Event {
    pub fn new(name: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Field `key` of a map payload.
    pub fn field(&self, key: &str) -> Option<&Value> {
        match &self.data {
            Value::Map(map) => map.get(key),
            _ => None,
        }
    }
}

pub type Listener = Rc<RefCell<dyn FnMut(&Event)>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

#[derive(Default)]
struct Listeners {
    next_id: u64,
    by_event: HashMap<String, Vec<(ListenerId, Listener)>>,
}

/// Host listeners keyed by event name. Clones share the same listeners.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Rc<RefCell<Listeners>>,
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        let mut counts: Vec<_> = inner
            .by_event
            .iter()
            .map(|(name, listeners)| (name.clone(), listeners.len()))
            .collect();
        counts.sort();
        f.debug_struct("ListenerRegistry")
            .field("listeners", &counts)
            .finish()
    }
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, event: &str, listener: impl FnMut(&Event) + 'static) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let id = ListenerId(inner.next_id);
        let listener: Listener = Rc::new(RefCell::new(listener));
        inner
            .by_event
            .entry(event.to_string())
            .or_default()
            .push((id, listener));
        trace!("listener {:?} subscribed to {}", id, event);
        Subscription {
            registry: Rc::downgrade(&self.inner),
            event: event.to_string(),
            id,
        }
    }

    /// Removes one listener. Returns false when it was already gone.
    pub fn unsubscribe(&self, event: &str, id: ListenerId) -> bool {
        remove(&self.inner, event, id)
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.inner
            .borrow()
            .by_event
            .get(event)
            .map_or(0, Vec::len)
    }

    pub fn clear(&self) {
        self.inner.borrow_mut().by_event.clear();
    }

    /// Calls the listeners for `event.name`, then the wildcard listeners.
    pub fn dispatch(&self, event: &Event) {
        let snapshot: Vec<(ListenerId, Listener)> = {
            let inner = self.inner.borrow();
            let named = inner.by_event.get(event.name.as_str()).into_iter().flatten();
            let wildcard = if event.name == WILDCARD {
                None
            } else {
                inner.by_event.get(WILDCARD)
            };
            named
                .chain(wildcard.into_iter().flatten())
                .map(|(id, listener)| (*id, listener.clone()))
                .collect()
        };

        for (id, listener) in snapshot {
            if !self.is_live(&event.name, id) {
                continue;
            }
            // A listener that re-enters its own event is skipped for the
            // nested dispatch.
            match listener.try_borrow_mut() {
                Ok(mut listener) => (&mut *listener)(event),
                Err(_) => trace!("listener {:?} is already running", id),
            }
        }
    }

    /// Unsubscribed listeners are skipped even if they were snapshotted.
    fn is_live(&self, event: &str, id: ListenerId) -> bool {
        let inner = self.inner.borrow();
        [event, WILDCARD].iter().any(|name| {
            inner
                .by_event
                .get(*name)
                .is_some_and(|listeners| listeners.iter().any(|(other, _)| *other == id))
        })
    }
}

fn remove(inner: &RefCell<Listeners>, event: &str, id: ListenerId) -> bool {
    let mut inner = inner.borrow_mut();
    let Some(listeners) = inner.by_event.get_mut(event) else {
        return false;
    };
    let before = listeners.len();
    listeners.retain(|(other, _)| *other != id);
    let removed = listeners.len() != before;
    if listeners.is_empty() {
        inner.by_event.remove(event);
    }
    removed
}

/// Handle returned by [`ListenerRegistry::subscribe`]. Dropping it keeps
/// the listener registered; call [`Subscription::unsubscribe`] to remove it.
#[derive(Debug, Clone)]
pub struct Subscription {
    registry: Weak<RefCell<Listeners>>,
    event: String,
    id: ListenerId,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn unsubscribe(&self) -> bool {
        match self.registry.upgrade() {
            Some(inner) => remove(&inner, &self.event, self.id),
            None => false,
        }
    }
}
