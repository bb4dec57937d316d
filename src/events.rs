use std::collections::HashMap;

/// Fired after every render.
pub const DRAW: &str = "draw";
/// Fired after a drag has been committed to the claims' anchors.
pub const DROP: &str = "drop";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<E> = Box<dyn FnMut(&E)>;

/// Named-event publish/subscribe. Listeners run in subscription order.
pub struct EventBus<E> {
    listeners: HashMap<String, Vec<(ListenerId, Listener<E>)>>,
    next_id: u64,
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            listeners: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn on(&mut self, name: &str, listener: impl FnMut(&E) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners
            .entry(name.to_string())
            .or_default()
            .push((id, Box::new(listener)));
        id
    }

    /// Unsubscribes `id` from `name`. Returns whether it was subscribed.
    pub fn off(&mut self, name: &str, id: ListenerId) -> bool {
        let Some(listeners) = self.listeners.get_mut(name) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        before != listeners.len()
    }

    /// Calls every listener of `name` with `event`; returns how many ran.
    pub fn fire(&mut self, name: &str, event: &E) -> usize {
        let Some(listeners) = self.listeners.get_mut(name) else {
            return 0;
        };
        for (_, listener) in listeners.iter_mut() {
            listener(event);
        }
        listeners.len()
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners.get(name).map_or(0, Vec::len)
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut counts: Vec<(&str, usize)> = self
            .listeners
            .iter()
            .map(|(name, listeners)| (name.as_str(), listeners.len()))
            .collect();
        counts.sort();
        f.debug_struct("EventBus").field("listeners", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn fires_only_matching_listeners_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::<u32>::new();

        let first = Rc::clone(&seen);
        bus.on(DRAW, move |value| first.borrow_mut().push(("a", *value)));
        let second = Rc::clone(&seen);
        bus.on(DRAW, move |value| second.borrow_mut().push(("b", *value)));
        let other = Rc::clone(&seen);
        bus.on(DROP, move |value| other.borrow_mut().push(("drop", *value)));

        assert_eq!(bus.fire(DRAW, &7), 2);
        assert_eq!(*seen.borrow(), vec![("a", 7), ("b", 7)]);
        assert_eq!(bus.fire("unknown", &1), 0);
    }

    #[test]
    fn off_removes_a_single_listener() {
        let count = Rc::new(RefCell::new(0));
        let mut bus = EventBus::<()>::new();
        let counter = Rc::clone(&count);
        let id = bus.on(DROP, move |_| *counter.borrow_mut() += 1);
        bus.on(DROP, |_| {});

        assert!(bus.off(DROP, id));
        assert!(!bus.off(DROP, id));
        assert!(!bus.off(DRAW, id));
        bus.fire(DROP, &());
        assert_eq!(*count.borrow(), 0);
        assert_eq!(bus.listener_count(DROP), 1);
    }
}
